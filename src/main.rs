//! TradeFlow CLI
//!
//! Usage:
//!   tradeflow serve
//!   tradeflow login <email> --password <password>
//!   tradeflow trade btc up 30 1000
//!   tradeflow admin withdrawals approve <id> --amount 250

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tradeflow::admin::{filter_users, AdminAction, AdminConsole, MIN_PASSWORD_LEN};
use tradeflow::api::{
    BackendClient, NewPredictionOption, OptionsClient, PaymentRequest, RegisterRequest,
    WithdrawalRequest,
};
use tradeflow::balance::BalanceMonitor;
use tradeflow::config::{AppConfig, LoggingConfig};
use tradeflow::oracle::PriceService;
use tradeflow::orders::OrdersBook;
use tradeflow::persistence::{export_billing, export_orders, FileStore, KeyValueStore};
use tradeflow::session::SessionHandle;
use tradeflow::trade::{TradeOutcome, TradeRequest, TradeTicket};
use tradeflow::types::{Coin, Direction};

#[derive(Parser)]
#[command(name = "tradeflow")]
#[command(about = "TradeFlow trading client and local service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the local prediction-options and price service
    Serve,
    /// Log in and store the session
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Register {
        first_name: String,
        last_name: String,
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Clear the stored session
    Logout,
    /// Show the stored session
    Whoami,
    /// Current price for one or more pair ids (btc, eth, ...)
    Price {
        #[arg(required = true)]
        pairs: Vec<String>,
    },
    /// Show the account balance
    Balance {
        /// Keep polling until interrupted
        #[arg(long)]
        watch: bool,
    },
    /// Order history
    Orders {
        /// Also write the history to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Place a timed UP/DOWN trade
    Trade {
        /// Pair, e.g. btc or BTC/USDT
        pair: String,
        /// up or down
        direction: String,
        /// Option duration in seconds
        seconds: u32,
        /// Stake in USDT
        amount: String,
    },
    /// Request a withdrawal
    Withdraw {
        asset: String,
        amount: f64,
        network: String,
        address: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Submit a deposit
    Deposit {
        amount: f64,
        #[arg(long, default_value = "USDT")]
        currency: String,
        #[arg(long)]
        proof_url: Option<String>,
    },
    /// Deposits and withdrawals
    Billing {
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Change your password
    Password {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },
    /// Admin console (requires the ADMIN role)
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

impl Toggle {
    fn enabled(self) -> bool {
        matches!(self, Toggle::On)
    }
}

#[derive(Subcommand)]
enum AdminCommand {
    /// Overview counters
    Stats,
    Users {
        #[arg(long)]
        search: Option<String>,
        #[command(subcommand)]
        action: Option<UserAction>,
    },
    Payments {
        #[command(subcommand)]
        action: Option<DecisionAction>,
    },
    Transactions {
        #[command(subcommand)]
        action: Option<DecisionAction>,
    },
    Withdrawals {
        #[command(subcommand)]
        action: Option<WithdrawalAction>,
    },
    /// All orders, read-only
    Orders,
    /// Prediction options on the local service
    Options {
        #[command(subcommand)]
        action: Option<OptionAction>,
    },
}

#[derive(Subcommand)]
enum UserAction {
    Status { id: String, state: Toggle },
    ForceLoss { id: String, state: Toggle },
    /// Apply force loss to every user
    ForceLossAll { state: Toggle },
    Balance { id: String, amount: String },
    Password { id: String, new: String },
    Delete { id: String },
}

#[derive(Subcommand)]
enum DecisionAction {
    Approve { id: String },
    Reject { id: String },
}

#[derive(Subcommand)]
enum WithdrawalAction {
    Approve {
        id: String,
        /// Defaults to the requested amount
        #[arg(long)]
        amount: Option<String>,
        #[arg(long)]
        tx_hash: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    Reject {
        id: String,
        reason: String,
    },
}

#[derive(Args)]
struct OptionFields {
    seconds: f64,
    return_rate: f64,
    capital_min: f64,
    capital_max: f64,
    #[arg(long)]
    currency: Option<String>,
    #[arg(long)]
    pair: Option<String>,
    #[arg(long)]
    inactive: bool,
    #[arg(long)]
    sort_order: Option<i64>,
}

impl From<OptionFields> for NewPredictionOption {
    fn from(f: OptionFields) -> Self {
        NewPredictionOption {
            seconds: f.seconds,
            return_rate: f.return_rate,
            capital_min: f.capital_min,
            capital_max: f.capital_max,
            currency: f.currency,
            pair: f.pair,
            is_active: Some(!f.inactive),
            sort_order: f.sort_order,
        }
    }
}

#[derive(Subcommand)]
enum OptionAction {
    Create(OptionFields),
    Update {
        id: String,
        #[command(flatten)]
        fields: OptionFields,
    },
    Delete {
        id: String,
    },
}

fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(feature = "server")]
async fn serve(config: &AppConfig) -> Result<()> {
    tradeflow::server::serve(config).await
}

#[cfg(not(feature = "server"))]
async fn serve(_config: &AppConfig) -> Result<()> {
    bail!("Built without the `server` feature")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()?;
    init_logging(&config.logging);
    info!(config = %config, "Configuration loaded");

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&config.session.file));
    let session = SessionHandle::load(store).context("Failed to restore session")?;
    let client = BackendClient::new(&config.api.base_url, config.request_timeout(), session.clone())?;

    match cli.command {
        Commands::Serve => serve(&config).await?,
        Commands::Login { email, password } => {
            let session = client.login(&email, &password).await?;
            println!(
                "✅ Logged in as {} ({})",
                session.email.as_deref().unwrap_or(&email),
                session.role.as_deref().unwrap_or("USER")
            );
        }
        Commands::Register {
            first_name,
            last_name,
            email,
            password,
        } => {
            if password.len() < MIN_PASSWORD_LEN {
                bail!("Password must be at least {} characters", MIN_PASSWORD_LEN);
            }
            client
                .register(&RegisterRequest {
                    first_name,
                    last_name,
                    email: email.clone(),
                    password,
                })
                .await?;
            println!("✅ Account created for {}", email);
        }
        Commands::Logout => {
            client.logout().await?;
            println!("Logged out");
        }
        Commands::Whoami => {
            let current = session.current();
            match current.user_id() {
                Some(id) if current.is_authenticated() => println!(
                    "{} id={} role={}",
                    current.email.as_deref().unwrap_or("-"),
                    id,
                    current.role.as_deref().unwrap_or("USER")
                ),
                _ => println!("Not logged in"),
            }
        }
        Commands::Price { pairs } => {
            let service = PriceService::from_config(&config)?;
            let prices = service.fetch_multiple_prices(&pairs).await;
            for pair in &pairs {
                if let Some(p) = prices.get(pair) {
                    println!(
                        "{:<6} {:>14.4} {:>+7.2}%  H {:.4}  L {:.4}  V {:.0}",
                        pair.to_uppercase(),
                        p.price,
                        p.change,
                        p.high,
                        p.low,
                        p.volume
                    );
                }
            }
        }
        Commands::Balance { watch } => {
            let monitor = BalanceMonitor::new(
                client.clone(),
                Duration::from_millis(config.balance.refresh_ms),
            );
            if !watch {
                let data = monitor.refresh().await?;
                println!("{:.2} {}", data.balance, data.currency);
                return Ok(());
            }
            let mut updates = WatchStream::new(monitor.subscribe());
            let _handle = monitor.start();
            loop {
                tokio::select! {
                    state = updates.next() => {
                        let Some(state) = state else {
                            break;
                        };
                        match (state.data, state.error) {
                            (_, Some(error)) => warn!(error = %error, "Balance refresh failed"),
                            (Some(data), None) => println!("{:.2} {}", data.balance, data.currency),
                            (None, None) => {}
                        }
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
        }
        Commands::Orders { csv } => {
            let book = OrdersBook::new();
            book.refresh(&client, &session.current()).await;
            let orders = book.orders().await;
            for o in &orders {
                println!(
                    "{:<38} {:<10} {:<4} {:<5} {:>12.2} {:<5} {:<11} {:<4} {}",
                    o.id,
                    o.pair,
                    o.trade_type,
                    o.direction.map(|d| d.to_string()).unwrap_or_default(),
                    o.amount,
                    o.currency,
                    o.status,
                    o.result.map(|r| r.to_string()).unwrap_or_default(),
                    o.created_at
                );
            }
            println!("{} orders", orders.len());
            if let Some(path) = csv {
                let written = export_orders(&orders, &path)?;
                println!("💾 {} orders written to {}", written, path.display());
            }
        }
        Commands::Trade {
            pair,
            direction,
            seconds,
            amount,
        } => {
            let Some(coin) = Coin::from_symbol(&pair) else {
                bail!("Unknown pair {}", pair);
            };
            let Some(direction) = Direction::parse(&direction) else {
                bail!("Direction must be up or down");
            };
            let symbol = format!("{}/USDT", coin);
            let price = PriceService::from_config(&config)?
                .fetch_crypto_price(coin.pair_id())
                .await
                .price;

            let mut ticket = TradeTicket::new(client.clone(), Arc::new(OrdersBook::new()));
            ticket.load_options(Some(symbol.as_str())).await;
            let outcome = ticket
                .submit(&TradeRequest {
                    pair: symbol.clone(),
                    direction,
                    price,
                    seconds,
                    amount,
                })
                .await?;
            let order = outcome.order();
            let payout = ticket.expected_return(seconds, order.amount).unwrap_or(0.0);
            match &outcome {
                TradeOutcome::Placed(_) => println!(
                    "✅ {} {} {:.2} USDT @ {:.4} for {}s (expected return {:.2})",
                    direction, symbol, order.amount, price, seconds, payout
                ),
                TradeOutcome::Failed { error, .. } => println!(
                    "⚠️  Backend rejected the order ({}); recorded locally as {}",
                    error, order.id
                ),
            }
        }
        Commands::Withdraw {
            asset,
            amount,
            network,
            address,
            note,
        } => {
            let (_, user_id) = client.require_user()?;
            let withdrawal = client
                .create_withdrawal(&WithdrawalRequest {
                    user_id,
                    asset,
                    amount,
                    network,
                    address,
                    user_note: note,
                })
                .await?;
            println!(
                "✅ Withdrawal {} requested: {} {} ({})",
                withdrawal.id, withdrawal.amount, withdrawal.asset, withdrawal.status
            );
        }
        Commands::Deposit {
            amount,
            currency,
            proof_url,
        } => {
            let (_, user_id) = client.require_user()?;
            let payment = client
                .create_payment(&PaymentRequest {
                    user_id,
                    amount,
                    currency,
                    proof_url,
                })
                .await?;
            println!(
                "✅ Deposit {} submitted: {} {} ({})",
                payment.id, payment.amount, payment.currency, payment.status
            );
        }
        Commands::Billing { csv } => {
            let (_, user_id) = client.require_user()?;
            let entries = client.billing_history(&user_id).await?;
            for e in &entries {
                println!(
                    "{:<12} {:<10} {:>12.2} {:<5} {:<10} {}",
                    e.id, e.entry_type, e.amount, e.currency, e.status, e.created_at
                );
            }
            if let Some(path) = csv {
                let written = export_billing(&entries, &path)?;
                println!("💾 {} entries written to {}", written, path.display());
            }
        }
        Commands::Password { current, new } => {
            if new.len() < MIN_PASSWORD_LEN {
                bail!("Password must be at least {} characters", MIN_PASSWORD_LEN);
            }
            let (_, user_id) = client.require_user()?;
            client.change_password(&user_id, Some(&current), &new).await?;
            println!("✅ Password changed");
        }
        Commands::Admin { command } => {
            let options = OptionsClient::new(
                &config.prices.proxy_url,
                config.request_timeout(),
                session.clone(),
            )?;
            let console = AdminConsole::new(client, options)?;
            run_admin(&console, command).await?;
        }
    }

    Ok(())
}

async fn run_admin(console: &AdminConsole, command: AdminCommand) -> Result<()> {
    match command {
        AdminCommand::Stats => {
            let stats = console.load_stats().await;
            println!("Total users:          {}", stats.total_users);
            println!("Active users:         {}", stats.active_users);
            println!("Pending payments:     {}", stats.pending_payments);
            println!("Recent transactions:  {}", stats.recent_transactions);
        }
        AdminCommand::Users { search, action } => {
            let users = match action {
                None => console.users().await?,
                Some(UserAction::Status { id, state }) => {
                    console.set_user_status(&id, state.enabled()).await?
                }
                Some(UserAction::ForceLoss { id, state }) => {
                    console.set_force_loss(&id, state.enabled()).await?
                }
                Some(UserAction::ForceLossAll { state }) => {
                    let outcomes = console.set_force_loss_all(state.enabled()).await?;
                    let failed: Vec<_> = outcomes.iter().filter(|o| o.result.is_err()).collect();
                    for o in &failed {
                        if let Err(e) = &o.result {
                            println!("❌ {}: {}", o.user_id, e);
                        }
                    }
                    println!("{} updated, {} failed", outcomes.len() - failed.len(), failed.len());
                    return Ok(());
                }
                Some(UserAction::Balance { id, amount }) => console.edit_balance(&id, &amount).await?,
                Some(UserAction::Password { id, new }) => {
                    console.change_password(&id, &new).await?;
                    println!("✅ Password changed for {}", id);
                    return Ok(());
                }
                Some(UserAction::Delete { id }) => console.delete_user(&id).await?,
            };
            for u in filter_users(&users, search.as_deref().unwrap_or("")) {
                println!(
                    "{:<8} {:<30} {:<24} {:<6} active={:<5} force_loss={:<5} {}",
                    u.id,
                    u.email,
                    u.full_name(),
                    u.role,
                    u.is_active,
                    u.force_loss_enabled,
                    u.balance.map(|b| format!("{:.2}", b)).unwrap_or_default()
                );
            }
        }
        AdminCommand::Payments { action } => {
            let payments = match action {
                None => console.pending_payments().await?,
                Some(DecisionAction::Approve { id }) => {
                    console.payment_action(&id, AdminAction::Approve).await?
                }
                Some(DecisionAction::Reject { id }) => {
                    console.payment_action(&id, AdminAction::Reject).await?
                }
            };
            for p in &payments {
                println!(
                    "{:<8} user={:<8} {:>12.2} {:<5} {:<10} {}",
                    p.id, p.user_id, p.amount, p.currency, p.status, p.created_at
                );
            }
        }
        AdminCommand::Transactions { action } => {
            let transactions = match action {
                None => console.transactions().await?,
                Some(action) => {
                    let (id, action) = match action {
                        DecisionAction::Approve { id } => (id, AdminAction::Approve),
                        DecisionAction::Reject { id } => (id, AdminAction::Reject),
                    };
                    let current = console.transactions().await?;
                    let Some(transaction) = current.iter().find(|t| t.id == id) else {
                        bail!("Transaction {} not found", id);
                    };
                    console.transaction_action(transaction, action).await?
                }
            };
            for t in &transactions {
                println!(
                    "{:<8} user={:<8} {:<12} {:>12.2} {:<10} {}",
                    t.id, t.user_id, t.transaction_type, t.amount, t.status, t.created_at
                );
            }
        }
        AdminCommand::Withdrawals { action } => {
            let withdrawals = match action {
                None => console.withdrawals().await?,
                Some(action) => {
                    let current = console.withdrawals().await?;
                    let id = match &action {
                        WithdrawalAction::Approve { id, .. } | WithdrawalAction::Reject { id, .. } => id,
                    };
                    let Some(withdrawal) = current.iter().find(|w| &w.id == id) else {
                        bail!("Withdrawal {} not found", id);
                    };
                    match &action {
                        WithdrawalAction::Approve {
                            amount,
                            tx_hash,
                            note,
                            ..
                        } => {
                            console
                                .approve_withdrawal(
                                    withdrawal,
                                    amount.as_deref(),
                                    tx_hash.as_deref(),
                                    note.as_deref(),
                                )
                                .await?
                        }
                        WithdrawalAction::Reject { reason, .. } => {
                            console.reject_withdrawal(withdrawal, reason).await?
                        }
                    }
                }
            };
            for w in &withdrawals {
                println!(
                    "{:<8} user={:<8} {:>12.4} {:<6} {:<8} {:<10} {}",
                    w.id, w.user_id, w.amount, w.asset, w.network, w.status, w.address
                );
            }
        }
        AdminCommand::Orders => {
            for o in console.orders().await? {
                println!(
                    "{:<12} {:<10} {:>12.2} {:<4} {:<5} {}",
                    o.id,
                    o.pair.as_deref().unwrap_or("-"),
                    o.amount,
                    o.trade_type.as_deref().unwrap_or("-"),
                    o.direction.as_deref().unwrap_or("-"),
                    o.status_label()
                );
            }
        }
        AdminCommand::Options { action } => {
            let options = match action {
                None => console.prediction_options().await?,
                Some(OptionAction::Create(fields)) => console.create_option(&fields.into()).await?,
                Some(OptionAction::Update { id, fields }) => {
                    console.update_option(&id, &fields.into()).await?
                }
                Some(OptionAction::Delete { id }) => console.delete_option(&id).await?,
            };
            for o in &options {
                println!(
                    "{:<20} {:>5}s {:>6.2}% {:>10.2}-{:<10.2} {:<5} {:<10} active={} order={}",
                    o.id,
                    o.seconds,
                    o.return_rate,
                    o.capital_min,
                    o.capital_max,
                    o.currency,
                    o.pair.as_deref().unwrap_or("*"),
                    o.is_active,
                    o.sort_order
                );
            }
        }
    }
    Ok(())
}
