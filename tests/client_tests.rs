//! Client tests against a mocked backend

#[cfg(test)]
mod tests {
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};
    use tradeflow::admin::AdminConsole;
    use tradeflow::api::{BackendClient, OptionsClient, Withdrawal};
    use tradeflow::balance::BalanceMonitor;
    use tradeflow::error::ClientError;
    use tradeflow::oracle::sources::{CoinGeckoClient, ProxyClient, QuoteProvider};
    use tradeflow::oracle::PriceService;
    use tradeflow::orders::{NewOrder, OrdersBook};
    use tradeflow::persistence::{FileStore, KeyValueStore};
    use tradeflow::session::{Session, SessionHandle};
    use tradeflow::trade::{TradeOutcome, TradeRequest, TradeTicket};
    use tradeflow::types::{Direction, OrderOrigin, OrderResult, OrderStatus, TradeType};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TIMEOUT: Duration = Duration::from_secs(2);

    fn session(user_id: &str, role: &str) -> SessionHandle {
        SessionHandle::ephemeral(Session {
            token: Some("tok".into()),
            user_id: Some(user_id.into()),
            role: Some(role.into()),
            ..Default::default()
        })
    }

    fn client(server: &MockServer, session: SessionHandle) -> BackendClient {
        BackendClient::new(&server.uri(), TIMEOUT, session).unwrap()
    }

    // ============================================================================
    // Session
    // ============================================================================

    #[tokio::test]
    async fn test_login_persists_session_and_sends_bearer() {
        let backend = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({"email": "ana@tradeflow.io", "password": "secret1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accessToken": "jwt-token",
                "user": {"id": 17, "email": "ana@tradeflow.io", "role": "ADMIN"}
            })))
            .expect(1)
            .mount(&backend)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/17/balance"))
            .and(header("authorization", "Bearer jwt-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"balance": "1500.25"})))
            .expect(1)
            .mount(&backend)
            .await;

        let dir = TempDir::new().unwrap();
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.path().join("session.json")));
        let handle = SessionHandle::load(store.clone()).unwrap();
        let api = client(&backend, handle.clone());

        let logged_in = assert_ok!(api.login("ana@tradeflow.io", "secret1").await);
        assert_eq!(logged_in.user_id.as_deref(), Some("17"));
        assert!(handle.current().is_admin());

        let balance = assert_ok!(api.get_balance("17").await);
        assert_eq!(balance.balance, 1500.25);
        assert_eq!(balance.currency, "USDT");

        // A fresh process sees the same session
        let restored = SessionHandle::load(store).unwrap();
        assert_eq!(restored.current().user_id().as_deref(), Some("17"));
        assert_eq!(restored.current().name.as_deref(), Some("ana"));
    }

    #[tokio::test]
    async fn test_logout_clears_session_even_when_backend_fails() {
        let backend = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&backend)
            .await;

        let handle = session("3", "USER");
        let api = client(&backend, handle.clone());
        assert_err!(api.logout().await);
        assert!(!handle.current().is_authenticated());
    }

    #[tokio::test]
    async fn test_error_message_is_extracted() {
        let backend = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(json!({"message": "Forbidden resource"})),
            )
            .mount(&backend)
            .await;

        let api = client(&backend, session("1", "USER"));
        match api.list_users().await {
            Err(ClientError::Status { status, message, .. }) => {
                assert_eq!(status.as_u16(), 403);
                assert_eq!(message, "Forbidden resource");
            }
            other => panic!("unexpected result: {:?}", other.map(|u| u.len())),
        }
    }

    // ============================================================================
    // Prices
    // ============================================================================

    fn price_service(proxy: &str, coingecko: &str) -> PriceService {
        let providers: Vec<Box<dyn QuoteProvider>> = vec![
            Box::new(ProxyClient::new(proxy, TIMEOUT).unwrap()),
            Box::new(CoinGeckoClient::new(coingecko, TIMEOUT).unwrap()),
        ];
        PriceService::new(providers)
    }

    #[tokio::test]
    async fn test_price_chain_ends_at_reference_table() {
        let proxy = MockServer::start().await;
        let coingecko = MockServer::start().await;
        for server in [&proxy, &coingecko] {
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(500))
                .expect(1)
                .mount(server)
                .await;
        }

        let quote = price_service(&proxy.uri(), &coingecko.uri())
            .fetch_crypto_price("btc")
            .await;
        assert_eq!(quote.price, 98000.0);
        assert!((quote.high - 98000.0 * 1.05).abs() < 1e-6);
        assert!((quote.low - 98000.0 * 0.95).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_price_second_tier_answers() {
        let proxy = MockServer::start().await;
        let coingecko = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&proxy)
            .await;
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .and(query_param("ids", "ethereum"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ethereum": {"usd": 3210.5, "usd_24h_change": -1.25}
            })))
            .mount(&coingecko)
            .await;

        let quote = price_service(&proxy.uri(), &coingecko.uri())
            .fetch_crypto_price("eth")
            .await;
        assert_eq!(quote.price, 3210.5);
        assert_eq!(quote.change, -1.25);
    }

    #[tokio::test]
    async fn test_price_transport_failure_uses_emergency_quote() {
        let coingecko = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"bitcoin": {"usd": 1.0}})))
            .expect(0)
            .mount(&coingecko)
            .await;

        let quote = price_service("http://127.0.0.1:9", &coingecko.uri())
            .fetch_crypto_price("eth")
            .await;
        assert_eq!(quote.price, 3500.0);
        assert_eq!(quote.high, 0.0);
        assert_eq!(quote.volume, 0.0);
    }

    #[tokio::test]
    async fn test_btc_with_every_source_unreachable() {
        let quote = price_service("http://127.0.0.1:9", "http://127.0.0.1:9")
            .fetch_crypto_price("btc")
            .await;
        assert_eq!(quote.price, 98000.0);
        assert_eq!(quote.high, 0.0);
        assert_eq!(quote.change, 0.0);
    }

    // ============================================================================
    // Trading
    // ============================================================================

    fn request(amount: &str) -> TradeRequest {
        TradeRequest {
            pair: "BTC/USDT".into(),
            direction: Direction::Down,
            price: 97_500.0,
            seconds: 30,
            amount: amount.into(),
        }
    }

    #[tokio::test]
    async fn test_trade_posts_order_and_records_it() {
        let backend = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .and(body_json(json!({
                "userId": "8", "amount": 1000.0, "currency": "USDT", "type": "SELL", "direction": "DOWN"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 991})))
            .expect(1)
            .mount(&backend)
            .await;

        let book = Arc::new(OrdersBook::new());
        let ticket = TradeTicket::new(client(&backend, session("8", "USER")), book.clone());
        let outcome = assert_ok!(ticket.submit(&request("1000")).await);
        assert!(outcome.is_placed());

        let orders = book.orders().await;
        assert_eq!(orders.len(), 1);
        let order = &orders[0];
        assert_eq!(order.trade_type, TradeType::Sell);
        assert_eq!(order.status, OrderStatus::InProgress);
        assert_eq!(order.duration.as_deref(), Some("30s"));
        assert_eq!(order.price, Some(97_500.0));
        assert_eq!(order.origin, OrderOrigin::Local);
        assert_eq!(ticket.expected_return(30, 1000.0), Some(120.0));
    }

    #[tokio::test]
    async fn test_trade_out_of_range_sends_nothing() {
        let backend = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&backend)
            .await;

        let book = Arc::new(OrdersBook::new());
        let ticket = TradeTicket::new(client(&backend, session("8", "USER")), book.clone());
        let err = assert_err!(ticket.submit(&request("100")).await);
        assert_eq!(
            err.to_string(),
            "Amount must be between 500 and 5000 USDT for 30s"
        );
        assert!(book.orders().await.is_empty());
    }

    #[tokio::test]
    async fn test_trade_backend_failure_still_records() {
        let backend = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "Insufficient balance"})))
            .mount(&backend)
            .await;

        let book = Arc::new(OrdersBook::new());
        let ticket = TradeTicket::new(client(&backend, session("8", "USER")), book.clone());
        match assert_ok!(ticket.submit(&request("600")).await) {
            TradeOutcome::Failed { order, error } => {
                assert_eq!(order.status, OrderStatus::InProgress);
                assert!(error.to_string().contains("Insufficient balance"));
            }
            TradeOutcome::Placed(_) => panic!("order should not be placed"),
        }
        assert_eq!(book.orders().await.len(), 1);
    }

    // ============================================================================
    // Orders sync
    // ============================================================================

    #[tokio::test]
    async fn test_orders_sync_merges_with_local_orders() {
        let backend = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orders"))
            .and(query_param("userId", "8"))
            .and(header("cache-control", "no-store"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "confirmed", "pair": "Unknown", "amount": "600", "status": "completed",
                 "settledLossAmount": "600"},
                {"_id": 42, "symbol": "ETH/USDT", "amount": 700, "positionType": "sell",
                 "status": "in-progress", "result": "WIN"}
            ])))
            .mount(&backend)
            .await;

        let handle = session("8", "USER");
        let api = client(&backend, handle.clone());
        let book = OrdersBook::new();
        book.add_local_order(NewOrder {
            id: Some("confirmed".into()),
            pair: "BTC/USDT".into(),
            amount: 600.0,
            currency: "USDT".into(),
            duration: Some("30s".into()),
            ..Default::default()
        })
        .await;
        book.add_local_order(NewOrder {
            id: Some("pending-local".into()),
            pair: "SOL/USDT".into(),
            amount: 900.0,
            currency: "USDT".into(),
            ..Default::default()
        })
        .await;

        book.refresh(&api, &handle.current()).await;
        let snapshot = book.snapshot().await;
        assert!(!snapshot.loading);
        assert!(!snapshot.syncing);

        let ids: Vec<_> = snapshot.orders.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["confirmed", "42", "pending-local"]);

        let confirmed = &snapshot.orders[0];
        assert_eq!(confirmed.pair, "BTC/USDT");
        assert_eq!(confirmed.duration.as_deref(), Some("30s"));
        assert_eq!(confirmed.result, Some(OrderResult::Loss));
        assert_eq!(confirmed.origin, OrderOrigin::Server);

        let eth = &snapshot.orders[1];
        assert_eq!(eth.pair, "ETH/USDT");
        assert_eq!(eth.trade_type, TradeType::Sell);
        assert_eq!(eth.status, OrderStatus::InProgress);
        assert_eq!(eth.result, Some(OrderResult::Win));
    }

    #[tokio::test]
    async fn test_orders_not_modified_keeps_book() {
        let backend = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(304))
            .expect(1)
            .mount(&backend)
            .await;

        let handle = session("8", "USER");
        let api = client(&backend, handle.clone());
        let book = OrdersBook::new();
        book.add_local_order(NewOrder {
            pair: "BTC/USDT".into(),
            amount: 500.0,
            currency: "USDT".into(),
            ..Default::default()
        })
        .await;

        book.refresh(&api, &handle.current()).await;
        assert_eq!(book.orders().await.len(), 1);
    }

    // ============================================================================
    // Balance
    // ============================================================================

    #[tokio::test]
    async fn test_balance_accepts_array_and_keeps_last_good_value() {
        let backend = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/5/balance"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"balance": 320, "currency": "USDT"}])),
            )
            .up_to_n_times(1)
            .mount(&backend)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/5/balance"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&backend)
            .await;

        let monitor = BalanceMonitor::new(client(&backend, session("5", "USER")), TIMEOUT);
        let data = assert_ok!(monitor.refresh().await);
        assert_eq!(data.balance, 320.0);

        assert_err!(monitor.refresh().await);
        let state = monitor.current();
        assert!(!state.loading);
        assert_eq!(state.data.map(|d| d.balance), Some(320.0));
        assert!(state.error.is_some());
    }

    // ============================================================================
    // Admin withdrawals
    // ============================================================================

    fn withdrawal(status: &str) -> Withdrawal {
        serde_json::from_value(json!({
            "id": 12, "userId": 4, "asset": "USDT", "amount": "250",
            "network": "TRC20", "address": "T9yD", "status": status
        }))
        .unwrap()
    }

    fn console(backend: &MockServer) -> AdminConsole {
        let handle = session("1", "ADMIN");
        let options = OptionsClient::new("http://127.0.0.1:9", TIMEOUT, handle.clone()).unwrap();
        AdminConsole::new(client(backend, handle), options).unwrap()
    }

    #[tokio::test]
    async fn test_withdrawal_zero_amount_is_refused_locally() {
        let backend = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/withdrawals/12/approve"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&backend)
            .await;

        let admin = console(&backend);
        let w = withdrawal("PENDING");
        for input in ["0", "", "abc", "-5", "inf", "1e999"] {
            let err = assert_err!(admin.approve_withdrawal(&w, Some(input), None, None).await);
            assert_eq!(err.to_string(), "Please enter a valid amount greater than zero");
        }
    }

    #[tokio::test]
    async fn test_withdrawal_approve_defaults_to_requested_amount() {
        let backend = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/withdrawals/12/approve"))
            .and(body_json(json!({"amount": 250.0, "txHash": "0xabc"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&backend)
            .await;
        Mock::given(method("GET"))
            .and(path("/withdrawals"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&backend)
            .await;

        let admin = console(&backend);
        let list = assert_ok!(
            admin
                .approve_withdrawal(&withdrawal("PENDING"), None, Some(" 0xabc "), Some("  "))
                .await
        );
        assert!(list.is_empty());
        assert!(admin.tracker().current("12").is_none());
    }

    #[tokio::test]
    async fn test_withdrawal_terminal_or_unexplained_rejections_refused() {
        let backend = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&backend)
            .await;

        let admin = console(&backend);
        assert_err!(admin.reject_withdrawal(&withdrawal("PENDING"), "   ").await);
        assert_err!(
            admin
                .approve_withdrawal(&withdrawal("COMPLETED"), Some("10"), None, None)
                .await
        );
    }
}
