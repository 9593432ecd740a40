//! Core types shared across TradeFlow
//!
//! Order enums, supported coins and their external identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of a prediction trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeType {
    Buy,
    Sell,
}

impl Default for TradeType {
    fn default() -> Self {
        TradeType::Buy
    }
}

impl TradeType {
    /// Anything other than SELL counts as BUY
    pub fn from_loose(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("SELL") {
            TradeType::Sell
        } else {
            TradeType::Buy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Buy => "BUY",
            TradeType::Sell => "SELL",
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predicted price direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Only the exact strings "UP" and "DOWN" are accepted
    pub fn from_exact(s: &str) -> Option<Self> {
        match s {
            "UP" => Some(Direction::Up),
            "DOWN" => Some(Direction::Down),
            _ => None,
        }
    }

    /// Parse user input ("up", "Down", ...)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "UP" => Some(Direction::Up),
            "DOWN" => Some(Direction::Down),
            _ => None,
        }
    }

    /// Trade side a direction is submitted as
    pub fn trade_type(&self) -> TradeType {
        match self {
            Direction::Up => TradeType::Buy,
            Direction::Down => TradeType::Sell,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "UP"),
            Direction::Down => write!(f, "DOWN"),
        }
    }
}

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl OrderStatus {
    /// Map a backend status string onto the closed set.
    /// Unknown or missing values are pending; "rejected" is cancelled.
    pub fn from_loose(s: Option<&str>) -> Self {
        match s.map(|v| v.to_lowercase()).as_deref() {
            Some("completed") => OrderStatus::Completed,
            Some("cancelled") | Some("rejected") => OrderStatus::Cancelled,
            Some("in-progress") => OrderStatus::InProgress,
            _ => OrderStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InProgress => "in-progress",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settled outcome of a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderResult {
    Win,
    Loss,
}

impl OrderResult {
    pub fn from_exact(s: &str) -> Option<Self> {
        match s {
            "WIN" => Some(OrderResult::Win),
            "LOSS" => Some(OrderResult::Loss),
            _ => None,
        }
    }
}

impl fmt::Display for OrderResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderResult::Win => write!(f, "WIN"),
            OrderResult::Loss => write!(f, "LOSS"),
        }
    }
}

/// Whether an order has been confirmed by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderOrigin {
    Server,
    Local,
}

impl OrderOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderOrigin::Server => "server",
            OrderOrigin::Local => "local",
        }
    }
}

/// Coins with known quote-provider identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Coin {
    BTC,
    ETH,
    LTC,
    DOT,
    SOL,
    ADA,
    BNB,
    XRP,
    DOGE,
    AVAX,
    MATIC,
    LINK,
    UNI,
    AAVE,
}

impl Coin {
    pub const ALL: [Coin; 14] = [
        Coin::BTC,
        Coin::ETH,
        Coin::LTC,
        Coin::DOT,
        Coin::SOL,
        Coin::ADA,
        Coin::BNB,
        Coin::XRP,
        Coin::DOGE,
        Coin::AVAX,
        Coin::MATIC,
        Coin::LINK,
        Coin::UNI,
        Coin::AAVE,
    ];

    /// Short pair id used by the price proxy (e.g., "btc")
    pub fn pair_id(&self) -> &'static str {
        match self {
            Coin::BTC => "btc",
            Coin::ETH => "eth",
            Coin::LTC => "ltc",
            Coin::DOT => "dot",
            Coin::SOL => "sol",
            Coin::ADA => "ada",
            Coin::BNB => "bnb",
            Coin::XRP => "xrp",
            Coin::DOGE => "doge",
            Coin::AVAX => "avax",
            Coin::MATIC => "matic",
            Coin::LINK => "link",
            Coin::UNI => "uni",
            Coin::AAVE => "aave",
        }
    }

    /// CoinGecko coin id (e.g., "bitcoin")
    pub fn coingecko_id(&self) -> &'static str {
        match self {
            Coin::BTC => "bitcoin",
            Coin::ETH => "ethereum",
            Coin::LTC => "litecoin",
            Coin::DOT => "polkadot",
            Coin::SOL => "solana",
            Coin::ADA => "cardano",
            Coin::BNB => "binancecoin",
            Coin::XRP => "ripple",
            Coin::DOGE => "dogecoin",
            Coin::AVAX => "avalanche-2",
            Coin::MATIC => "matic-network",
            Coin::LINK => "chainlink",
            Coin::UNI => "uniswap",
            Coin::AAVE => "aave",
        }
    }

    /// CoinMarketCap numeric id
    pub fn coinmarketcap_id(&self) -> u32 {
        match self {
            Coin::BTC => 1,
            Coin::ETH => 1027,
            Coin::LTC => 2,
            Coin::DOT => 6636,
            Coin::SOL => 5426,
            Coin::ADA => 2010,
            Coin::BNB => 1839,
            Coin::XRP => 52,
            Coin::DOGE => 74,
            Coin::AVAX => 5805,
            Coin::MATIC => 3890,
            Coin::LINK => 1975,
            Coin::UNI => 7083,
            Coin::AAVE => 7278,
        }
    }

    /// Parse from a short pair id. Case-sensitive, matching the proxy's lookup table.
    pub fn from_pair_id(s: &str) -> Option<Self> {
        Coin::ALL.iter().copied().find(|c| c.pair_id() == s)
    }

    /// Parse from a trading symbol such as "BTC/USDT", "btcusdt" or "BTC"
    pub fn from_symbol(s: &str) -> Option<Self> {
        let upper = s.trim().to_uppercase();
        let base = upper
            .split(['/', '-', '_'])
            .next()
            .unwrap_or_default()
            .trim_end_matches("USDT")
            .to_string();
        Coin::ALL
            .iter()
            .copied()
            .find(|c| c.pair_id().eq_ignore_ascii_case(&base))
    }

    /// CoinGecko id for an arbitrary pair id, passing unknown ids through
    pub fn coingecko_id_for(pair_id: &str) -> String {
        Coin::from_pair_id(pair_id)
            .map(|c| c.coingecko_id().to_string())
            .unwrap_or_else(|| pair_id.to_string())
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pair_id().to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_normalization_folds_rejected_into_cancelled() {
        assert_eq!(
            OrderStatus::from_loose(Some("REJECTED")),
            OrderStatus::Cancelled
        );
        assert_eq!(
            OrderStatus::from_loose(Some("Completed")),
            OrderStatus::Completed
        );
        assert_eq!(
            OrderStatus::from_loose(Some("in-progress")),
            OrderStatus::InProgress
        );
        assert_eq!(OrderStatus::from_loose(Some("open")), OrderStatus::Pending);
        assert_eq!(OrderStatus::from_loose(None), OrderStatus::Pending);
    }

    #[test]
    fn status_serializes_kebab_case() {
        let json = serde_json::to_string(&OrderStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
    }

    #[test]
    fn trade_type_defaults_to_buy() {
        assert_eq!(TradeType::from_loose("sell"), TradeType::Sell);
        assert_eq!(TradeType::from_loose("UP"), TradeType::Buy);
        assert_eq!(TradeType::from_loose(""), TradeType::Buy);
    }

    #[test]
    fn coin_symbol_parsing() {
        assert_eq!(Coin::from_symbol("BTC/USDT"), Some(Coin::BTC));
        assert_eq!(Coin::from_symbol("ethusdt"), Some(Coin::ETH));
        assert_eq!(Coin::from_symbol("doge"), Some(Coin::DOGE));
        assert_eq!(Coin::from_symbol("FOO/USDT"), None);
        assert_eq!(Coin::from_pair_id("BTC"), None);
        assert_eq!(Coin::coingecko_id_for("avax"), "avalanche-2");
        assert_eq!(Coin::coingecko_id_for("pepe"), "pepe");
    }
}
