//! TradeFlow backend integration
//!
//! Typed REST client over the external backend, a client for the local
//! prediction options service, and the DTOs both exchange.

pub mod options;
pub mod rest;
pub mod types;

pub use options::OptionsClient;
pub use rest::{parse_balance, BackendClient};
pub use types::*;
