//! TradeFlow Library
//!
//! Client toolkit for the TradeFlow crypto trading platform: session,
//! backend REST client, orders book, balance monitor, layered price
//! lookup, trade ticket, admin console and the local options/price service.

pub mod admin;
pub mod api;
pub mod balance;
pub mod config;
pub mod error;
pub mod oracle;
pub mod orders;
pub mod persistence;
pub mod session;
pub mod trade;
pub mod types;

#[cfg(feature = "server")]
pub mod server;
