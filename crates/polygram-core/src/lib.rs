//! # Polygram Core
//!
//! Wallet sessions and PNL aggregation for the Polygram Telegram bot.
//!
//! This crate holds everything that does not depend on the chat transport:
//! per-conversation session state, normalization of raw Polymarket records
//! into canonical positions/trades/markets, and the PNL summary derived
//! from them.

pub mod address;
pub mod aggregator;
pub mod error;
pub mod mapping;
pub mod models;
pub mod pnl;
pub mod service;
pub mod session;

pub use address::*;
pub use aggregator::*;
pub use error::*;
pub use models::*;
pub use service::*;
pub use session::*;
