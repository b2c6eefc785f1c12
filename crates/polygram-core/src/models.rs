//! Canonical data models
//!
//! Upstream Polymarket endpoints disagree on field names and units; these
//! are the normalized shapes the rest of Polygram works with. Everything
//! except [`Conversation`] is derived per query and never stored.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker used for `active_since` when a wallet has no trades.
pub const NO_TRADING_HISTORY: &str = "No trading history";

// =============================================================================
// Session Models
// =============================================================================

/// Conversational flag for the wallet connect flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputState {
    /// The bot asked for an address and the next text message is the answer.
    AwaitingWallet,
}

/// Per-conversation session record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Lowercase wallet address, validated on write
    pub wallet_address: Option<String>,

    /// Pending input flow, if any
    pub input_state: Option<InputState>,
}

impl Conversation {
    pub fn is_empty(&self) -> bool {
        self.wallet_address.is_none() && self.input_state.is_none()
    }
}

/// Session store counters, reported on the health endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub connected_wallets: usize,
    pub pending_prompts: usize,
}

/// Result of a connect request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// No address was supplied; the conversation now waits for one.
    AwaitingWallet,
    /// The address was accepted and stored (lowercase).
    Connected { address: String },
}

// =============================================================================
// Market Data Models
// =============================================================================

/// Outcome side of a position.
///
/// Binary markets report `Yes`/`No`; multi-outcome markets carry a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Yes,
    No,
    Other(String),
}

impl Outcome {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("yes") {
            Outcome::Yes
        } else if trimmed.eq_ignore_ascii_case("no") {
            Outcome::No
        } else {
            Outcome::Other(trimmed.to_string())
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Yes => f.write_str("YES"),
            Outcome::No => f.write_str("NO"),
            Outcome::Other(label) => f.write_str(label),
        }
    }
}

/// A normalized open holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Market condition id
    pub market_id: String,

    /// Outcome token id
    pub asset: String,

    /// Market question/title
    pub title: String,

    pub outcome: Outcome,

    /// Number of outcome tokens held
    pub size: f64,

    /// Average entry price (0-1)
    pub avg_price: f64,

    /// Current outcome token price (0-1)
    pub current_price: f64,

    /// Current value in USD
    pub current_value: f64,

    /// Unrealized PnL in USD
    pub pnl: f64,

    /// Unrealized PnL relative to the initial value, in percent
    pub percent_pnl: f64,

    pub redeemable: bool,
    pub mergeable: bool,
}

/// Side of a historical fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => f.write_str("BUY"),
            TradeSide::Sell => f.write_str("SELL"),
        }
    }
}

/// A normalized historical fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub asset: String,
    pub market_id: String,
    pub title: String,
    pub side: TradeSide,
    pub size: f64,
    pub price: f64,
    /// `size * price`
    pub volume: f64,
    pub timestamp: DateTime<Utc>,
    /// Realized PnL contributed by this fill (see [`crate::pnl::realize_trades`])
    pub pnl: f64,
}

/// An active market from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub question: String,
    pub description: Option<String>,
    pub slug: Option<String>,
    /// 24 hour volume in USD
    pub volume_24h: f64,
    /// YES price in cents (0-100)
    pub yes_price: f64,
    /// NO price in cents (0-100)
    pub no_price: f64,
    pub end_date: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub image: Option<String>,
}

/// Wallet-level profit and loss, recomputed on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlSummary {
    pub total_pnl: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub total_volume: f64,
    pub total_trades: usize,
    /// Percentage of trades with positive PnL, one decimal
    pub win_rate: f64,
    /// Date of the earliest trade (`M/D/YYYY`) or [`NO_TRADING_HISTORY`]
    pub active_since: String,
}
