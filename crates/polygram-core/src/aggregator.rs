//! Position and PNL aggregation
//!
//! The [`MarketData`] trait is the fetch boundary: it returns raw JSON
//! records and nothing else. The [`Aggregator`] normalizes those records,
//! drops the ones it cannot map, and derives the wallet PNL summary.

use std::future::Future;

use serde_json::Value;

use crate::error::{CoreResult, MappingError};
use crate::mapping::{market_from_value, position_from_value, trade_from_value};
use crate::models::{Market, PnlSummary, Position, Trade};
use crate::pnl::{realize_trades, summarize};

/// Read-only source of raw market data records.
///
/// Implementations report network failures, timeouts and non-2xx responses
/// as `CoreError::UpstreamUnavailable`. An unusable payload is an empty list.
pub trait MarketData: Send + Sync {
    fn fetch_positions(&self, address: &str) -> impl Future<Output = CoreResult<Vec<Value>>> + Send;

    fn fetch_trades(&self, address: &str) -> impl Future<Output = CoreResult<Vec<Value>>> + Send;

    fn fetch_active_markets(&self, limit: usize) -> impl Future<Output = CoreResult<Vec<Value>>> + Send;
}

/// Derives positions, trades and PNL for a wallet on demand. Nothing is cached.
pub struct Aggregator<M> {
    source: M,
}

impl<M: MarketData> Aggregator<M> {
    pub fn new(source: M) -> Self {
        Self { source }
    }

    /// Open positions in upstream order. Fails only if the fetch fails.
    pub async fn list_positions(&self, address: &str) -> CoreResult<Vec<Position>> {
        let address = address.to_ascii_lowercase();
        let records = self.source.fetch_positions(&address).await?;
        let positions = map_records(&records, "position", position_from_value);

        tracing::debug!(
            wallet = %address,
            fetched = records.len(),
            mapped = positions.len(),
            "Positions normalized"
        );
        Ok(positions)
    }

    /// Trade history in upstream order with realized PnL assigned.
    ///
    /// A failed fetch is logged and yields an empty history.
    pub async fn list_trades(&self, address: &str) -> Vec<Trade> {
        let address = address.to_ascii_lowercase();
        let records = match self.source.fetch_trades(&address).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(wallet = %address, error = %e, "Trade history unavailable, continuing without it");
                return Vec::new();
            }
        };

        let mut trades = map_records(&records, "trade", trade_from_value);
        realize_trades(&mut trades);
        trades
    }

    /// Wallet PNL summary. Position fetch failures propagate; trade fetch
    /// failures degrade to an empty history.
    pub async fn compute_pnl(&self, address: &str) -> CoreResult<PnlSummary> {
        tracing::info!(wallet = %address, "Calculating PNL");

        let positions = self.list_positions(address).await?;
        let trades = self.list_trades(address).await;
        let summary = summarize(&positions, &trades);

        tracing::info!(
            wallet = %address,
            positions = positions.len(),
            trades = summary.total_trades,
            total_pnl = summary.total_pnl,
            "PNL calculated"
        );
        Ok(summary)
    }

    /// Active markets by descending 24h volume, at most `page_size` of them.
    pub async fn list_active_markets(&self, page_size: usize) -> CoreResult<Vec<Market>> {
        let records = self.source.fetch_active_markets(page_size).await?;
        let mut markets = map_records(&records, "market", market_from_value);

        markets.sort_by(|a, b| b.volume_24h.total_cmp(&a.volume_24h));
        markets.truncate(page_size);
        Ok(markets)
    }
}

/// Map every record, logging and skipping the ones that fail.
fn map_records<T>(
    records: &[Value],
    kind: &'static str,
    map: impl Fn(&Value) -> Result<T, MappingError>,
) -> Vec<T> {
    records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| match map(record) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(kind, index, error = %e, "Skipping upstream record");
                None
            }
        })
        .collect()
}
