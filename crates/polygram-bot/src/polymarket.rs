//! Polymarket API client
//!
//! Fetches raw position and trade records from the Data API and the active
//! market catalog from the Gamma API. Records are returned untouched; the
//! core normalizes them.

use std::time::Duration;

use polygram_core::{CoreError, CoreResult, MarketData};
use reqwest::Client;
use serde_json::Value;

use crate::config::PolymarketConfig;
use crate::error::Result;

/// Polymarket API client
#[derive(Clone)]
pub struct PolymarketClient {
    client: Client,
    data_api_url: String,
    gamma_api_url: String,
    positions_limit: usize,
    trades_limit: usize,
}

impl PolymarketClient {
    /// Create a new Polymarket client
    pub fn new(config: &PolymarketConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("Polygram/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            data_api_url: config.data_api_url.trim_end_matches('/').to_string(),
            gamma_api_url: config.gamma_api_url.trim_end_matches('/').to_string(),
            positions_limit: config.positions_limit,
            trades_limit: config.trades_limit,
        })
    }

    async fn get_records(&self, url: &str, query: &[(&str, String)]) -> CoreResult<Vec<Value>> {
        tracing::debug!(url = %url, "Fetching upstream records");

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| upstream_error(url, e))?;

        if !response.status().is_success() {
            tracing::warn!(url = %url, status = %response.status(), "Upstream returned error status");
            return Err(CoreError::UpstreamUnavailable(format!(
                "{} returned status {}",
                url,
                response.status()
            )));
        }

        let body: Value = response.json().await.map_err(|e| upstream_error(url, e))?;
        Ok(extract_records(body))
    }
}

impl MarketData for PolymarketClient {
    async fn fetch_positions(&self, address: &str) -> CoreResult<Vec<Value>> {
        let url = format!("{}/positions", self.data_api_url);
        let query = [
            ("user", address.to_string()),
            ("limit", self.positions_limit.to_string()),
        ];
        self.get_records(&url, &query).await
    }

    async fn fetch_trades(&self, address: &str) -> CoreResult<Vec<Value>> {
        let url = format!("{}/trades", self.data_api_url);
        let query = [
            ("user", address.to_string()),
            ("limit", self.trades_limit.to_string()),
        ];
        self.get_records(&url, &query).await
    }

    async fn fetch_active_markets(&self, limit: usize) -> CoreResult<Vec<Value>> {
        let url = format!("{}/markets", self.gamma_api_url);
        let query = [
            ("limit", limit.to_string()),
            ("active", "true".to_string()),
            ("closed", "false".to_string()),
            ("order", "volume24hr".to_string()),
            ("ascending", "false".to_string()),
        ];
        self.get_records(&url, &query).await
    }
}

fn upstream_error(url: &str, e: reqwest::Error) -> CoreError {
    let reason = if e.is_timeout() { "request timed out" } else { "request failed" };
    tracing::warn!(url = %url, error = %e, reason, "Upstream request failed");
    CoreError::UpstreamUnavailable(format!("{url}: {reason}"))
}

/// Records from either a bare JSON array or a `{ "data": [...] }` envelope.
/// Anything else carries no usable records.
fn extract_records(body: Value) -> Vec<Value> {
    match body {
        Value::Array(records) => records,
        Value::Object(mut envelope) => match envelope.remove("data") {
            Some(Value::Array(records)) => records,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
