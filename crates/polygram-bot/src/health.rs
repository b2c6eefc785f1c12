//! Health check endpoint

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use polygram_core::{MarketData, PolygramService, SessionStore};
use serde::Serialize;

pub const SERVICE_NAME: &str = "Polygram Bot";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub service: String,
    pub version: String,
    pub connected_wallets: usize,
    pub pending_prompts: usize,
}

pub fn create_router<S, M>() -> Router<Arc<PolygramService<S, M>>>
where
    S: SessionStore + 'static,
    M: MarketData + 'static,
{
    Router::new().route("/health", get(health_check::<S, M>))
}

async fn health_check<S, M>(
    State(service): State<Arc<PolygramService<S, M>>>,
) -> Json<HealthResponse>
where
    S: SessionStore,
    M: MarketData,
{
    let stats = service.stats().await;
    tracing::debug!(
        connected_wallets = stats.connected_wallets,
        pending_prompts = stats.pending_prompts,
        "Health check"
    );

    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: Utc::now(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        connected_wallets: stats.connected_wallets,
        pending_prompts: stats.pending_prompts,
    })
}
