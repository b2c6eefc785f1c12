mod bot;
mod config;
mod error;
mod health;
mod messages;
mod polymarket;
mod telegram;

use std::net::SocketAddr;
use std::sync::Arc;

use polygram_core::{MemorySessionStore, PolygramService};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::Bot;
use crate::config::AppConfig;
use crate::polymarket::PolymarketClient;
use crate::telegram::TelegramClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "polygram=info,polygram_core=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();

    println!("================================================");
    println!("            POLYGRAM - Starting Up              ");
    println!("================================================");

    let config = AppConfig::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    if config.telegram.bot_token.is_empty() {
        anyhow::bail!(
            "Telegram bot token is not set. Set TELEGRAM_BOT_TOKEN or POLYGRAM__TELEGRAM__BOT_TOKEN"
        );
    }

    println!("[CONFIG] Health server: {}", config.server_addr());
    println!("[CONFIG] Data API: {}", config.polymarket.data_api_url);
    println!("[CONFIG] Gamma API: {}", config.polymarket.gamma_api_url);

    let market_data = PolymarketClient::new(&config.polymarket)?;
    let service = Arc::new(PolygramService::new(MemorySessionStore::new(), market_data));

    let telegram = TelegramClient::new(&config.telegram)?;
    let bot = Bot::new(service.clone(), telegram, config.bot.clone());

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    let app = health::create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(service);

    let addr: SocketAddr = config.server_addr().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Health endpoint listening on http://{}/health", addr);

    let server_shutdown = shutdown.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
            .await
    });

    tracing::info!("Polygram bot started");
    bot.run(shutdown.clone()).await;

    // The poll loop only returns on shutdown; make sure the server follows.
    shutdown.cancel();
    server.await??;

    tracing::info!("Polygram bot stopped");
    Ok(())
}

/// Cancel `token` on Ctrl+C or SIGTERM.
async fn cancel_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
                    _ = tokio::signal::ctrl_c() => tracing::info!("Received Ctrl+C"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot listen for SIGTERM, waiting for Ctrl+C only");
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Received Ctrl+C");
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C");
        }
    }

    token.cancel();
}
