//! Configuration management for the Polygram bot

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub polymarket: PolymarketConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub bot: BotConfig,
}

/// Telegram Bot API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot token issued by @BotFather
    #[serde(default = "default_bot_token")]
    pub bot_token: String,
    /// Bot API base URL
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
    /// Long-poll timeout for getUpdates, in seconds
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_seconds: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: default_bot_token(),
            api_url: default_telegram_api_url(),
            poll_timeout_seconds: default_poll_timeout(),
        }
    }
}

fn default_bot_token() -> String {
    std::env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default()
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u64 {
    30
}

/// Polymarket API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PolymarketConfig {
    /// Data API (positions, trades)
    #[serde(default = "default_data_api_url")]
    pub data_api_url: String,
    /// Gamma API (market catalog)
    #[serde(default = "default_gamma_api_url")]
    pub gamma_api_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_positions_limit")]
    pub positions_limit: usize,
    #[serde(default = "default_trades_limit")]
    pub trades_limit: usize,
}

impl Default for PolymarketConfig {
    fn default() -> Self {
        Self {
            data_api_url: default_data_api_url(),
            gamma_api_url: default_gamma_api_url(),
            timeout_seconds: default_timeout(),
            positions_limit: default_positions_limit(),
            trades_limit: default_trades_limit(),
        }
    }
}

fn default_data_api_url() -> String {
    std::env::var("POLYMARKET_DATA_API_URL")
        .unwrap_or_else(|_| "https://data-api.polymarket.com".to_string())
}

fn default_gamma_api_url() -> String {
    std::env::var("POLYMARKET_API_URL")
        .unwrap_or_else(|_| "https://gamma-api.polymarket.com".to_string())
}

fn default_timeout() -> u64 {
    10
}

fn default_positions_limit() -> usize {
    100
}

fn default_trades_limit() -> usize {
    1000
}

/// Health server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000)
}

/// Chat behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Markets listed by /markets
    #[serde(default = "default_markets_page_size")]
    pub markets_page_size: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            markets_page_size: default_markets_page_size(),
        }
    }
}

fn default_markets_page_size() -> usize {
    10
}

impl AppConfig {
    /// Load configuration from defaults, optional files and environment
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with defaults
            .set_default("telegram.bot_token", default_bot_token())?
            .set_default("telegram.api_url", default_telegram_api_url())?
            .set_default("telegram.poll_timeout_seconds", default_poll_timeout() as i64)?
            .set_default("polymarket.data_api_url", default_data_api_url())?
            .set_default("polymarket.gamma_api_url", default_gamma_api_url())?
            .set_default("polymarket.timeout_seconds", default_timeout() as i64)?
            .set_default("polymarket.positions_limit", default_positions_limit() as i64)?
            .set_default("polymarket.trades_limit", default_trades_limit() as i64)?
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("bot.markets_page_size", default_markets_page_size() as i64)?
            // Load from config files if present
            .add_source(File::with_name("polygram").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (POLYGRAM__TELEGRAM__BOT_TOKEN, etc.)
            .add_source(
                Environment::with_prefix("POLYGRAM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let polymarket = PolymarketConfig::default();
        assert_eq!(polymarket.timeout_seconds, 10);
        assert_eq!(polymarket.positions_limit, 100);
        assert_eq!(polymarket.trades_limit, 1000);

        let telegram = TelegramConfig::default();
        assert_eq!(telegram.api_url, "https://api.telegram.org");
        assert_eq!(telegram.poll_timeout_seconds, 30);

        assert_eq!(BotConfig::default().markets_page_size, 10);
    }

    #[test]
    fn test_server_addr() {
        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8088,
            },
            ..Default::default()
        };
        assert_eq!(config.server_addr(), "127.0.0.1:8088");
    }
}
