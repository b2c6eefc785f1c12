//! Telegram Bot API client
//!
//! Only the handful of methods the bot needs: long-polling `getUpdates`,
//! `sendMessage`, `editMessageText` and `answerCallbackQuery`.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::TelegramConfig;
use crate::error::{BotError, Result};

/// Extra time on top of the long-poll timeout before the HTTP request gives up.
const POLL_GRACE: Duration = Duration::from_secs(10);

// =============================================================================
// Bot API Types
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

impl Update {
    /// Chat the update belongs to, if any.
    pub fn chat_id(&self) -> Option<i64> {
        self.message
            .as_ref()
            .or_else(|| self.callback_query.as_ref().and_then(|q| q.message.as_ref()))
            .map(|m| m.chat.id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineKeyboardButton {
    pub fn callback(text: &str, data: &str) -> Self {
        Self {
            text: text.to_string(),
            callback_data: data.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    description: Option<String>,
}

// =============================================================================
// Outbound Actions
// =============================================================================

/// Something the bot wants the chat to show.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Send {
        chat_id: i64,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    Edit {
        chat_id: i64,
        message_id: i64,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    AnswerCallback {
        callback_id: String,
        text: Option<String>,
        alert: bool,
    },
}

/// Delivers [`Action`]s to the chat.
pub trait Transport: Send + Sync {
    fn deliver(&self, action: Action) -> impl Future<Output = Result<()>> + Send;
}

// =============================================================================
// Client
// =============================================================================

#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    base_url: String,
    poll_timeout: Duration,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let poll_timeout = Duration::from_secs(config.poll_timeout_seconds);
        let client = Client::builder().timeout(poll_timeout + POLL_GRACE).build()?;

        Ok(Self {
            client,
            base_url: format!(
                "{}/bot{}",
                config.api_url.trim_end_matches('/'),
                config.bot_token
            ),
            poll_timeout,
        })
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>> {
        let mut body = json!({
            "timeout": self.poll_timeout.as_secs(),
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        self.call("getUpdates", body).await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<()> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = serde_json::to_value(keyboard)?;
        }
        self.call::<Value>("sendMessage", body).await.map(drop)
    }

    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<()> {
        let mut body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = serde_json::to_value(keyboard)?;
        }
        self.call::<Value>("editMessageText", body).await.map(drop)
    }

    pub async fn answer_callback_query(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<()> {
        let mut body = json!({ "callback_query_id": callback_id });
        if let Some(text) = text {
            body["text"] = json!(text);
            body["show_alert"] = json!(show_alert);
        }
        self.call::<Value>("answerCallbackQuery", body).await.map(drop)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> Result<T> {
        let url = format!("{}/{}", self.base_url, method);
        // The URL contains the bot token and must not reach errors.
        let response: ApiResponse = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?
            .json()
            .await
            .map_err(reqwest::Error::without_url)?;

        parse_response(method, response)
    }
}

impl Transport for TelegramClient {
    async fn deliver(&self, action: Action) -> Result<()> {
        match action {
            Action::Send {
                chat_id,
                text,
                keyboard,
            } => self.send_message(chat_id, &text, keyboard.as_ref()).await,
            Action::Edit {
                chat_id,
                message_id,
                text,
                keyboard,
            } => {
                self.edit_message_text(chat_id, message_id, &text, keyboard.as_ref())
                    .await
            }
            Action::AnswerCallback {
                callback_id,
                text,
                alert,
            } => {
                self.answer_callback_query(&callback_id, text.as_deref(), alert)
                    .await
            }
        }
    }
}

fn parse_response<T: DeserializeOwned>(method: &str, response: ApiResponse) -> Result<T> {
    if !response.ok {
        return Err(BotError::Telegram(format!(
            "{} failed: {}",
            method,
            response.description.unwrap_or_else(|| "no description".to_string())
        )));
    }
    Ok(serde_json::from_value(response.result.unwrap_or(Value::Null))?)
}
