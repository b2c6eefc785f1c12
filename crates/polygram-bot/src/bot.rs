//! Update dispatcher
//!
//! Routes Telegram updates to commands, inline-keyboard callbacks and free
//! text, drives the wallet connect flow through [`PolygramService`] and hands
//! rendered replies to a [`Transport`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use polygram_core::{
    is_valid_address, ConnectOutcome, CoreError, InputState, MarketData, PolygramService,
    SessionStore,
};
use tokio_util::sync::CancellationToken;

use crate::config::BotConfig;
use crate::error::Result;
use crate::messages;
use crate::telegram::{
    Action, CallbackQuery, InlineKeyboardMarkup, Message, TelegramClient, Transport, Update,
};

/// Telegram rejects messages longer than this many characters.
const MAX_MESSAGE_CHARS: usize = 4096;

/// Back-off after a failed `getUpdates` call.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Bot commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Connect,
    Positions,
    Pnl,
    Markets,
    Status,
}

impl Command {
    /// Parse the leading `/command` (optionally `/command@botname`).
    ///
    /// Returns `None` for plain text and for commands the bot does not know.
    pub fn parse(text: &str) -> Option<Self> {
        let token = text.split_whitespace().next()?;
        let name = token.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);

        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            "connect" => Some(Command::Connect),
            "positions" => Some(Command::Positions),
            "pnl" => Some(Command::Pnl),
            "markets" => Some(Command::Markets),
            "status" => Some(Command::Status),
            _ => None,
        }
    }
}

pub struct Bot<S, M, T> {
    service: Arc<PolygramService<S, M>>,
    transport: T,
    config: BotConfig,
}

impl<S, M, T> Bot<S, M, T>
where
    S: SessionStore,
    M: MarketData,
    T: Transport,
{
    pub fn new(service: Arc<PolygramService<S, M>>, transport: T, config: BotConfig) -> Self {
        Self {
            service,
            transport,
            config,
        }
    }

    /// Handle one polled batch.
    ///
    /// Updates of the same chat run in arrival order; different chats run
    /// concurrently. Returns once every update has been handled.
    pub async fn process_batch(&self, updates: Vec<Update>) {
        let mut by_chat: HashMap<Option<i64>, Vec<Update>> = HashMap::new();
        for update in updates {
            by_chat.entry(update.chat_id()).or_default().push(update);
        }

        let chats = by_chat.into_values().map(|updates| async move {
            for update in updates {
                self.handle_update(update).await;
            }
        });
        join_all(chats).await;
    }

    pub async fn handle_update(&self, update: Update) {
        let update_id = update.update_id;

        if let Some(query) = update.callback_query {
            self.handle_callback(query).await;
        } else if let Some(message) = update.message {
            let chat_id = message.chat.id;
            if let Err(e) = self.handle_message(&message).await {
                tracing::error!(update_id, chat_id, error = %e, "Failed to handle message");
                if let Err(e) = self.send(chat_id, messages::generic_error(), None).await {
                    tracing::warn!(chat_id, error = %e, "Failed to deliver error reply");
                }
            }
        } else {
            tracing::debug!(update_id, "Ignoring unsupported update");
        }
    }

    async fn handle_message(&self, message: &Message) -> Result<()> {
        let Some(text) = message.text.as_deref() else {
            return Ok(());
        };
        let chat_id = message.chat.id;
        let conversation = chat_id.to_string();

        if let Some(command) = Command::parse(text) {
            tracing::info!(chat_id, command = ?command, "Command received");
            let argument = text.split_whitespace().nth(1);
            return self
                .handle_command(chat_id, &conversation, command, argument)
                .await;
        }
        if text.starts_with('/') {
            tracing::debug!(chat_id, text, "Ignoring unknown command");
            return Ok(());
        }

        self.handle_text(chat_id, &conversation, text.trim()).await
    }

    async fn handle_command(
        &self,
        chat_id: i64,
        conversation: &str,
        command: Command,
        argument: Option<&str>,
    ) -> Result<()> {
        match command {
            Command::Start => self.send(chat_id, messages::welcome(), None).await,
            Command::Help => self.send(chat_id, messages::help(), None).await,
            Command::Connect => {
                self.service.connect(conversation, None).await?;
                // `/connect <address>` answers the prompt in one step
                if let Some(address) = argument {
                    return self.submit_wallet(chat_id, conversation, address).await;
                }
                self.send(
                    chat_id,
                    messages::connect_prompt(),
                    Some(messages::connect_keyboard()),
                )
                .await
            }
            Command::Positions => self.show_positions(chat_id, conversation).await,
            Command::Pnl => self.show_pnl(chat_id, conversation).await,
            Command::Markets => self.show_markets(chat_id).await,
            Command::Status => {
                let wallet = self.service.wallet(conversation).await;
                self.send(chat_id, messages::status(wallet.as_deref()), None)
                    .await
            }
        }
    }

    /// Free text is either the answer to a wallet prompt or, unprompted, a
    /// possible address that needs confirming. Anything else is ignored.
    async fn handle_text(&self, chat_id: i64, conversation: &str, text: &str) -> Result<()> {
        if self.service.input_state(conversation).await == Some(InputState::AwaitingWallet) {
            return self.submit_wallet(chat_id, conversation, text).await;
        }

        if is_valid_address(text) {
            return self
                .send(
                    chat_id,
                    messages::confirm_wallet(text),
                    Some(messages::confirm_wallet_keyboard(text)),
                )
                .await;
        }

        tracing::debug!(chat_id, "Ignoring free text");
        Ok(())
    }

    /// Answer a pending wallet prompt. An invalid address keeps the prompt
    /// open and asks again.
    async fn submit_wallet(&self, chat_id: i64, conversation: &str, text: &str) -> Result<()> {
        match self.service.connect(conversation, Some(text)).await {
            Ok(ConnectOutcome::Connected { address }) => {
                self.send(chat_id, messages::wallet_connected(&address), None)
                    .await
            }
            Ok(ConnectOutcome::AwaitingWallet) => {
                self.send(chat_id, messages::enter_wallet_prompt(), None).await
            }
            Err(CoreError::InvalidAddress(_)) => {
                tracing::debug!(chat_id, "Rejected wallet address");
                self.send(chat_id, messages::invalid_address(text), None).await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn show_positions(&self, chat_id: i64, conversation: &str) -> Result<()> {
        if self.service.wallet(conversation).await.is_none() {
            return self.send(chat_id, messages::no_wallet(), None).await;
        }
        self.send(chat_id, messages::fetching_positions(), None).await?;

        let reply = match self.service.positions(conversation).await {
            Ok(positions) if positions.is_empty() => messages::no_positions(),
            Ok(positions) => messages::positions(&positions),
            Err(CoreError::WalletNotConnected(_)) => messages::no_wallet(),
            Err(e) => {
                tracing::warn!(chat_id, error = %e, "Positions unavailable");
                messages::positions_failed()
            }
        };
        self.send(chat_id, reply, None).await
    }

    async fn show_pnl(&self, chat_id: i64, conversation: &str) -> Result<()> {
        if self.service.wallet(conversation).await.is_none() {
            return self.send(chat_id, messages::no_wallet(), None).await;
        }
        self.send(chat_id, messages::calculating_pnl(), None).await?;

        let reply = match self.service.pnl(conversation).await {
            Ok(summary) => messages::pnl(&summary),
            Err(CoreError::WalletNotConnected(_)) => messages::no_wallet(),
            Err(e) => {
                tracing::warn!(chat_id, error = %e, "PNL unavailable");
                messages::pnl_failed()
            }
        };
        self.send(chat_id, reply, None).await
    }

    async fn show_markets(&self, chat_id: i64) -> Result<()> {
        self.send(chat_id, messages::fetching_markets(), None).await?;

        let reply = match self.service.markets(self.config.markets_page_size).await {
            Ok(markets) => messages::markets(&markets),
            Err(e) => {
                tracing::warn!(chat_id, error = %e, "Markets unavailable");
                messages::markets_failed()
            }
        };
        self.send(chat_id, reply, None).await
    }

    async fn handle_callback(&self, query: CallbackQuery) {
        let data = query.data.as_deref().unwrap_or_default();

        let answer = match &query.message {
            Some(message) => match self.dispatch_callback(message, data).await {
                Ok(()) => None,
                Err(e) => {
                    tracing::error!(
                        chat_id = message.chat.id,
                        data,
                        error = %e,
                        "Failed to handle callback"
                    );
                    Some(messages::callback_error())
                }
            },
            None => {
                tracing::debug!(data, "Callback without message");
                None
            }
        };

        let alert = answer.is_some();
        let action = Action::AnswerCallback {
            callback_id: query.id,
            text: answer,
            alert,
        };
        if let Err(e) = self.transport.deliver(action).await {
            tracing::warn!(error = %e, "Failed to answer callback query");
        }
    }

    async fn dispatch_callback(&self, message: &Message, data: &str) -> Result<()> {
        let chat_id = message.chat.id;
        let message_id = message.message_id;
        let conversation = chat_id.to_string();

        if let Some(address) = data.strip_prefix(messages::CB_CONFIRM_WALLET) {
            let address = match self.service.connect(&conversation, Some(address)).await? {
                ConnectOutcome::Connected { address } => address,
                ConnectOutcome::AwaitingWallet => {
                    return self
                        .edit(chat_id, message_id, messages::enter_wallet_prompt(), None)
                        .await
                }
            };
            return self
                .edit(chat_id, message_id, messages::wallet_connected(&address), None)
                .await;
        }

        match data {
            messages::CB_ENTER_WALLET => {
                self.service.connect(&conversation, None).await?;
                self.edit(
                    chat_id,
                    message_id,
                    messages::enter_wallet_prompt(),
                    Some(messages::back_keyboard()),
                )
                .await
            }
            messages::CB_WALLET_HELP => {
                self.edit(
                    chat_id,
                    message_id,
                    messages::wallet_help(),
                    Some(messages::wallet_help_keyboard()),
                )
                .await
            }
            messages::CB_BACK_TO_CONNECT => {
                self.edit(
                    chat_id,
                    message_id,
                    messages::connect_prompt(),
                    Some(messages::connect_keyboard()),
                )
                .await
            }
            messages::CB_DISMISS_WALLET => {
                self.service.cancel_prompt(&conversation).await;
                self.edit(chat_id, message_id, messages::wallet_dismissed(), None)
                    .await
            }
            _ => {
                tracing::debug!(chat_id, data, "Unknown callback data");
                Ok(())
            }
        }
    }

    /// Send `text`, split into as many messages as Telegram needs. The
    /// keyboard goes on the last one.
    async fn send(
        &self,
        chat_id: i64,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<()> {
        let mut chunks = split_message(&text, MAX_MESSAGE_CHARS);
        let last = chunks.pop().unwrap_or_default();

        for chunk in chunks {
            self.transport
                .deliver(Action::Send {
                    chat_id,
                    text: chunk,
                    keyboard: None,
                })
                .await?;
        }
        self.transport
            .deliver(Action::Send {
                chat_id,
                text: last,
                keyboard,
            })
            .await
    }

    async fn edit(
        &self,
        chat_id: i64,
        message_id: i64,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<()> {
        self.transport
            .deliver(Action::Edit {
                chat_id,
                message_id,
                text,
                keyboard,
            })
            .await
    }
}

impl<S, M> Bot<S, M, TelegramClient>
where
    S: SessionStore,
    M: MarketData,
{
    /// Long-poll Telegram until `shutdown` fires.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut offset: Option<i64> = None;
        tracing::info!("Polling Telegram for updates");

        loop {
            let polled = tokio::select! {
                _ = shutdown.cancelled() => break,
                polled = self.transport.get_updates(offset) => polled,
            };

            match polled {
                Ok(updates) => {
                    if let Some(last) = updates.iter().map(|u| u.update_id).max() {
                        offset = Some(last + 1);
                    }
                    if !updates.is_empty() {
                        tracing::debug!(count = updates.len(), "Received updates");
                        self.process_batch(updates).await;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "getUpdates failed, retrying");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(POLL_RETRY_DELAY) => {}
                    }
                }
            }
        }

        tracing::info!("Stopped polling");
    }
}

/// Split on paragraph boundaries so no piece exceeds `max_chars`. A single
/// paragraph longer than that is cut at character boundaries.
fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split_inclusive("\n\n") {
        if current.chars().count() + paragraph.chars().count() > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }

        if paragraph.chars().count() > max_chars {
            let chars: Vec<char> = paragraph.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
        } else {
            current.push_str(paragraph);
        }
    }

    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use polygram_core::{CoreResult, MemorySessionStore};
    use serde_json::{json, Value};
    use std::sync::Mutex;

    const MIXED: &str = "0x742d35Cc6634C0532925a3b8D4C9db96590c6C87";
    const LOWER: &str = "0x742d35cc6634c0532925a3b8d4c9db96590c6c87";

    #[derive(Clone, Default)]
    struct Recorder {
        actions: Arc<Mutex<Vec<Action>>>,
    }

    impl Recorder {
        fn take(&self) -> Vec<Action> {
            std::mem::take(&mut *self.actions.lock().unwrap())
        }
    }

    impl Transport for Recorder {
        async fn deliver(&self, action: Action) -> Result<()> {
            self.actions.lock().unwrap().push(action);
            Ok(())
        }
    }

    /// `None` simulates an unreachable upstream.
    #[derive(Default)]
    struct FakeMarketData {
        positions: Option<Vec<Value>>,
        markets: Option<Vec<Value>>,
    }

    impl MarketData for FakeMarketData {
        async fn fetch_positions(&self, _address: &str) -> CoreResult<Vec<Value>> {
            self.positions
                .clone()
                .ok_or_else(|| CoreError::UpstreamUnavailable("positions".to_string()))
        }

        async fn fetch_trades(&self, _address: &str) -> CoreResult<Vec<Value>> {
            Ok(Vec::new())
        }

        async fn fetch_active_markets(&self, _limit: usize) -> CoreResult<Vec<Value>> {
            self.markets
                .clone()
                .ok_or_else(|| CoreError::UpstreamUnavailable("markets".to_string()))
        }
    }

    fn bot(
        market_data: FakeMarketData,
    ) -> (Bot<MemorySessionStore, FakeMarketData, Recorder>, Recorder) {
        let recorder = Recorder::default();
        let service = Arc::new(PolygramService::new(MemorySessionStore::new(), market_data));
        let bot = Bot::new(service, recorder.clone(), BotConfig::default());
        (bot, recorder)
    }

    fn text_update(chat_id: i64, text: &str) -> Update {
        serde_json::from_value(json!({
            "update_id": 1,
            "message": {"message_id": 10, "chat": {"id": chat_id}, "text": text}
        }))
        .unwrap()
    }

    fn callback_update(chat_id: i64, data: &str) -> Update {
        serde_json::from_value(json!({
            "update_id": 2,
            "callback_query": {
                "id": "cb",
                "message": {"message_id": 11, "chat": {"id": chat_id}},
                "data": data
            }
        }))
        .unwrap()
    }

    fn sent_texts(actions: &[Action]) -> Vec<String> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Send { text, .. } | Action::Edit { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/pnl@PolygramBot"), Some(Command::Pnl));
        assert_eq!(Command::parse("  /Markets now"), Some(Command::Markets));
        assert_eq!(Command::parse("/disconnect"), None);
        assert_eq!(Command::parse("positions"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn test_split_message() {
        assert_eq!(split_message("short", 10), vec!["short".to_string()]);
        assert_eq!(split_message("", 10), vec![String::new()]);

        let chunks = split_message("aaaa\n\nbbbb\n\ncccc", 12);
        assert_eq!(chunks, vec!["aaaa\n\nbbbb\n\n".to_string(), "cccc".to_string()]);

        let chunks = split_message("abcdefghij", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[tokio::test]
    async fn test_start_sends_welcome() {
        let (bot, recorder) = bot(FakeMarketData::default());
        bot.handle_update(text_update(1, "/start")).await;

        let texts = sent_texts(&recorder.take());
        assert_eq!(texts, vec![messages::welcome()]);
    }

    #[tokio::test]
    async fn test_connect_flow_reprompts_then_connects() {
        let (bot, recorder) = bot(FakeMarketData::default());

        bot.handle_update(text_update(1, "/connect")).await;
        let actions = recorder.take();
        assert!(matches!(
            &actions[0],
            Action::Send { keyboard: Some(k), .. } if *k == messages::connect_keyboard()
        ));
        assert_eq!(
            bot.service.input_state("1").await,
            Some(InputState::AwaitingWallet)
        );

        bot.handle_update(text_update(1, "0x123")).await;
        assert_eq!(
            sent_texts(&recorder.take()),
            vec![messages::invalid_address("0x123")]
        );
        assert_eq!(
            bot.service.input_state("1").await,
            Some(InputState::AwaitingWallet)
        );

        bot.handle_update(text_update(1, &format!("  {MIXED} "))).await;
        assert_eq!(
            sent_texts(&recorder.take()),
            vec![messages::wallet_connected(LOWER)]
        );
        assert_eq!(bot.service.wallet("1").await.as_deref(), Some(LOWER));
        assert_eq!(bot.service.input_state("1").await, None);
    }

    #[tokio::test]
    async fn test_connect_with_address_argument() {
        let (bot, recorder) = bot(FakeMarketData::default());

        bot.handle_update(text_update(2, &format!("/connect {MIXED}")))
            .await;
        assert_eq!(
            sent_texts(&recorder.take()),
            vec![messages::wallet_connected(LOWER)]
        );
        assert_eq!(bot.service.wallet("2").await.as_deref(), Some(LOWER));
        assert_eq!(bot.service.input_state("2").await, None);
    }

    #[tokio::test]
    async fn test_connect_with_invalid_argument_keeps_prompt() {
        let (bot, recorder) = bot(FakeMarketData::default());

        bot.handle_update(text_update(2, "/connect@PolygramBot 0x123")).await;
        assert_eq!(
            sent_texts(&recorder.take()),
            vec![messages::invalid_address("0x123")]
        );
        assert_eq!(bot.service.wallet("2").await, None);
        assert_eq!(
            bot.service.input_state("2").await,
            Some(InputState::AwaitingWallet)
        );

        bot.handle_update(text_update(2, MIXED)).await;
        assert_eq!(bot.service.wallet("2").await.as_deref(), Some(LOWER));
    }

    #[tokio::test]
    async fn test_unprompted_address_needs_confirmation() {
        let (bot, recorder) = bot(FakeMarketData::default());

        bot.handle_update(text_update(3, MIXED)).await;
        let actions = recorder.take();
        assert_eq!(actions.len(), 1);
        assert!(matches!(
            &actions[0],
            Action::Send { keyboard: Some(k), .. } if *k == messages::confirm_wallet_keyboard(MIXED)
        ));
        assert_eq!(bot.service.wallet("3").await, None);

        bot.handle_update(callback_update(3, &format!("confirm_wallet:{LOWER}")))
            .await;
        let actions = recorder.take();
        assert_eq!(
            actions,
            vec![
                Action::Edit {
                    chat_id: 3,
                    message_id: 11,
                    text: messages::wallet_connected(LOWER),
                    keyboard: None,
                },
                Action::AnswerCallback {
                    callback_id: "cb".to_string(),
                    text: None,
                    alert: false,
                },
            ]
        );
        assert_eq!(bot.service.wallet("3").await.as_deref(), Some(LOWER));
    }

    #[tokio::test]
    async fn test_dismissed_address_is_not_stored() {
        let (bot, recorder) = bot(FakeMarketData::default());

        bot.handle_update(text_update(4, MIXED)).await;
        bot.handle_update(callback_update(4, "dismiss_wallet")).await;

        let texts = sent_texts(&recorder.take());
        assert_eq!(texts.last(), Some(&messages::wallet_dismissed()));
        assert_eq!(bot.service.wallet("4").await, None);
    }

    #[tokio::test]
    async fn test_other_free_text_is_ignored() {
        let (bot, recorder) = bot(FakeMarketData::default());
        bot.handle_update(text_update(5, "hello there")).await;
        bot.handle_update(text_update(5, "/disconnect")).await;
        assert!(recorder.take().is_empty());
    }

    #[tokio::test]
    async fn test_enter_wallet_callback_starts_prompt() {
        let (bot, recorder) = bot(FakeMarketData::default());

        bot.handle_update(callback_update(6, "enter_wallet")).await;
        let actions = recorder.take();
        assert_eq!(
            actions[0],
            Action::Edit {
                chat_id: 6,
                message_id: 11,
                text: messages::enter_wallet_prompt(),
                keyboard: Some(messages::back_keyboard()),
            }
        );
        assert_eq!(
            bot.service.input_state("6").await,
            Some(InputState::AwaitingWallet)
        );
    }

    #[tokio::test]
    async fn test_invalid_confirm_callback_answers_with_alert() {
        let (bot, recorder) = bot(FakeMarketData::default());

        bot.handle_update(callback_update(7, "confirm_wallet:0xnope")).await;
        let actions = recorder.take();
        assert_eq!(
            actions,
            vec![Action::AnswerCallback {
                callback_id: "cb".to_string(),
                text: Some(messages::callback_error()),
                alert: true,
            }]
        );
    }

    #[tokio::test]
    async fn test_positions_without_wallet() {
        let (bot, recorder) = bot(FakeMarketData::default());
        bot.handle_update(text_update(8, "/positions")).await;
        bot.handle_update(text_update(8, "/pnl")).await;
        assert_eq!(
            sent_texts(&recorder.take()),
            vec![messages::no_wallet(), messages::no_wallet()]
        );
    }

    #[tokio::test]
    async fn test_positions_for_connected_wallet() {
        let (bot, recorder) = bot(FakeMarketData {
            positions: Some(vec![
                json!({
                    "conditionId": "0xc1",
                    "title": "Fed cut in March?",
                    "outcome": "Yes",
                    "size": "10",
                    "avgPrice": "0.5",
                    "curPrice": 0.6,
                    "cashPnl": 1
                }),
                json!({"title": "broken"}),
            ]),
            markets: None,
        });
        bot.service.connect("9", Some(MIXED)).await.unwrap();

        bot.handle_update(text_update(9, "/positions")).await;
        let texts = sent_texts(&recorder.take());
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0], messages::fetching_positions());
        assert!(texts[1].contains("1. *Fed cut in March?*"));
        assert!(!texts[1].contains("broken"));
    }

    #[tokio::test]
    async fn test_upstream_failures_render_error_replies() {
        let (bot, recorder) = bot(FakeMarketData::default());
        bot.service.connect("10", Some(MIXED)).await.unwrap();

        bot.handle_update(text_update(10, "/positions")).await;
        bot.handle_update(text_update(10, "/pnl")).await;
        bot.handle_update(text_update(10, "/markets")).await;

        let texts = sent_texts(&recorder.take());
        assert_eq!(
            texts,
            vec![
                messages::fetching_positions(),
                messages::positions_failed(),
                messages::calculating_pnl(),
                messages::pnl_failed(),
                messages::fetching_markets(),
                messages::markets_failed(),
            ]
        );
    }

    #[tokio::test]
    async fn test_markets_are_ranked_and_paged() {
        let markets = (0..15)
            .map(|i| json!({"id": i, "question": format!("Q{i}"), "volume24hr": i * 100}))
            .collect();
        let (bot, recorder) = bot(FakeMarketData {
            positions: None,
            markets: Some(markets),
        });

        bot.handle_update(text_update(11, "/markets")).await;
        let texts = sent_texts(&recorder.take());
        assert!(texts[1].starts_with("🏪 *Active Polymarket Markets:*"));
        assert!(texts[1].contains("1. *Q14*"));
        assert!(texts[1].contains("10. *Q5*"));
        assert!(!texts[1].contains("*Q4*"));
    }

    #[tokio::test]
    async fn test_process_batch_keeps_per_chat_order() {
        let (bot, recorder) = bot(FakeMarketData::default());

        bot.process_batch(vec![
            text_update(20, "/connect"),
            text_update(21, "/status"),
            text_update(20, MIXED),
        ])
        .await;

        assert_eq!(bot.service.wallet("20").await.as_deref(), Some(LOWER));
        assert_eq!(bot.service.wallet("21").await, None);

        let chat_20: Vec<String> = recorder
            .take()
            .into_iter()
            .filter_map(|a| match a {
                Action::Send { chat_id: 20, text, .. } => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(
            chat_20,
            vec![messages::connect_prompt(), messages::wallet_connected(LOWER)]
        );
    }
}
