//! Per-conversation session state
//!
//! [`SessionStore`] is the storage seam: plain get/set/delete of a
//! [`Conversation`] record keyed by conversation id. [`MemorySessionStore`]
//! keeps everything in process memory. [`Sessions`] layers the wallet and
//! input-flow rules on top of any store.
//!
//! Entries are never evicted; every conversation id ever seen keeps its
//! record for the lifetime of the process.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::address::normalize_address;
use crate::error::CoreResult;
use crate::models::{Conversation, InputState, SessionStats};

/// Key-value storage for conversation records.
pub trait SessionStore: Send + Sync {
    fn get(&self, conversation_id: &str) -> impl Future<Output = Option<Conversation>> + Send;

    fn set(
        &self,
        conversation_id: &str,
        conversation: Conversation,
    ) -> impl Future<Output = ()> + Send;

    fn delete(&self, conversation_id: &str) -> impl Future<Output = ()> + Send;

    fn stats(&self) -> impl Future<Output = SessionStats> + Send;
}

/// In-memory session store.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    conversations: Arc<RwLock<HashMap<String, Conversation>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    async fn get(&self, conversation_id: &str) -> Option<Conversation> {
        self.conversations.read().await.get(conversation_id).cloned()
    }

    async fn set(&self, conversation_id: &str, conversation: Conversation) {
        self.conversations
            .write()
            .await
            .insert(conversation_id.to_string(), conversation);
    }

    async fn delete(&self, conversation_id: &str) {
        self.conversations.write().await.remove(conversation_id);
    }

    async fn stats(&self) -> SessionStats {
        let conversations = self.conversations.read().await;
        SessionStats {
            connected_wallets: conversations
                .values()
                .filter(|c| c.wallet_address.is_some())
                .count(),
            pending_prompts: conversations
                .values()
                .filter(|c| c.input_state.is_some())
                .count(),
        }
    }
}

/// Wallet and input-flow operations over a [`SessionStore`].
#[derive(Clone)]
pub struct Sessions<S> {
    store: S,
}

impl<S: SessionStore> Sessions<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Store a wallet for the conversation and end any input flow.
    ///
    /// Invalid addresses are rejected with `InvalidAddress` and leave the
    /// record untouched.
    pub async fn set_wallet(&self, conversation_id: &str, address: &str) -> CoreResult<String> {
        let address = normalize_address(address)?;

        let mut conversation = self.load(conversation_id).await;
        conversation.wallet_address = Some(address.clone());
        conversation.input_state = None;
        self.store.set(conversation_id, conversation).await;

        tracing::info!(conversation_id = %conversation_id, wallet = %address, "Wallet saved");
        Ok(address)
    }

    pub async fn get_wallet(&self, conversation_id: &str) -> Option<String> {
        self.store
            .get(conversation_id)
            .await
            .and_then(|c| c.wallet_address)
    }

    pub async fn set_input_state(&self, conversation_id: &str, state: InputState) {
        let mut conversation = self.load(conversation_id).await;
        conversation.input_state = Some(state);
        self.store.set(conversation_id, conversation).await;
        tracing::debug!(conversation_id = %conversation_id, state = ?state, "Input state set");
    }

    pub async fn get_input_state(&self, conversation_id: &str) -> Option<InputState> {
        self.store
            .get(conversation_id)
            .await
            .and_then(|c| c.input_state)
    }

    pub async fn clear_input_state(&self, conversation_id: &str) {
        let Some(mut conversation) = self.store.get(conversation_id).await else {
            return;
        };
        conversation.input_state = None;

        if conversation.is_empty() {
            self.store.delete(conversation_id).await;
        } else {
            self.store.set(conversation_id, conversation).await;
        }
    }

    pub async fn stats(&self) -> SessionStats {
        self.store.stats().await
    }

    async fn load(&self, conversation_id: &str) -> Conversation {
        self.store.get(conversation_id).await.unwrap_or_default()
    }
}
