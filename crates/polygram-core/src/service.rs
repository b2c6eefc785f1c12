//! Process-wide Polygram context
//!
//! Owns the session store and the aggregator and exposes the operations the
//! chat layer needs. Construct one at startup and share it behind an `Arc`.

use crate::aggregator::{Aggregator, MarketData};
use crate::error::{CoreError, CoreResult};
use crate::models::{ConnectOutcome, InputState, Market, PnlSummary, Position, SessionStats};
use crate::session::{SessionStore, Sessions};

pub struct PolygramService<S, M> {
    sessions: Sessions<S>,
    aggregator: Aggregator<M>,
}

impl<S: SessionStore, M: MarketData> PolygramService<S, M> {
    pub fn new(store: S, market_data: M) -> Self {
        Self {
            sessions: Sessions::new(store),
            aggregator: Aggregator::new(market_data),
        }
    }

    pub fn sessions(&self) -> &Sessions<S> {
        &self.sessions
    }

    /// Start or finish the connect flow.
    ///
    /// Without an address the conversation moves to `AwaitingWallet`. With
    /// one, the address is validated and stored; an invalid address leaves
    /// the conversation exactly as it was.
    pub async fn connect(
        &self,
        conversation_id: &str,
        address: Option<&str>,
    ) -> CoreResult<ConnectOutcome> {
        match address {
            None => {
                self.sessions
                    .set_input_state(conversation_id, InputState::AwaitingWallet)
                    .await;
                Ok(ConnectOutcome::AwaitingWallet)
            }
            Some(address) => {
                let address = self.sessions.set_wallet(conversation_id, address).await?;
                Ok(ConnectOutcome::Connected { address })
            }
        }
    }

    /// Drop a pending prompt without connecting anything.
    pub async fn cancel_prompt(&self, conversation_id: &str) {
        self.sessions.clear_input_state(conversation_id).await;
    }

    pub async fn wallet(&self, conversation_id: &str) -> Option<String> {
        self.sessions.get_wallet(conversation_id).await
    }

    pub async fn input_state(&self, conversation_id: &str) -> Option<InputState> {
        self.sessions.get_input_state(conversation_id).await
    }

    pub async fn positions(&self, conversation_id: &str) -> CoreResult<Vec<Position>> {
        let wallet = self.require_wallet(conversation_id).await?;
        self.aggregator.list_positions(&wallet).await
    }

    pub async fn pnl(&self, conversation_id: &str) -> CoreResult<PnlSummary> {
        let wallet = self.require_wallet(conversation_id).await?;
        self.aggregator.compute_pnl(&wallet).await
    }

    pub async fn markets(&self, page_size: usize) -> CoreResult<Vec<Market>> {
        self.aggregator.list_active_markets(page_size).await
    }

    pub async fn stats(&self) -> SessionStats {
        self.sessions.stats().await
    }

    async fn require_wallet(&self, conversation_id: &str) -> CoreResult<String> {
        self.sessions
            .get_wallet(conversation_id)
            .await
            .ok_or_else(|| CoreError::WalletNotConnected(conversation_id.to_string()))
    }
}
