use crate::error::CallError;
use crate::session::CallState;
use async_trait::async_trait;
use parley_core::SessionKey;

/// The UI side of a call: decision points and state notifications.
///
/// Each session reports exactly one terminal notification, either `on_ended` or
/// `on_failed`.
#[async_trait]
pub trait CallObserver: Send + Sync + 'static {
    /// A remote peer is ringing us; answer through `CallManager::accept`/`decline`.
    async fn on_incoming_call(&self, key: &SessionKey);

    /// Non-terminal transitions.
    async fn on_state_change(&self, key: &SessionKey, state: CallState);

    async fn on_ended(&self, key: &SessionKey);

    async fn on_failed(&self, key: &SessionKey, reason: &CallError);
}
