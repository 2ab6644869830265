use async_trait::async_trait;
use parley_core::Envelope;

/// Outbound half of the signaling transport adapter.
///
/// Sending is fire-and-forget: the relay gives no delivery confirmation and a lost
/// message only shows up as a negotiation timeout. Implementations must be safe to
/// share between all sessions of the process.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    async fn send(&self, envelope: Envelope);
}
