use anyhow::Result;
use async_trait::async_trait;
use parley_core::{IceCandidate, SessionDescription, SessionKey};
use parley_session::{CallError, CallObserver, CallState, MediaBinding, MediaEvent, MediaFactory};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Media binding with no devices: produces placeholder descriptions and reports
/// connectivity as soon as both descriptions are in place.
pub struct NullMedia {
    events: mpsc::Sender<MediaEvent>,
    has_local: bool,
    has_remote: bool,
}

impl NullMedia {
    pub fn factory() -> Arc<MediaFactory> {
        Arc::new(|_key: &SessionKey, events: mpsc::Sender<MediaEvent>| {
            Box::new(NullMedia {
                events,
                has_local: false,
                has_remote: false,
            }) as Box<dyn MediaBinding>
        })
    }

    fn maybe_connect(&self) {
        if self.has_local && self.has_remote {
            let _ = self.events.try_send(MediaEvent::ConnectivityEstablished);
        }
    }
}

#[async_trait]
impl MediaBinding for NullMedia {
    async fn acquire_local_media(&mut self) -> Result<()> {
        Ok(())
    }

    async fn create_offer(&mut self) -> Result<SessionDescription> {
        self.has_local = true;
        let _ = self
            .events
            .try_send(MediaEvent::CandidateGenerated(IceCandidate::new(
                "candidate:1 1 udp 2122260223 127.0.0.1 50000 typ host",
            )));
        self.maybe_connect();
        Ok(SessionDescription::offer("v=0"))
    }

    async fn create_answer(&mut self, _remote: &SessionDescription) -> Result<SessionDescription> {
        self.has_local = true;
        self.maybe_connect();
        Ok(SessionDescription::answer("v=0"))
    }

    async fn apply_remote_description(&mut self, _description: &SessionDescription) -> Result<()> {
        self.has_remote = true;
        self.maybe_connect();
        Ok(())
    }

    async fn apply_candidate(&mut self, _candidate: &IceCandidate) -> Result<()> {
        Ok(())
    }

    async fn release(&mut self) {}
}

/// Observer that only logs.
pub struct LogObserver;

#[async_trait]
impl CallObserver for LogObserver {
    async fn on_incoming_call(&self, key: &SessionKey) {
        tracing::info!("[LogObserver] incoming {}", key);
    }

    async fn on_state_change(&self, key: &SessionKey, state: CallState) {
        tracing::info!("[LogObserver] {} now {}", key, state);
    }

    async fn on_ended(&self, key: &SessionKey) {
        tracing::info!("[LogObserver] {} ended", key);
    }

    async fn on_failed(&self, key: &SessionKey, reason: &CallError) {
        tracing::info!("[LogObserver] {} failed: {}", key, reason);
    }
}
