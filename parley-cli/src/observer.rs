use async_trait::async_trait;
use colored::*;
use parley::session::{CallError, CallObserver, CallState};
use parley::{Identity, SessionKey};
use tokio::sync::mpsc;

/// What the prompt loop has to react to.
#[derive(Debug)]
pub enum UiEvent {
    Incoming(Identity),
    Finished(Identity),
}

/// Prints call progress and hands decisions to the prompt loop.
pub struct CliObserver {
    events: mpsc::UnboundedSender<UiEvent>,
}

impl CliObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Self { events }, rx)
    }
}

#[async_trait]
impl CallObserver for CliObserver {
    async fn on_incoming_call(&self, key: &SessionKey) {
        println!("{} {}", "📞 Incoming call from".yellow().bold(), key.remote);
        let _ = self.events.send(UiEvent::Incoming(key.remote.clone()));
    }

    async fn on_state_change(&self, key: &SessionKey, state: CallState) {
        let label = match state {
            CallState::Connected => state.to_string().green().bold(),
            CallState::Ringing => state.to_string().yellow(),
            _ => state.to_string().cyan(),
        };
        println!("   {} {}", key.remote, label);
    }

    async fn on_ended(&self, key: &SessionKey) {
        println!("{} {}", "👋 Call ended with".bold(), key.remote);
        let _ = self.events.send(UiEvent::Finished(key.remote.clone()));
    }

    async fn on_failed(&self, key: &SessionKey, reason: &CallError) {
        println!(
            "{} {}: {}",
            "❌ Call failed with".red().bold(),
            key.remote,
            reason
        );
        let _ = self.events.send(UiEvent::Finished(key.remote.clone()));
    }
}
