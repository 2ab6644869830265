use crate::config::SessionConfig;
use crate::error::{CallError, CallResult};
use crate::media::MediaFactory;
use crate::session::{
    CallObserver, CallSession, CallState, Role, SessionCommand, SessionContext, SessionHandle,
    SessionRegistry,
};
use crate::signaling::{Inbound, MessageValidator, SignalingOutput};
use parley_core::{CallId, Identity, SessionKey, SignalMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Capacity of the per-session media event channel.
const MEDIA_EVENT_CAPACITY: usize = 64;

/// Entry point for one participant: owns the session registry, spawns a
/// [`CallSession`] task per call and routes inbound relay frames to it.
#[derive(Clone)]
pub struct CallManager {
    local: Identity,
    validator: MessageValidator,
    media_factory: Arc<MediaFactory>,
    ctx: SessionContext,
}

impl CallManager {
    pub fn new(
        local: Identity,
        signaling: Arc<dyn SignalingOutput>,
        observer: Arc<dyn CallObserver>,
        media_factory: Arc<MediaFactory>,
        config: SessionConfig,
    ) -> Self {
        Self {
            validator: MessageValidator::new(local.clone()),
            local,
            media_factory,
            ctx: SessionContext {
                signaling,
                observer,
                registry: SessionRegistry::new(),
                config,
            },
        }
    }

    pub fn local(&self) -> &Identity {
        &self.local
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.ctx.registry
    }

    /// Start an outgoing call to `remote`.
    pub fn dial(&self, remote: &Identity) -> CallResult<CallId> {
        if remote == &self.local {
            return Err(CallError::InvalidIdentity(format!(
                "cannot call yourself ({remote})"
            )));
        }

        let key = self.key_for(remote);
        let handle = self.spawn_session(key, Role::Caller)?;
        Ok(handle.call_id)
    }

    pub async fn accept(&self, remote: &Identity) -> CallResult<()> {
        self.command(remote, SessionCommand::Accept).await
    }

    pub async fn decline(&self, remote: &Identity) -> CallResult<()> {
        self.command(remote, SessionCommand::Decline).await
    }

    pub async fn hangup(&self, remote: &Identity) -> CallResult<()> {
        self.command(remote, SessionCommand::Hangup).await
    }

    /// Validate one raw relay frame and hand it to the session it belongs to.
    ///
    /// Never waits on a session, so one busy call cannot hold up the others.
    pub async fn dispatch(&self, raw: &str) {
        match self.validator.validate(raw) {
            Inbound::Signal { from, signal } => self.route(from, signal),
            Inbound::PeerLeft(identity) => self.peer_left(&identity).await,
            Inbound::Ignored(why) => debug!("Ignoring relay frame: {}", why),
            Inbound::Malformed {
                from: Some(from),
                reason,
            } => {
                warn!("Malformed frame from {}: {}", from, reason);
                let key = self.key_for(&from);
                self.deliver(&key, SessionCommand::Malformed(reason));
            }
            Inbound::Malformed { from: None, reason } => {
                warn!("Dropping unreadable relay frame: {}", reason);
            }
        }
    }

    /// The relay reports `identity` disconnected.
    pub async fn peer_left(&self, identity: &Identity) {
        info!("Peer {} left the relay", identity);
        let key = self.key_for(identity);
        self.deliver(&key, SessionCommand::TransportLost);
    }

    /// Our own relay link dropped: every call loses its signaling path.
    pub async fn relay_lost(&self) {
        warn!("Relay link lost, notifying {} calls", self.ctx.registry.len());
        self.broadcast(|| SessionCommand::TransportLost);
    }

    /// Hang up every live call.
    pub async fn shutdown(&self) {
        info!("Shutting down {} calls", self.ctx.registry.len());
        self.broadcast(|| SessionCommand::Shutdown);
    }

    /// Pump the inbound relay stream until it ends, then treat the link as lost.
    pub async fn run_inbound(&self, mut inbound: mpsc::UnboundedReceiver<String>) {
        while let Some(text) = inbound.recv().await {
            self.dispatch(&text).await;
        }
        self.relay_lost().await;
    }

    /// Current state of the call with `remote`, `None` once it is over.
    pub fn state_of(&self, remote: &Identity) -> Option<CallState> {
        self.ctx
            .registry
            .get(&self.key_for(remote))
            .map(|h| *h.state.borrow())
    }

    pub fn active_calls(&self) -> Vec<(Identity, CallState)> {
        self.ctx
            .registry
            .handles()
            .into_iter()
            .map(|(key, handle)| (key.remote, *handle.state.borrow()))
            .collect()
    }

    /// Wait until the live call with `remote` reaches `state`. Returns `false` on
    /// timeout, when there is no such call, or when the call finished elsewhere.
    pub async fn wait_for_state(
        &self,
        remote: &Identity,
        state: CallState,
        timeout: Duration,
    ) -> bool {
        let Some(handle) = self.ctx.registry.get(&self.key_for(remote)) else {
            return false;
        };
        let mut rx = handle.state;
        matches!(
            tokio::time::timeout(timeout, rx.wait_for(|s| *s == state)).await,
            Ok(Ok(_))
        )
    }

    fn route(&self, from: Identity, signal: SignalMessage) {
        let key = self.key_for(&from);
        if let Some(handle) = self.ctx.registry.get(&key) {
            Self::send(&key, &handle, SessionCommand::Signal(signal));
            return;
        }

        match signal {
            SignalMessage::Dial { .. } => {
                info!("Incoming call from {}", from);
                match self.spawn_session(key.clone(), Role::Callee) {
                    Ok(_) => {}
                    // Lost a race against a local dial: let that session sort it out.
                    Err(_) => self.deliver(&key, SessionCommand::Signal(signal)),
                }
            }
            other => debug!("No call with {}, dropping {}", from, other.kind()),
        }
    }

    fn spawn_session(&self, key: SessionKey, role: Role) -> CallResult<SessionHandle> {
        let (command_tx, command_rx) = mpsc::channel(self.ctx.config.mailbox_capacity);
        let (media_tx, media_rx) = mpsc::channel(MEDIA_EVENT_CAPACITY);
        let (state_tx, state_rx) = watch::channel(CallState::Idle);

        let handle = SessionHandle {
            call_id: CallId::new(),
            commands: command_tx,
            state: state_rx,
        };
        if self
            .ctx
            .registry
            .try_insert(key.clone(), handle.clone())
            .is_err()
        {
            warn!("Call with {} already in progress", key.remote);
            return Err(CallError::SessionExists);
        }

        info!("Creating call {} for {} as {:?}", handle.call_id, key, role);
        let media = (self.media_factory)(&key, media_tx);
        let session = CallSession::new(
            key,
            handle.call_id,
            role,
            media,
            command_rx,
            state_tx,
            self.ctx.clone(),
        );
        tokio::spawn(session.run(media_rx));

        Ok(handle)
    }

    async fn command(&self, remote: &Identity, cmd: SessionCommand) -> CallResult<()> {
        let handle = self
            .ctx
            .registry
            .get(&self.key_for(remote))
            .ok_or(CallError::NoSession)?;
        handle
            .commands
            .send(cmd)
            .await
            .map_err(|_| CallError::NoSession)
    }

    fn deliver(&self, key: &SessionKey, cmd: SessionCommand) {
        match self.ctx.registry.get(key) {
            Some(handle) => Self::send(key, &handle, cmd),
            None => debug!("No call for {}, dropping {:?}", key, cmd),
        }
    }

    fn broadcast(&self, make: impl Fn() -> SessionCommand) {
        for (key, handle) in self.ctx.registry.handles() {
            Self::send(&key, &handle, make());
        }
    }

    /// Enqueue without waiting on the session. A full mailbox gets a helper task
    /// so the inbound pump keeps serving every other call.
    fn send(key: &SessionKey, handle: &SessionHandle, cmd: SessionCommand) {
        match handle.commands.try_send(cmd) {
            Ok(()) => {}
            Err(TrySendError::Full(cmd)) => {
                warn!("Mailbox of call {} for {} is full", handle.call_id, key);
                let commands = handle.commands.clone();
                tokio::spawn(async move {
                    let _ = commands.send(cmd).await;
                });
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Call {} for {} already finished", handle.call_id, key);
            }
        }
    }

    fn key_for(&self, remote: &Identity) -> SessionKey {
        SessionKey::new(self.local.clone(), remote.clone())
    }
}
