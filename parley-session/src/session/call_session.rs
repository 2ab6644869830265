use crate::config::SessionConfig;
use crate::error::CallError;
use crate::media::{MediaBinding, MediaEvent};
use crate::session::{
    CallObserver, CallState, CandidateQueue, Role, SessionCommand, SessionRegistry,
};
use crate::signaling::SignalingOutput;
use parley_core::{
    CallId, Envelope, IceCandidate, Identity, SessionDescription, SessionKey, SignalMessage,
};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Collaborators shared by every session of one participant.
#[derive(Clone)]
pub struct SessionContext {
    pub signaling: Arc<dyn SignalingOutput>,
    pub observer: Arc<dyn CallObserver>,
    pub registry: SessionRegistry,
    pub config: SessionConfig,
}

/// Negotiation state of one call, owned by a single task.
///
/// All inputs (remote signals, local UI commands, media events, the negotiation
/// deadline) are funneled through [`CallSession::run`], so transitions for one
/// call never interleave. Media operations keep racing the deadline and the
/// mailbox while they are pending, so a stalled binding can still time out or
/// be hung up.
pub struct CallSession {
    key: SessionKey,
    call_id: CallId,
    role: Role,
    state: CallState,
    local_description: Option<SessionDescription>,
    remote_description: Option<SessionDescription>,
    pending_remote_candidates: CandidateQueue,
    media: Box<dyn MediaBinding>,
    media_released: bool,
    commands: mpsc::Receiver<SessionCommand>,
    /// Commands that arrived during a media operation, handled before the mailbox.
    deferred: VecDeque<SessionCommand>,
    deadline: Instant,
    state_tx: watch::Sender<CallState>,
    ctx: SessionContext,
}

impl CallSession {
    pub fn new(
        key: SessionKey,
        call_id: CallId,
        role: Role,
        media: Box<dyn MediaBinding>,
        commands: mpsc::Receiver<SessionCommand>,
        state_tx: watch::Sender<CallState>,
        ctx: SessionContext,
    ) -> Self {
        Self {
            key,
            call_id,
            role,
            state: CallState::Idle,
            local_description: None,
            remote_description: None,
            pending_remote_candidates: CandidateQueue::new(),
            media,
            media_released: false,
            commands,
            deferred: VecDeque::new(),
            deadline: Instant::now() + ctx.config.negotiation_timeout,
            state_tx,
            ctx,
        }
    }

    pub async fn run(mut self, mut media_rx: mpsc::Receiver<MediaEvent>) {
        info!(
            "Call {} with {} started as {:?}",
            self.call_id, self.key.remote, self.role
        );

        self.deadline = Instant::now() + self.ctx.config.negotiation_timeout;
        let mut media_open = true;

        self.start().await;

        while !self.state.is_terminal() {
            if let Some(cmd) = self.deferred.pop_front() {
                self.handle_command(cmd).await;
                continue;
            }

            tokio::select! {
                cmd = self.commands.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("Command channel closed. Hanging up {}", self.key);
                            self.hangup().await;
                        }
                    }
                }

                evt = media_rx.recv(), if media_open => {
                    match evt {
                        Some(e) => self.handle_media_event(e).await,
                        None => media_open = false,
                    }
                }

                _ = tokio::time::sleep_until(self.deadline), if self.state != CallState::Connected => {
                    self.timed_out().await;
                }
            }
        }

        info!("Call {} with {} finished", self.call_id, self.key.remote);
    }

    async fn start(&mut self) {
        self.transition(CallState::Ringing).await;

        match self.role {
            Role::Caller => {
                let dial = SignalMessage::Dial {
                    caller: self.key.local.clone(),
                    receiver: self.key.remote.clone(),
                };
                self.emit(dial).await;
            }
            Role::Callee => self.ctx.observer.on_incoming_call(&self.key).await,
        }
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Signal(signal) => self.handle_signal(signal).await,
            SessionCommand::Malformed(reason) => {
                self.fail(CallError::MalformedMessage(reason)).await
            }
            SessionCommand::Accept => self.accept().await,
            SessionCommand::Decline => self.decline().await,
            SessionCommand::Hangup => self.hangup().await,
            SessionCommand::TransportLost => self.transport_lost().await,
            SessionCommand::Shutdown => self.hangup().await,
        }
    }

    async fn handle_signal(&mut self, signal: SignalMessage) {
        debug!("{} <- {} in {}", self.key, signal.kind(), self.state);

        match signal {
            SignalMessage::Dial { caller, .. } => {
                if Role::resolve(&self.key.local, &caller) != self.role {
                    // Both of us dialed: each side sees the other's dial and fails.
                    self.fail(CallError::RoleConflict).await;
                } else {
                    debug!("Duplicate dial for {} ignored", self.key);
                }
            }

            SignalMessage::Accepted { .. } => match (self.role, self.state) {
                (Role::Caller, CallState::Ringing) => self.on_remote_accepted().await,
                _ => debug!("Repeated accepted for {} ignored", self.key),
            },

            SignalMessage::Declined { .. } => {
                if self.state == CallState::Ringing {
                    info!("Call {} declined by {}", self.call_id, self.key.remote);
                    self.end().await;
                } else {
                    self.fail(CallError::ProtocolViolation(format!(
                        "declined while {}",
                        self.state
                    )))
                    .await;
                }
            }

            SignalMessage::Offer { offer, .. } => self.on_offer(offer).await,

            SignalMessage::Answer { answer, .. } => self.on_answer(answer).await,

            SignalMessage::Candidate { candidate, .. } => {
                self.on_remote_candidate(candidate).await
            }

            SignalMessage::Hangup { .. } => self.remote_hangup().await,
        }
    }

    async fn handle_media_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::ConnectivityEstablished => {
                if self.state == CallState::Negotiating
                    && self.local_description.is_some()
                    && self.remote_description.is_some()
                {
                    self.transition(CallState::Connected).await;
                } else {
                    debug!("Connectivity report for {} in {} ignored", self.key, self.state);
                }
            }

            MediaEvent::ConnectivityFailed(reason) => {
                self.fail(CallError::Media(reason)).await;
            }

            MediaEvent::CandidateGenerated(candidate) => {
                let (caller, callee) = self.pair();
                self.emit(SignalMessage::Candidate {
                    caller,
                    callee,
                    candidate,
                })
                .await;
            }
        }
    }

    /// Callee picks up.
    async fn accept(&mut self) {
        if self.role != Role::Callee || self.state != CallState::Ringing {
            warn!("Cannot accept {} as {:?} in {}", self.key, self.role, self.state);
            return;
        }

        self.transition(CallState::Accepted).await;
        if !self.acquire_media().await {
            return;
        }

        self.emit(SignalMessage::Accepted {
            caller: self.key.remote.clone(),
            receiver: self.key.local.clone(),
        })
        .await;
    }

    async fn decline(&mut self) {
        if self.role != Role::Callee || self.state != CallState::Ringing {
            warn!("Cannot decline {} as {:?} in {}", self.key, self.role, self.state);
            return;
        }

        self.emit(SignalMessage::Declined {
            caller: self.key.remote.clone(),
            receiver: self.key.local.clone(),
        })
        .await;
        self.end().await;
    }

    async fn hangup(&mut self) {
        let (caller, callee) = self.pair();
        self.emit(SignalMessage::Hangup { caller, callee }).await;
        self.end().await;
    }

    async fn remote_hangup(&mut self) {
        info!("Call {} hung up by {}", self.call_id, self.key.remote);
        self.end().await;
    }

    async fn transport_lost(&mut self) {
        match self.state {
            CallState::Accepted | CallState::Negotiating => {
                self.fail(CallError::TransportLost).await
            }
            _ => {
                info!("Transport to {} lost, ending call {}", self.key.remote, self.call_id);
                self.end().await;
            }
        }
    }

    /// Caller side: the callee confirmed, so it is now worth creating an offer.
    async fn on_remote_accepted(&mut self) {
        self.transition(CallState::Accepted).await;
        if !self.acquire_media().await {
            return;
        }

        // Echoed back to the callee, which ignores repeats.
        self.emit(SignalMessage::Accepted {
            caller: self.key.local.clone(),
            receiver: self.key.remote.clone(),
        })
        .await;

        let deadline = self.active_deadline();
        let outcome = guarded(
            self.media.create_offer(),
            deadline,
            &mut self.commands,
            &mut self.deferred,
        )
        .await;
        let Some(offer) = self.settle(outcome).await else {
            return;
        };
        self.local_description = Some(offer.clone());

        self.emit(SignalMessage::Offer {
            caller: self.key.local.clone(),
            callee: self.key.remote.clone(),
            offer,
        })
        .await;
        self.transition(CallState::Negotiating).await;
    }

    async fn on_offer(&mut self, offer: SessionDescription) {
        if self.role == Role::Caller {
            return self.fail(CallError::RoleConflict).await;
        }
        if self.remote_description.is_some() {
            return self.fail(CallError::DescriptionReapplied).await;
        }
        match self.state {
            CallState::Accepted => self.transition(CallState::Negotiating).await,
            CallState::Negotiating => {}
            other => {
                return self
                    .fail(CallError::ProtocolViolation(format!("offer while {other}")))
                    .await;
            }
        }

        if !self.apply_remote_description(offer.clone()).await {
            return;
        }

        let deadline = self.active_deadline();
        let outcome = guarded(
            self.media.create_answer(&offer),
            deadline,
            &mut self.commands,
            &mut self.deferred,
        )
        .await;
        let Some(answer) = self.settle(outcome).await else {
            return;
        };
        self.local_description = Some(answer.clone());

        self.emit(SignalMessage::Answer {
            caller: self.key.remote.clone(),
            callee: self.key.local.clone(),
            answer,
        })
        .await;
    }

    async fn on_answer(&mut self, answer: SessionDescription) {
        if self.role == Role::Callee {
            return self.fail(CallError::RoleConflict).await;
        }
        if self.remote_description.is_some() {
            return self.fail(CallError::DescriptionReapplied).await;
        }
        if self.state != CallState::Negotiating {
            return self
                .fail(CallError::ProtocolViolation(format!(
                    "answer while {}",
                    self.state
                )))
                .await;
        }

        self.apply_remote_description(answer).await;
    }

    async fn on_remote_candidate(&mut self, candidate: IceCandidate) {
        if self.remote_description.is_none() {
            debug!(
                "Queueing candidate for {} ({} pending)",
                self.key,
                self.pending_remote_candidates.len() + 1
            );
            self.pending_remote_candidates.enqueue(candidate);
            return;
        }
        self.apply_remote_candidate(candidate).await;
    }

    async fn apply_remote_candidate(&mut self, candidate: IceCandidate) {
        if self.remote_description.is_none() {
            error!("Candidate for {} reached the transport too early", self.key);
            return self.fail(CallError::PrematureCandidate).await;
        }
        let deadline = self.active_deadline();
        let outcome = guarded(
            self.media.apply_candidate(&candidate),
            deadline,
            &mut self.commands,
            &mut self.deferred,
        )
        .await;
        match outcome {
            Guarded::Done(Err(e)) => warn!("Failed to add candidate for {}: {:#}", self.key, e),
            other => {
                self.settle(other).await;
            }
        }
    }

    /// Apply the one remote description of this session, then flush queued candidates.
    /// Returns `false` when the session failed on the way.
    async fn apply_remote_description(&mut self, description: SessionDescription) -> bool {
        let deadline = self.active_deadline();
        let outcome = guarded(
            self.media.apply_remote_description(&description),
            deadline,
            &mut self.commands,
            &mut self.deferred,
        )
        .await;
        if self.settle(outcome).await.is_none() {
            return false;
        }
        self.remote_description = Some(description);

        let queued = self.pending_remote_candidates.len();
        let outcome = guarded(
            self.pending_remote_candidates
                .drain_and_apply(self.media.as_mut()),
            deadline,
            &mut self.commands,
            &mut self.deferred,
        )
        .await;
        let Some(applied) = self.settle(outcome.map(anyhow::Ok)).await else {
            return false;
        };
        if queued > 0 {
            info!(
                "Applied {}/{} queued candidates for {}",
                applied, queued, self.key
            );
        }
        true
    }

    async fn acquire_media(&mut self) -> bool {
        let deadline = self.active_deadline();
        let outcome = guarded(
            self.media.acquire_local_media(),
            deadline,
            &mut self.commands,
            &mut self.deferred,
        )
        .await;
        self.settle(outcome).await.is_some()
    }

    /// The negotiation deadline, or `None` once connected.
    fn active_deadline(&self) -> Option<Instant> {
        (self.state != CallState::Connected).then_some(self.deadline)
    }

    /// Unwrap the result of a guarded media operation. On error, timeout or a
    /// cancelling command the session is torn down and `None` is returned.
    async fn settle<T>(&mut self, outcome: Guarded<anyhow::Result<T>>) -> Option<T> {
        match outcome {
            Guarded::Done(Ok(value)) => Some(value),
            Guarded::Done(Err(e)) => {
                self.fail(CallError::media(e)).await;
                None
            }
            Guarded::TimedOut => {
                self.timed_out().await;
                None
            }
            Guarded::Interrupted(cmd) => {
                self.interrupt(cmd).await;
                None
            }
        }
    }

    /// Handle a command that cut a media operation short.
    async fn interrupt(&mut self, cmd: Option<SessionCommand>) {
        debug!("Media operation for {} interrupted by {:?}", self.key, cmd);
        match cmd {
            Some(SessionCommand::TransportLost) => self.transport_lost().await,
            Some(SessionCommand::Malformed(reason)) => {
                self.fail(CallError::MalformedMessage(reason)).await
            }
            Some(SessionCommand::Signal(SignalMessage::Hangup { .. })) => {
                self.remote_hangup().await
            }
            _ => self.hangup().await,
        }
    }

    async fn timed_out(&mut self) {
        self.fail(CallError::NegotiationTimeout(self.ctx.config.negotiation_timeout))
            .await;
    }

    fn pair(&self) -> (Identity, Identity) {
        match self.role {
            Role::Caller => (self.key.local.clone(), self.key.remote.clone()),
            Role::Callee => (self.key.remote.clone(), self.key.local.clone()),
        }
    }

    async fn emit(&self, signal: SignalMessage) {
        debug!("{} -> {} {}", self.key.local, self.key.remote, signal.kind());
        self.ctx
            .signaling
            .send(Envelope {
                to: self.key.remote.clone(),
                from: self.key.local.clone(),
                signal,
            })
            .await;
    }

    async fn transition(&mut self, next: CallState) {
        info!(
            "Call {} ({}): {} -> {}",
            self.call_id, self.key, self.state, next
        );
        self.state = next;
        self.state_tx.send_replace(next);
        if !next.is_terminal() {
            self.ctx.observer.on_state_change(&self.key, next).await;
        }
    }

    async fn end(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.teardown(CallState::Ended).await;
        self.ctx.observer.on_ended(&self.key).await;
    }

    async fn fail(&mut self, reason: CallError) {
        if self.state.is_terminal() {
            return;
        }
        warn!("Call {} ({}) failed: {}", self.call_id, self.key, reason);
        self.teardown(CallState::Failed).await;
        self.ctx.observer.on_failed(&self.key, &reason).await;
    }

    /// Release everything the session owns. The registry entry goes before the
    /// observer hears about it, so a redial from the notification is accepted.
    async fn teardown(&mut self, terminal: CallState) {
        self.pending_remote_candidates.clear();
        if !self.media_released {
            self.media_released = true;
            self.media.release().await;
        }
        self.ctx.registry.remove(&self.key, self.call_id);
        self.transition(terminal).await;
    }
}

/// How a media operation raced against the deadline and the mailbox ended.
enum Guarded<T> {
    Done(T),
    TimedOut,
    /// A cancelling command arrived first; `None` means the mailbox closed.
    Interrupted(Option<SessionCommand>),
}

impl<T> Guarded<T> {
    fn map<U>(self, f: impl FnOnce(T) -> U) -> Guarded<U> {
        match self {
            Self::Done(value) => Guarded::Done(f(value)),
            Self::TimedOut => Guarded::TimedOut,
            Self::Interrupted(cmd) => Guarded::Interrupted(cmd),
        }
    }
}

/// Commands that abort a pending media operation instead of waiting behind it.
fn cancels(cmd: &SessionCommand) -> bool {
    matches!(
        cmd,
        SessionCommand::Hangup
            | SessionCommand::Shutdown
            | SessionCommand::TransportLost
            | SessionCommand::Malformed(_)
            | SessionCommand::Signal(SignalMessage::Hangup { .. })
    )
}

/// Drive `op` until it finishes, the deadline passes or a cancelling command
/// arrives. Other commands are parked in `deferred` in arrival order.
async fn guarded<F: Future>(
    op: F,
    deadline: Option<Instant>,
    commands: &mut mpsc::Receiver<SessionCommand>,
    deferred: &mut VecDeque<SessionCommand>,
) -> Guarded<F::Output> {
    tokio::pin!(op);
    loop {
        tokio::select! {
            out = &mut op => return Guarded::Done(out),
            _ = sleep_until(deadline) => return Guarded::TimedOut,
            cmd = commands.recv() => match cmd {
                Some(cmd) if !cancels(&cmd) => deferred.push_back(cmd),
                other => return Guarded::Interrupted(other),
            },
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
