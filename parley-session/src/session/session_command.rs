use parley_core::SignalMessage;

/// Inputs to a call session's mailbox, from the dispatcher or the local UI.
#[derive(Debug)]
pub enum SessionCommand {
    /// Validated signal from the remote peer.
    Signal(SignalMessage),

    /// A frame from the remote peer failed the contract checks.
    Malformed(String),

    /// Local user picked up.
    Accept,

    /// Local user rejected the incoming call.
    Decline,

    /// Local user hung up.
    Hangup,

    /// The relay reported the remote peer gone, or our own relay link dropped.
    TransportLost,

    /// The process is going away.
    Shutdown,
}
