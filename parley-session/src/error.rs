use std::time::Duration;
use thiserror::Error;

/// Why a call could not proceed.
///
/// Doubles as the human readable reason handed to the observer when a session
/// ends up in [`CallState::Failed`](crate::CallState::Failed).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallError {
    #[error("malformed signaling message: {0}")]
    MalformedMessage(String),

    #[error("role conflict: both peers claim the same negotiation role")]
    RoleConflict,

    #[error("connectivity candidate reached the media transport before the remote description")]
    PrematureCandidate,

    #[error("remote session description received twice")]
    DescriptionReapplied,

    #[error("no connectivity within {0:?}")]
    NegotiationTimeout(Duration),

    #[error("signaling transport lost")]
    TransportLost,

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("media error: {0}")]
    Media(String),

    #[error("a call with this peer is already in progress")]
    SessionExists,

    #[error("no call with this peer")]
    NoSession,

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),
}

impl CallError {
    pub(crate) fn media(err: anyhow::Error) -> Self {
        Self::Media(format!("{err:#}"))
    }
}

pub type CallResult<T> = Result<T, CallError>;
