use parley_core::Identity;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallState {
    Idle,
    Ringing,
    Accepted,
    Negotiating,
    Connected,
    Ended,
    Failed,
}

impl CallState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended | Self::Failed)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Which side originates the offer. Fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Caller,
    Callee,
}

impl Role {
    /// Derive our role from the `dial` that opened the call: whoever dialed is the
    /// caller. Depends only on message content, so both peers agree without talking.
    pub fn resolve(local: &Identity, dial_caller: &Identity) -> Self {
        if local == dial_caller {
            Self::Caller
        } else {
            Self::Callee
        }
    }
}
