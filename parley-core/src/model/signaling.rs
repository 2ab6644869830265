use crate::model::candidate::IceCandidate;
use crate::model::description::SessionDescription;
use crate::model::identity::Identity;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// Peer-to-peer signaling messages carried opaquely by the relay.
///
/// `caller` always names whoever sent the original `dial` and `receiver`/`callee` the
/// party that was dialed, no matter which side emits the message. Both peers can
/// therefore locate the same call from any message without extra negotiation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "d", rename_all = "snake_case")]
pub enum SignalMessage {
    Dial {
        caller: Identity,
        receiver: Identity,
    },
    Accepted {
        caller: Identity,
        receiver: Identity,
    },
    Declined {
        caller: Identity,
        receiver: Identity,
    },
    Offer {
        caller: Identity,
        callee: Identity,
        offer: SessionDescription,
    },
    Answer {
        caller: Identity,
        callee: Identity,
        answer: SessionDescription,
    },
    Candidate {
        caller: Identity,
        callee: Identity,
        candidate: IceCandidate,
    },
    Hangup {
        caller: Identity,
        callee: Identity,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Dial,
    Accepted,
    Declined,
    Offer,
    Answer,
    Candidate,
    Hangup,
}

impl SignalKind {
    pub fn parse(op: &str) -> Option<Self> {
        Some(match op {
            "dial" => Self::Dial,
            "accepted" => Self::Accepted,
            "declined" => Self::Declined,
            "offer" => Self::Offer,
            "answer" => Self::Answer,
            "candidate" => Self::Candidate,
            "hangup" => Self::Hangup,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dial => "dial",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::Candidate => "candidate",
            Self::Hangup => "hangup",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SignalMessage {
    pub fn kind(&self) -> SignalKind {
        match self {
            Self::Dial { .. } => SignalKind::Dial,
            Self::Accepted { .. } => SignalKind::Accepted,
            Self::Declined { .. } => SignalKind::Declined,
            Self::Offer { .. } => SignalKind::Offer,
            Self::Answer { .. } => SignalKind::Answer,
            Self::Candidate { .. } => SignalKind::Candidate,
            Self::Hangup { .. } => SignalKind::Hangup,
        }
    }

    /// `(caller, callee)` of the call this message belongs to.
    pub fn pair(&self) -> (&Identity, &Identity) {
        match self {
            Self::Dial { caller, receiver }
            | Self::Accepted { caller, receiver }
            | Self::Declined { caller, receiver } => (caller, receiver),
            Self::Offer { caller, callee, .. }
            | Self::Answer { caller, callee, .. }
            | Self::Candidate { caller, callee, .. }
            | Self::Hangup { caller, callee } => (caller, callee),
        }
    }

    /// The other party of the call from `local`'s point of view, if `local` takes part at all.
    pub fn remote_for(&self, local: &Identity) -> Option<&Identity> {
        let (caller, callee) = self.pair();
        if caller == local {
            Some(callee)
        } else if callee == local {
            Some(caller)
        } else {
            None
        }
    }
}

/// A signal plus its routing header. The relay only ever looks at `to` and stamps `from`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    pub to: Identity,
    pub from: Identity,
    pub signal: SignalMessage,
}

/// Top-level JSON text frame exchanged between a participant and the relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "d", rename_all = "snake_case")]
pub enum RelayFrame {
    Signal(Envelope),
    /// Relay-originated: the named identity lost its link to the relay.
    PeerLeft { identity: Identity },
}

impl RelayFrame {
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn decode(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
