use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable participant identifier as registered with the relay.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid identity {0:?}: must be non-empty without surrounding whitespace")]
pub struct InvalidIdentity(pub String);

impl Identity {
    pub fn parse(s: impl Into<String>) -> Result<Self, InvalidIdentity> {
        let s = s.into();
        if s.is_empty() || s.trim() != s {
            return Err(InvalidIdentity(s));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Identity {
    type Error = InvalidIdentity;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Identity {
    type Error = InvalidIdentity;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry key of a call: the local participant and the party on the other end.
///
/// Both peers compute their own key from the same message, so `alice`'s key for a
/// call is `(alice, bob)` while `bob` files it under `(bob, alice)`.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct SessionKey {
    pub local: Identity,
    pub remote: Identity,
}

impl SessionKey {
    pub fn new(local: Identity, remote: Identity) -> Self {
        Self { local, remote }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<->{}", self.local, self.remote)
    }
}
