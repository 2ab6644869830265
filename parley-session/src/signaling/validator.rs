use parley_core::{Identity, SdpKind, SessionDescription, SignalKind, SignalMessage};
use serde_json::Value;

/// Verdict on one inbound relay frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Well-formed signal from `from`, addressed to us and naming us in its pair.
    Signal { from: Identity, signal: SignalMessage },

    /// The relay reports that `identity` dropped its link.
    PeerLeft(Identity),

    /// Not for us, or carries nothing to act on.
    Ignored(&'static str),

    /// Shape check failed. `from` is known when the envelope header was readable,
    /// which is what lets the caller fail the referenced session.
    Malformed {
        from: Option<Identity>,
        reason: String,
    },
}

impl Inbound {
    fn malformed(from: Option<&Identity>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            from: from.cloned(),
            reason: reason.into(),
        }
    }
}

/// Contract checks applied to every frame before it reaches a call session.
#[derive(Debug, Clone)]
pub struct MessageValidator {
    local: Identity,
}

impl MessageValidator {
    pub fn new(local: Identity) -> Self {
        Self { local }
    }

    pub fn local(&self) -> &Identity {
        &self.local
    }

    pub fn validate(&self, text: &str) -> Inbound {
        let frame: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => return Inbound::malformed(None, format!("not JSON: {e}")),
        };

        match frame.get("op").and_then(Value::as_str) {
            Some("signal") => self.validate_envelope(frame.get("d")),
            Some("peer_left") => match identity_field(frame.get("d"), "identity") {
                Ok(identity) => Inbound::PeerLeft(identity),
                Err(reason) => Inbound::malformed(None, reason),
            },
            Some(op) => Inbound::malformed(None, format!("unknown frame op '{op}'")),
            None => Inbound::malformed(None, "frame without 'op'"),
        }
    }

    fn validate_envelope(&self, envelope: Option<&Value>) -> Inbound {
        let to = match identity_field(envelope, "to") {
            Ok(to) => to,
            Err(reason) => return Inbound::malformed(None, reason),
        };
        if to != self.local {
            return Inbound::Ignored("addressed to another identity");
        }

        let from = match identity_field(envelope, "from") {
            Ok(from) => from,
            Err(reason) => return Inbound::malformed(None, reason),
        };

        let Some(raw) = envelope.and_then(|e| e.get("signal")) else {
            return Inbound::malformed(Some(&from), "envelope without 'signal'");
        };
        let op = raw.get("op").and_then(Value::as_str).unwrap_or_default();
        if SignalKind::parse(op).is_none() {
            return Inbound::malformed(Some(&from), format!("unknown signal kind '{op}'"));
        }

        let signal: SignalMessage = match serde_json::from_value(raw.clone()) {
            Ok(s) => s,
            Err(e) => return Inbound::malformed(Some(&from), format!("{op}: {e}")),
        };

        if let Err(reason) = self.check_shape(&from, &signal) {
            return Inbound::malformed(Some(&from), format!("{op}: {reason}"));
        }

        if let SignalMessage::Candidate { candidate, .. } = &signal
            && candidate.candidate.trim().is_empty()
        {
            return Inbound::Ignored("end-of-candidates marker");
        }

        Inbound::Signal { from, signal }
    }

    fn check_shape(&self, from: &Identity, signal: &SignalMessage) -> Result<(), String> {
        let (caller, callee) = signal.pair();
        if caller == callee {
            return Err(format!("caller and callee are both '{caller}'"));
        }
        match signal.remote_for(&self.local) {
            None => return Err(format!("pair {caller}/{callee} does not include us")),
            Some(remote) if remote != from => {
                return Err(format!("sent by '{from}' on behalf of '{remote}'"));
            }
            Some(_) => {}
        }

        match signal {
            SignalMessage::Dial { caller, .. } if caller != from => {
                Err("dial not sent by its caller".to_owned())
            }
            SignalMessage::Offer { offer, .. } => check_description(offer, SdpKind::Offer),
            SignalMessage::Answer { answer, .. } => check_description(answer, SdpKind::Answer),
            _ => Ok(()),
        }
    }
}

fn check_description(description: &SessionDescription, expected: SdpKind) -> Result<(), String> {
    if description.kind != expected {
        return Err(format!(
            "description of type {:?} where {:?} was expected",
            description.kind, expected
        ));
    }
    if description.sdp.trim().is_empty() {
        return Err("empty sdp".to_owned());
    }
    Ok(())
}

fn identity_field(parent: Option<&Value>, field: &str) -> Result<Identity, String> {
    let raw = parent
        .and_then(|p| p.get(field))
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing '{field}'"))?;
    Identity::parse(raw).map_err(|e| e.to_string())
}
