use axum::extract::ws::Message;
use dashmap::DashMap;
use parley_core::{Identity, RelayFrame};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Distinguishes successive links registered under the same identity.
pub type LinkId = u64;

struct Link {
    id: LinkId,
    tx: mpsc::UnboundedSender<Message>,
}

struct RelayInner {
    links: DashMap<Identity, Link>,
    next_link: AtomicU64,
}

/// Identity-addressed message relay.
///
/// Keeps one outbound queue per connected identity and forwards signal frames by
/// their `to` field without looking at the payload.
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl Default for RelayService {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RelayInner {
                links: DashMap::new(),
                next_link: AtomicU64::new(1),
            }),
        }
    }

    /// Register `identity`, replacing any previous link it had.
    pub fn register(&self, identity: Identity, tx: mpsc::UnboundedSender<Message>) -> LinkId {
        let id = self.inner.next_link.fetch_add(1, Ordering::Relaxed);
        if self.inner.links.insert(identity.clone(), Link { id, tx }).is_some() {
            info!("{} re-registered, replacing its previous link", identity);
        } else {
            info!("{} connected", identity);
        }
        id
    }

    /// Drop `identity` if it is still served by link `id`. Returns whether it was removed.
    pub fn unregister(&self, identity: &Identity, id: LinkId) -> bool {
        self.inner
            .links
            .remove_if(identity, |_, link| link.id == id)
            .is_some()
    }

    pub fn is_online(&self, identity: &Identity) -> bool {
        self.inner.links.contains_key(identity)
    }

    /// Connected identities, sorted.
    pub fn online(&self) -> Vec<Identity> {
        let mut online: Vec<Identity> = self
            .inner
            .links
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        online.sort();
        online
    }

    /// Route one text frame received from `from`.
    pub fn forward(&self, from: &Identity, text: &str) {
        let mut envelope = match RelayFrame::decode(text) {
            Ok(RelayFrame::Signal(envelope)) => envelope,
            Ok(RelayFrame::PeerLeft { .. }) => {
                warn!("{} sent a relay-only frame, dropping it", from);
                return;
            }
            Err(e) => {
                warn!("Invalid frame from {}: {}", from, e);
                return;
            }
        };

        // Never trust the sender's own claim.
        envelope.from = from.clone();
        let to = envelope.to.clone();
        let kind = envelope.signal.kind();

        match RelayFrame::Signal(envelope).encode() {
            Ok(json) => {
                if self.send_to(&to, json) {
                    debug!("{}: {} -> {}", kind, from, to);
                } else {
                    warn!("{} not connected, dropping {} from {}", to, kind, from);
                }
            }
            Err(e) => error!("Failed to serialize {} from {}: {}", kind, from, e),
        }
    }

    /// Tell every remaining identity that `identity` is gone.
    pub fn broadcast_peer_left(&self, identity: &Identity) {
        let frame = RelayFrame::PeerLeft {
            identity: identity.clone(),
        };
        let json = match frame.encode() {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize peer_left for {}: {}", identity, e);
                return;
            }
        };

        for link in self.inner.links.iter() {
            if link.key() != identity {
                let _ = link.tx.send(Message::Text(json.clone().into()));
            }
        }
    }

    fn send_to(&self, to: &Identity, json: String) -> bool {
        match self.inner.links.get(to) {
            Some(link) => link.tx.send(Message::Text(json.into())).is_ok(),
            None => false,
        }
    }
}
