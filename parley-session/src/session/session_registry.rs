use crate::session::{CallState, SessionCommand};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parley_core::{CallId, SessionKey};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// How the rest of the process reaches a running call session.
#[derive(Clone)]
pub struct SessionHandle {
    pub call_id: CallId,
    pub commands: mpsc::Sender<SessionCommand>,
    pub state: watch::Receiver<CallState>,
}

/// Process-wide map of live sessions, keyed by participant pair.
///
/// A session is present from creation until it reaches a terminal state, which is
/// what rejects a second call for a pair that is still in progress.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<SessionKey, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `handle` unless the pair is taken. Hands the handle back on conflict.
    pub fn try_insert(&self, key: SessionKey, handle: SessionHandle) -> Result<(), SessionHandle> {
        match self.sessions.entry(key) {
            Entry::Occupied(_) => Err(handle),
            Entry::Vacant(slot) => {
                slot.insert(handle);
                Ok(())
            }
        }
    }

    pub fn get(&self, key: &SessionKey) -> Option<SessionHandle> {
        self.sessions.get(key).map(|h| h.clone())
    }

    /// Remove the entry for `key` only if it still belongs to generation `call_id`.
    pub fn remove(&self, key: &SessionKey, call_id: CallId) -> bool {
        self.sessions
            .remove_if(key, |_, handle| handle.call_id == call_id)
            .is_some()
    }

    pub fn handles(&self) -> Vec<(SessionKey, SessionHandle)> {
        self.sessions
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
