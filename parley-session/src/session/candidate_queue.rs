use crate::media::MediaBinding;
use anyhow::Result;
use async_trait::async_trait;
use parley_core::IceCandidate;
use std::collections::VecDeque;
use tracing::warn;

/// Anything remote candidates can be applied to.
#[async_trait]
pub trait CandidateSink: Send {
    async fn apply(&mut self, candidate: &IceCandidate) -> Result<()>;
}

#[async_trait]
impl<M: MediaBinding + ?Sized> CandidateSink for M {
    async fn apply(&mut self, candidate: &IceCandidate) -> Result<()> {
        self.apply_candidate(candidate).await
    }
}

/// Remote candidates that arrived before the remote description was applied.
///
/// Append-only and strictly FIFO; the only ways out are a drain or dropping the
/// whole queue with its session.
#[derive(Debug, Default)]
pub struct CandidateQueue {
    pending: VecDeque<IceCandidate>,
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, candidate: IceCandidate) {
        self.pending.push_back(candidate);
    }

    /// Apply every buffered candidate in arrival order and leave the queue empty.
    ///
    /// A candidate the sink rejects is logged and discarded; the rest still go
    /// through. Returns how many were applied successfully. Draining an empty
    /// queue is a no-op.
    pub async fn drain_and_apply<S: CandidateSink + ?Sized>(&mut self, sink: &mut S) -> usize {
        let mut applied = 0;
        while let Some(candidate) = self.pending.pop_front() {
            match sink.apply(&candidate).await {
                Ok(()) => applied += 1,
                Err(e) => warn!("Discarding queued candidate {:?}: {:#}", candidate.candidate, e),
            }
        }
        applied
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
