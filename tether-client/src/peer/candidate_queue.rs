use tether_core::IceCandidate;

/// Outcome of handing a remote candidate to a [`crate::peer::PeerConnection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateDisposition {
    Applied,
    /// Held until the remote description is set.
    Queued,
}

/// Remote candidates that arrived before the remote description.
#[derive(Debug, Default)]
pub struct CandidateQueue {
    remote_description_set: bool,
    pending: Vec<IceCandidate>,
}

impl CandidateQueue {
    pub fn is_ready(&self) -> bool {
        self.remote_description_set
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Queues `candidate` if it can't be applied yet, otherwise hands it back.
    pub fn offer(&mut self, candidate: IceCandidate) -> Option<IceCandidate> {
        if self.remote_description_set {
            Some(candidate)
        } else {
            self.pending.push(candidate);
            None
        }
    }

    /// Marks the remote description as applied and drains, oldest first.
    pub fn release(&mut self) -> Vec<IceCandidate> {
        self.remote_description_set = true;
        std::mem::take(&mut self.pending)
    }
}
