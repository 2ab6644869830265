use parley_core::IceCandidate;

/// Events the media transport raises for the owning call session.
#[derive(Debug, Clone)]
pub enum MediaEvent {
    /// Connectivity checks succeeded; media can flow.
    ConnectivityEstablished,

    /// The transport gave up (ICE failure, DTLS failure, remote closed).
    ConnectivityFailed(String),

    /// A local candidate was gathered and has to be trickled to the remote peer.
    CandidateGenerated(IceCandidate),
}
