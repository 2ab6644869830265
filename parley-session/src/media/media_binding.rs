use crate::media::MediaEvent;
use anyhow::Result;
use async_trait::async_trait;
use parley_core::{IceCandidate, SessionDescription, SessionKey};
use tokio::sync::mpsc;

/// Local capture, remote rendering and the underlying media transport of one call.
///
/// The call session drives it but never looks inside. Implementations report
/// asynchronous happenings (gathered candidates, connectivity) through the
/// [`MediaEvent`] sender handed to the factory.
#[async_trait]
pub trait MediaBinding: Send + Sync + 'static {
    /// Acquire capture devices and attach their tracks to the transport.
    async fn acquire_local_media(&mut self) -> Result<()>;

    /// Create an offer and install it as the local description.
    async fn create_offer(&mut self) -> Result<SessionDescription>;

    /// Create an answer to `remote` and install it as the local description.
    async fn create_answer(&mut self, remote: &SessionDescription) -> Result<SessionDescription>;

    async fn apply_remote_description(&mut self, description: &SessionDescription) -> Result<()>;

    async fn apply_candidate(&mut self, candidate: &IceCandidate) -> Result<()>;

    /// Stop capture and close the transport. Must tolerate repeated calls.
    async fn release(&mut self);
}

/// Builds the media binding of a freshly created session. Construction must be cheap:
/// nothing is acquired until [`MediaBinding::acquire_local_media`].
pub type MediaFactory =
    dyn Fn(&SessionKey, mpsc::Sender<MediaEvent>) -> Box<dyn MediaBinding> + Send + Sync;
