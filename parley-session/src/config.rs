use crate::media::MediaConfig;
use std::time::Duration;

pub const DEFAULT_NEGOTIATION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Measured from entering `Ringing`; a call not `Connected` by then fails.
    pub negotiation_timeout: Duration,
    /// Capacity of each session's command mailbox.
    pub mailbox_capacity: usize,
    pub media: MediaConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            negotiation_timeout: DEFAULT_NEGOTIATION_TIMEOUT,
            mailbox_capacity: 100,
            media: MediaConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn with_negotiation_timeout(mut self, timeout: Duration) -> Self {
        self.negotiation_timeout = timeout;
        self
    }

    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    pub fn with_media(mut self, media: MediaConfig) -> Self {
        self.media = media;
        self
    }
}
