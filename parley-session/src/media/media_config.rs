use parley_core::IceServerConfig;

/// What the WebRTC media binding attaches and which ICE servers it uses.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub ice_servers: Vec<IceServerConfig>,
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig::stun("stun:stun.l.google.com:19302")],
            audio: true,
            video: true,
        }
    }
}
