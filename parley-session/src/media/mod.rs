mod media_binding;
mod media_config;
mod media_event;
mod webrtc_binding;

pub use media_binding::*;
pub use media_config::*;
pub use media_event::*;
pub use webrtc_binding::*;
