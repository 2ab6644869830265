mod call;
mod candidate;
mod description;
mod identity;
mod signaling;

pub use call::CallId;
pub use candidate::IceCandidate;
pub use description::{SdpKind, SessionDescription};
pub use identity::{Identity, InvalidIdentity, SessionKey};
pub use signaling::{Envelope, IceServerConfig, RelayFrame, SignalKind, SignalMessage};
