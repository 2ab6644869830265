pub use parley_core::model::{Identity, SessionKey};

pub mod model {
    pub use parley_core::model::*;
}

pub mod session {
    pub use parley_session::*;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use parley_relay::*;
}
