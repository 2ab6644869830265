pub mod config;
pub mod error;
pub mod media;
pub mod session;
pub mod signaling;

pub use config::*;
pub use error::*;
pub use media::*;
pub use session::*;
pub use signaling::*;

pub use parley_core;
