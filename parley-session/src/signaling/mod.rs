mod relay_client;
mod signaling_output;
mod validator;

pub use relay_client::*;
pub use signaling_output::*;
pub use validator::*;
