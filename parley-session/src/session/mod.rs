mod call_manager;
mod call_observer;
mod call_session;
mod call_state;
mod candidate_queue;
mod session_command;
mod session_registry;

pub use call_manager::*;
pub use call_observer::*;
pub use call_session::*;
pub use call_state::*;
pub use candidate_queue::*;
pub use session_command::*;
pub use session_registry::*;
