pub mod command_router;
pub mod poll_agent;
pub mod state_cache;

pub use command_router::{Command, CommandRouter};
pub use poll_agent::{PollAgent, PollTimer};
pub use state_cache::{SharedCache, StateCache};
