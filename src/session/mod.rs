mod state;
mod store;

pub use state::{RetrySession, SessionPhase};
pub use store::InMemorySessionStore;
