//! Messaging seam.
//!
//! The engine never awaits a reply through this trait: prompts are
//! fire-and-forget, and the user's next action arrives later as a fresh call
//! into the engine's public surface.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::UserChoice;

/// Delivers prompts and choice menus to a user.
#[async_trait]
pub trait MessagingTransport: Send + Sync {
    /// Present `message` to `user_id`, offering `choices` (empty for plain
    /// notifications).
    async fn present_prompt(
        &self,
        user_id: &str,
        message: &str,
        choices: &[UserChoice],
    ) -> Result<()>;
}

/// Terminal transport used by the CLI: prints the message and a numbered
/// choice menu to stdout.
#[derive(Debug, Default, Clone)]
pub struct ConsoleTransport;

impl ConsoleTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MessagingTransport for ConsoleTransport {
    async fn present_prompt(
        &self,
        _user_id: &str,
        message: &str,
        choices: &[UserChoice],
    ) -> Result<()> {
        println!("\n{message}");
        for (i, choice) in choices.iter().enumerate() {
            println!("  {}. {}", i + 1, choice.label());
        }
        Ok(())
    }
}
