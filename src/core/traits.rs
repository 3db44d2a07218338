//! DI "Interfaces"

use crate::error::PlatformError;
use crate::infrastructure::entities;
use async_trait::async_trait;

/// Text generation for a character.
#[async_trait]
pub trait Assistant: Send + Sync {
    /// Generates the character's answer to `new_message`, given the earlier `history`.
    ///
    /// Returns `Upstream`/`UpstreamTimeout` when the provider fails. Never retries.
    async fn generate_reply(
        &self,
        character: &entities::Character,
        history: &[entities::Message],
        new_message: &str,
    ) -> Result<String, PlatformError>;
}

/// Outcome of one chat turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub conversation_id: String,
    pub reply: String,
}

#[async_trait]
pub trait PlatformService: Send + Sync {
    /// Runs one chat turn: loads or starts the conversation, records the user message,
    /// asks the assistant for a reply, records it and persists the conversation.
    ///
    /// Returns `NotFound` for an unknown character, or for a conversation that does not
    /// exist or belongs to another user/character pairing.
    async fn send_message(
        &self,
        user_id: &str,
        character_id: &str,
        message_text: &str,
        conversation_id: Option<&str>,
    ) -> Result<ChatTurn, PlatformError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    pub user: entities::User,
    /// `true` when the username was unseen and the account was created.
    pub created: bool,
}

#[async_trait]
pub trait UserService: Send + Sync {
    /// Logs in, creating the account on first use of a username.
    ///
    /// Returns `Auth` when the username exists with a different password.
    async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, PlatformError>;
}
