//! Infrastructure traits, used for DI on higher levels

use crate::error::PlatformError;
use crate::infrastructure::entities;
use crate::infrastructure::entities::MessageRole;
use async_trait::async_trait;

#[async_trait]
pub trait CharacterRepository: Send + Sync {
    /// All characters, in file order. Seeds the defaults when no file exists yet.
    async fn list_characters(&self) -> Result<Vec<entities::Character>, PlatformError>;

    async fn get_character(&self, id: &str) -> Result<entities::Character, PlatformError>;

    /// Synthesizes a character from a topic and traits and appends it to the store.
    async fn create_character(
        &self,
        topic: &str,
        traits: &[String],
    ) -> Result<entities::Character, PlatformError>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Loads the given conversation, or starts a new one when `conversation_id` is `None`.
    ///
    /// Returns `NotFound` if the conversation does not exist or belongs to another
    /// user/character pairing.
    async fn get_or_create(
        &self,
        user_id: &str,
        character_id: &str,
        conversation_id: Option<&str>,
    ) -> Result<entities::Conversation, PlatformError>;

    /// Loads a conversation owned by `user_id`.
    async fn load(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<entities::Conversation, PlatformError>;

    /// Appends in memory only; callers persist with [`ConversationRepository::save`].
    fn append_message(
        &self,
        conversation: &mut entities::Conversation,
        role: MessageRole,
        text: String,
    ) {
        conversation.push(role, text);
    }

    /// Overwrites the stored conversation. Last write wins.
    async fn save(&self, conversation: &entities::Conversation) -> Result<(), PlatformError>;

    /// Summaries of the user's conversations, most recently active first.
    async fn list_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<entities::ConversationSummary>, PlatformError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<entities::User>, PlatformError>;

    /// Inserts the user, or replaces the stored record with the same id.
    async fn save_user(&self, user: &entities::User) -> Result<(), PlatformError>;
}
