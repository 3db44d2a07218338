//! Implementations for the service the app needs.
//!

use crate::core::traits::{Assistant, ChatTurn, LoginOutcome, PlatformService, UserService};
use crate::error::PlatformError;
use crate::infrastructure::entities::{MessageRole, User};
use crate::infrastructure::traits::{CharacterRepository, ConversationRepository, UserRepository};
use async_trait::async_trait;
use chrono::Utc;
use di::{Ref, injectable};
use log::{error, info};
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[injectable(PlatformService)]
pub struct ChatPlatformService {
    characters: Ref<dyn CharacterRepository>,
    conversations: Ref<dyn ConversationRepository>,
    assistant: Ref<dyn Assistant>,
}

#[async_trait]
impl PlatformService for ChatPlatformService {
    async fn send_message(
        &self,
        user_id: &str,
        character_id: &str,
        message_text: &str,
        conversation_id: Option<&str>,
    ) -> Result<ChatTurn, PlatformError> {
        let message_text = message_text.trim();
        if message_text.is_empty() {
            return Err(PlatformError::validation("message must not be empty"));
        }

        let character = self.characters.get_character(character_id).await?;
        let mut conversation = self
            .conversations
            .get_or_create(user_id, character_id, conversation_id)
            .await?;

        self.conversations.append_message(
            &mut conversation,
            MessageRole::User,
            message_text.to_owned(),
        );

        let reply = self
            .assistant
            .generate_reply(
                &character,
                conversation.messages_excluding_last(),
                message_text,
            )
            .await?;

        self.conversations
            .append_message(&mut conversation, MessageRole::Character, reply.clone());

        // The reply is returned even when it could not be persisted.
        if let Err(e) = self.conversations.save(&conversation).await {
            error!("failed to save conversation {}: {e}", conversation.id);
        }

        info!(
            "user {user_id} chatted with {character_id} in conversation {}",
            conversation.id
        );
        Ok(ChatTurn {
            conversation_id: conversation.id,
            reply,
        })
    }
}

#[injectable(UserService)]
pub struct AccountUserService {
    users: Ref<dyn UserRepository>,
}

pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

#[async_trait]
impl UserService for AccountUserService {
    async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, PlatformError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(PlatformError::validation(
                "username and password are required",
            ));
        }

        let password_hash = hash_password(password);
        let now = Utc::now();

        let (user, created) = match self.users.find_by_username(username).await? {
            Some(mut user) => {
                if user.password_hash != password_hash {
                    return Err(PlatformError::Auth);
                }
                user.last_login = now;
                (user, false)
            }
            None => {
                info!("creating user {username}");
                let user = User {
                    id: Uuid::new_v4().to_string(),
                    username: username.to_owned(),
                    password_hash,
                    created_at: now,
                    last_login: now,
                };
                (user, true)
            }
        };

        self.users.save_user(&user).await?;
        Ok(LoginOutcome { user, created })
    }
}
