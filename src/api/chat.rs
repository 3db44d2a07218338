//! Chat endpoints

use crate::api::{ANONYMOUS_USER, MaybeUser};
use crate::api::chat::schemas::{ChatRequest, ChatResponse, SendMessageRequest, SendMessageResponse};
use crate::core::traits::PlatformService;
use crate::error::PlatformError;
use crate::infrastructure::traits::ConversationRepository;
use axum::Json;
use di_axum::Inject;

/// The user is the `X-User-ID` header if present, else the body's `user_id`, else anonymous.
pub async fn chat(
    Inject(platform): Inject<dyn PlatformService>,
    MaybeUser(header_user): MaybeUser,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, PlatformError> {
    let current_user = header_user
        .or_else(|| {
            request
                .user_id
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| ANONYMOUS_USER.to_owned());

    let turn = platform
        .send_message(
            &current_user,
            &request.character_id,
            &request.message,
            request.conversation_id.as_deref(),
        )
        .await?;

    Ok(Json(ChatResponse {
        character_id: request.character_id,
        conversation_id: turn.conversation_id,
        reply: turn.reply,
    }))
}

/// Continues an existing conversation. The character defaults to the conversation's own.
pub async fn send_message(
    Inject(platform): Inject<dyn PlatformService>,
    Inject(conversations): Inject<dyn ConversationRepository>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, PlatformError> {
    let user_id = request.user_id.trim();
    if user_id.is_empty() {
        return Err(PlatformError::validation("user_id must not be empty"));
    }

    let character_id = match request.character_id {
        Some(character_id) => character_id,
        None => {
            conversations
                .load(user_id, &request.conversation_id)
                .await?
                .character_id
        }
    };

    let turn = platform
        .send_message(
            user_id,
            &character_id,
            &request.message,
            Some(&request.conversation_id),
        )
        .await?;

    Ok(Json(SendMessageResponse {
        conversation_id: turn.conversation_id,
        reply: turn.reply,
    }))
}

pub mod schemas {
    use serde::{Deserialize, Serialize};

    #[derive(Deserialize, Debug)]
    pub struct ChatRequest {
        #[serde(default)]
        pub user_id: Option<String>,
        pub character_id: String,
        pub message: String,
        #[serde(default)]
        pub conversation_id: Option<String>,
    }

    #[derive(Serialize, Debug)]
    pub struct ChatResponse {
        pub character_id: String,
        pub conversation_id: String,
        pub reply: String,
    }

    #[derive(Deserialize, Debug)]
    pub struct SendMessageRequest {
        pub user_id: String,
        pub conversation_id: String,
        pub message: String,
        #[serde(default)]
        pub character_id: Option<String>,
    }

    #[derive(Serialize, Debug)]
    pub struct SendMessageResponse {
        pub conversation_id: String,
        pub reply: String,
    }
}
