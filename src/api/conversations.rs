//! Conversations endpoints

use crate::api::ExtractUser;
use crate::api::conversations::schemas::{ConversationDetail, ConversationList};
use crate::error::PlatformError;
use crate::infrastructure::traits::ConversationRepository;
use axum::extract::Path;
use axum::routing::get;
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_conversations))
        .route("/:id", get(conversation_messages))
}

async fn list_conversations(
    Inject(conversations): Inject<dyn ConversationRepository>,
    ExtractUser(current_user): ExtractUser,
) -> Result<Json<ConversationList>, PlatformError> {
    Ok(Json(ConversationList {
        conversations: conversations.list_for_user(&current_user).await?,
    }))
}

async fn conversation_messages(
    Inject(conversations): Inject<dyn ConversationRepository>,
    Path(conversation_id): Path<String>,
    ExtractUser(current_user): ExtractUser,
) -> Result<Json<ConversationDetail>, PlatformError> {
    let conversation = conversations.load(&current_user, &conversation_id).await?;
    Ok(Json(ConversationDetail::from(conversation)))
}

pub mod schemas {
    use crate::infrastructure::entities;
    use chrono::{DateTime, Utc};
    use serde::Serialize;

    #[derive(Serialize, Debug)]
    pub struct ConversationList {
        pub conversations: Vec<entities::ConversationSummary>,
    }

    #[derive(Serialize, Debug)]
    pub struct ConversationDetail {
        pub id: String,
        pub character_id: String,
        pub created_at: DateTime<Utc>,
        pub last_activity: DateTime<Utc>,
        pub messages: Vec<entities::Message>,
    }

    impl From<entities::Conversation> for ConversationDetail {
        fn from(conversation: entities::Conversation) -> Self {
            ConversationDetail {
                id: conversation.id,
                character_id: conversation.character_id,
                created_at: conversation.created_at,
                last_activity: conversation.last_activity,
                messages: conversation.messages,
            }
        }
    }
}
