//! Persisted entities
//!
//! These are the exact shapes written to the JSON files under the data directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    pub description: String,
    pub personality: String,
    pub system_prompt: String,
    #[serde(default = "default_avatar_url")]
    pub avatar_url: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_avatar_url() -> String {
    "default_avatar.png".to_owned()
}

fn default_category() -> String {
    "general".to_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Character,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub character_id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: String, user_id: &str, character_id: &str) -> Conversation {
        let now = Utc::now();
        Conversation {
            id,
            user_id: user_id.to_owned(),
            character_id: character_id.to_owned(),
            messages: Vec::new(),
            created_at: now,
            last_activity: now,
        }
    }

    pub fn push(&mut self, role: MessageRole, text: String) {
        let timestamp = Utc::now();
        self.messages.push(Message {
            role,
            text,
            timestamp,
        });
        self.last_activity = timestamp;
    }

    /// The messages preceding the most recent one.
    pub fn messages_excluding_last(&self) -> &[Message] {
        match self.messages.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }
}

/// Listing view of a conversation. Derived on read, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationSummary {
    pub id: String,
    pub character_id: String,
    pub last_activity: DateTime<Utc>,
    pub message_count: usize,
    pub preview: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}
