//! JSON file repositories

use crate::error::PlatformError;
use crate::infrastructure::entities::{Character, Conversation, ConversationSummary, User};
use crate::infrastructure::settings::Settings;
use crate::infrastructure::storage::DataDirectory;
use crate::infrastructure::traits::{CharacterRepository, ConversationRepository, UserRepository};
use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use di::{Ref, injectable};
use log::{info, warn};
use minijinja::{Environment, context};
use uuid::Uuid;

const PREVIEW_LENGTH: usize = 100;

const GENERATED_DESCRIPTION: &str =
    "A character built around {{ topic }}, who is {{ traits | join(', ') }}.";

const GENERATED_SYSTEM_PROMPT: &str = r#"You are {{ name }}, a character whose world revolves around {{ topic }}.
Your personality traits are: {{ traits | join(', ') }}.
Stay in character, let these traits shape every answer, and keep the conversation focused on {{ topic }}."#;

#[injectable(CharacterRepository)]
pub struct JsonCharacterRepository {
    storage: Ref<DataDirectory>,
}

impl JsonCharacterRepository {
    async fn write_all(&self, characters: &[Character]) -> Result<(), PlatformError> {
        self.storage
            .write_json(&self.storage.characters_file(), characters)
            .await
    }
}

#[async_trait]
impl CharacterRepository for JsonCharacterRepository {
    async fn list_characters(&self) -> Result<Vec<Character>, PlatformError> {
        match self
            .storage
            .read_json::<Vec<Character>>(&self.storage.characters_file())
            .await?
        {
            Some(characters) => Ok(characters),
            None => {
                info!("no characters.json found, writing defaults");
                let characters = default_characters();
                self.write_all(&characters).await?;
                Ok(characters)
            }
        }
    }

    async fn get_character(&self, id: &str) -> Result<Character, PlatformError> {
        self.list_characters()
            .await?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| PlatformError::not_found("character", id))
    }

    async fn create_character(
        &self,
        topic: &str,
        traits: &[String],
    ) -> Result<Character, PlatformError> {
        let character = synthesize_character(topic, traits)?;

        // The whole list is rewritten, so concurrent creations race like conversations do.
        let mut characters = self.list_characters().await?;
        characters.push(character.clone());
        self.write_all(&characters).await?;

        info!("created character {} ({})", character.id, character.name);
        Ok(character)
    }
}

pub fn default_characters() -> Vec<Character> {
    vec![Character {
        id: "coach".to_owned(),
        name: "Interview Coach".to_owned(),
        description: "An expert interview coach helping you prepare for job interviews."
            .to_owned(),
        personality: "Professional, supportive, and insightful.".to_owned(),
        system_prompt: "You are an expert interview coach helping prepare candidates for \
            interviews. Provide helpful advice, use the STAR framework, and be supportive but \
            honest."
            .to_owned(),
        avatar_url: "coach.png".to_owned(),
        category: "professional".to_owned(),
        tags: vec!["interview".into(), "career".into(), "advice".into()],
    }]
}

/// Builds a character record from a topic and a trait list. No LLM involved.
pub fn synthesize_character(topic: &str, traits: &[String]) -> Result<Character, PlatformError> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(PlatformError::validation("topic must not be empty"));
    }
    let traits: Vec<&str> = traits
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if traits.is_empty() {
        return Err(PlatformError::validation("at least one trait is required"));
    }

    let name = format!("Generated {}", title_case(topic));
    let env = Environment::new();
    let render = |template: &str| {
        env.render_str(
            template,
            context! { name => &name, topic => topic, traits => &traits },
        )
    };

    let mut tags: Vec<String> = Vec::with_capacity(traits.len() + 1);
    for tag in std::iter::once(topic).chain(traits.iter().copied()) {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_owned());
        }
    }

    Ok(Character {
        id: format!("gen_{}", Uuid::new_v4().simple()),
        description: render(GENERATED_DESCRIPTION)?,
        system_prompt: render(GENERATED_SYSTEM_PROMPT)?,
        personality: traits.join(", "),
        name,
        avatar_url: "generated.png".to_owned(),
        category: "generated".to_owned(),
        tags,
    })
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[injectable(ConversationRepository)]
pub struct JsonConversationRepository {
    storage: Ref<DataDirectory>,
    settings: Ref<Settings>,
}

impl JsonConversationRepository {
    /// Conversation ids are UUIDs; anything else cannot name a stored file.
    async fn read(&self, conversation_id: &str) -> Result<Option<Conversation>, PlatformError> {
        if Uuid::parse_str(conversation_id).is_err() {
            return Ok(None);
        }
        self.storage
            .read_json(&self.storage.conversation_file(conversation_id))
            .await
    }

    fn summarize(&self, conversation: &Conversation) -> ConversationSummary {
        let timeout =
            TimeDelta::from_std(self.settings.inactivity_timeout).unwrap_or(TimeDelta::MAX);
        let preview = conversation
            .messages
            .last()
            .map(|m| {
                if m.text.chars().count() > PREVIEW_LENGTH {
                    let cut: String = m.text.chars().take(PREVIEW_LENGTH).collect();
                    format!("{cut}...")
                } else {
                    m.text.clone()
                }
            })
            .unwrap_or_default();

        ConversationSummary {
            id: conversation.id.clone(),
            character_id: conversation.character_id.clone(),
            last_activity: conversation.last_activity,
            message_count: conversation.messages.len(),
            preview,
            active: Utc::now() - conversation.last_activity <= timeout,
        }
    }
}

#[async_trait]
impl ConversationRepository for JsonConversationRepository {
    async fn get_or_create(
        &self,
        user_id: &str,
        character_id: &str,
        conversation_id: Option<&str>,
    ) -> Result<Conversation, PlatformError> {
        let Some(conversation_id) = conversation_id else {
            return Ok(Conversation::new(
                Uuid::new_v4().to_string(),
                user_id,
                character_id,
            ));
        };

        match self.read(conversation_id).await? {
            Some(conversation)
                if conversation.user_id == user_id && conversation.character_id == character_id =>
            {
                Ok(conversation)
            }
            _ => Err(PlatformError::not_found("conversation", conversation_id)),
        }
    }

    async fn load(&self, user_id: &str, conversation_id: &str) -> Result<Conversation, PlatformError> {
        match self.read(conversation_id).await? {
            Some(conversation) if conversation.user_id == user_id => Ok(conversation),
            _ => Err(PlatformError::not_found("conversation", conversation_id)),
        }
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), PlatformError> {
        self.storage
            .write_json(&self.storage.conversation_file(&conversation.id), conversation)
            .await
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ConversationSummary>, PlatformError> {
        let dir = self.storage.conversations_dir();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(PlatformError::Storage(format!(
                    "cannot list {}: {e}",
                    dir.display()
                )));
            }
        };

        let mut summaries = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PlatformError::Storage(format!("cannot list {}: {e}", dir.display())))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.storage.read_json::<Conversation>(&path).await {
                Ok(Some(conversation)) if conversation.user_id == user_id => {
                    summaries.push(self.summarize(&conversation));
                }
                Ok(_) => {}
                Err(e) => warn!("skipping conversation file: {e}"),
            }
        }

        summaries.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        Ok(summaries)
    }
}

#[injectable(UserRepository)]
pub struct JsonUserRepository {
    storage: Ref<DataDirectory>,
}

impl JsonUserRepository {
    async fn read_all(&self) -> Result<Vec<User>, PlatformError> {
        Ok(self
            .storage
            .read_json(&self.storage.users_file())
            .await?
            .unwrap_or_default())
    }
}

#[async_trait]
impl UserRepository for JsonUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, PlatformError> {
        Ok(self
            .read_all()
            .await?
            .into_iter()
            .find(|u| u.username == username))
    }

    async fn save_user(&self, user: &User) -> Result<(), PlatformError> {
        let mut users = self.read_all().await?;
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user.clone(),
            None => users.push(user.clone()),
        }
        self.storage
            .write_json(&self.storage.users_file(), &users)
            .await
    }
}
