//! LLM Assistant service.
//!
//! Renders a character's persona and the conversation so far into a chat prompt and sends it
//! to an OpenAI-compatible completion endpoint. Without an API key the assistant answers with
//! a deterministic local echo instead.

use crate::core::traits::Assistant;
use crate::error::PlatformError;
use crate::infrastructure::entities;
use crate::infrastructure::settings::{LlmSettings, Settings};
use async_trait::async_trait;
use di::{Ref, inject, injectable};
use log::{debug, error, info, warn};
use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};

const SYSTEM_PROMPT_TEMPLATE: &str = r#"{{ character.system_prompt }}
{%- if first_message %}

You are {{ character.name }}. {{ character.description }}
Personality: {{ character.personality }}

This is the first message from the user. Introduce yourself briefly and then respond.
{%- endif %}"#;

/// Role labels some models prepend to their answer.
const REPLY_PREFIXES: &[&str] = &[
    "Assistant:",
    "assistant:",
    "ASSISTANT:",
    "Response:",
    "Answer:",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    role: Role,
    content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> ChatMessage {
        ChatMessage {
            role,
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl From<&entities::Message> for ChatMessage {
    fn from(m: &entities::Message) -> Self {
        Self {
            content: m.text.clone(),
            role: match m.role {
                entities::MessageRole::User => Role::User,
                entities::MessageRole::Character => Role::Assistant,
            },
        }
    }
}

/// System prompt, then the history in order, then the new user message.
pub fn build_prompt(
    character: &entities::Character,
    history: &[entities::Message],
    new_message: &str,
) -> Result<Vec<ChatMessage>, PlatformError> {
    let first_message = !history
        .iter()
        .any(|m| m.role == entities::MessageRole::User);

    let system_prompt = Environment::new().render_str(
        SYSTEM_PROMPT_TEMPLATE,
        context! { character => character, first_message => first_message },
    )?;

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::new(Role::System, system_prompt));
    messages.extend(history.iter().map(ChatMessage::from));
    messages.push(ChatMessage::new(Role::User, new_message));
    Ok(messages)
}

/// The reply used when no provider is configured.
pub fn stub_reply(character: &entities::Character, new_message: &str) -> String {
    format!("{} echoes: {}", character.name, new_message)
}

/// Trims the reply and drops a leading role label.
pub fn clean_reply(reply: &str) -> String {
    let reply = reply.trim();
    for prefix in REPLY_PREFIXES {
        if let Some(rest) = reply.strip_prefix(prefix) {
            return rest.trim().to_owned();
        }
    }
    reply.to_owned()
}

pub struct LlmAssistant {
    provider: Option<CompletionProvider>,
}

#[injectable(Assistant)]
impl LlmAssistant {
    #[inject]
    pub fn create(settings: Ref<Settings>) -> LlmAssistant {
        LlmAssistant::new(&settings.llm)
    }
}

impl LlmAssistant {
    pub fn new(settings: &LlmSettings) -> LlmAssistant {
        let Some(api_key) = settings.api_key.clone() else {
            warn!("assistant running in STUB mode (GROQ_API_KEY not set)");
            return LlmAssistant::stub();
        };

        match reqwest::Client::builder().timeout(settings.timeout).build() {
            Ok(client) => {
                info!("assistant using {} at {}", settings.model, settings.api_url);
                LlmAssistant {
                    provider: Some(CompletionProvider {
                        client,
                        api_url: settings.api_url.clone(),
                        api_key,
                        model: settings.model.clone(),
                        temperature: settings.temperature,
                        max_tokens: settings.max_tokens,
                    }),
                }
            }
            Err(e) => {
                error!("failed to build HTTP client, falling back to STUB mode: {e}");
                LlmAssistant::stub()
            }
        }
    }

    pub fn stub() -> LlmAssistant {
        LlmAssistant { provider: None }
    }

    pub fn is_stub(&self) -> bool {
        self.provider.is_none()
    }
}

#[async_trait]
impl Assistant for LlmAssistant {
    async fn generate_reply(
        &self,
        character: &entities::Character,
        history: &[entities::Message],
        new_message: &str,
    ) -> Result<String, PlatformError> {
        let Some(provider) = &self.provider else {
            return Ok(stub_reply(character, new_message));
        };

        let messages = build_prompt(character, history, new_message)?;
        let reply = clean_reply(&provider.complete(&messages).await?);
        if reply.is_empty() {
            return Err(PlatformError::Upstream("provider returned an empty reply".into()));
        }
        Ok(reply)
    }
}

struct CompletionProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl CompletionProvider {
    /// One request, one response. Retrying is up to the caller.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, PlatformError> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        debug!(
            "sending {} messages to {} ({})",
            messages.len(),
            self.api_url,
            self.model
        );

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(upstream_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(200).collect();
            error!("LLM provider answered {status}: {body}");
            return Err(PlatformError::Upstream(format!("provider answered {status}")));
        }

        let completion: CompletionResponse = response.json().await.map_err(upstream_error)?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| PlatformError::Upstream("no content in provider response".into()))
    }
}

fn upstream_error(e: reqwest::Error) -> PlatformError {
    error!("LLM request failed: {e}");
    if e.is_timeout() {
        PlatformError::UpstreamTimeout(e.to_string())
    } else {
        PlatformError::Upstream(e.to_string())
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}
