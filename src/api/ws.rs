//! WebSocket chat
//!
//! Every inbound text frame is one chat turn; every turn answers with exactly one frame.

use crate::core::traits::PlatformService;
use crate::infrastructure::entities::{Character, MessageRole};
use crate::infrastructure::traits::CharacterRepository;
use axum::extract::Path;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use chrono::{DateTime, Utc};
use di::Ref;
use di_axum::Inject;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde::Serialize;

const EXIT_PHRASES: &[&str] = &["thank you", "thanks", "bye", "goodbye", "exit", "stop"];
const GOODBYE: &str = "Goodbye! Let me know if you'd like to continue our conversation later.";

/// Path values that mean "no conversation yet".
const NEW_CONVERSATION_MARKERS: &[&str] = &["", "null", "undefined", "new"];

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundFrame {
    Welcome {
        character: Character,
        message: String,
    },
    Message {
        role: MessageRole,
        content: String,
        conversation_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, PartialEq)]
pub enum SessionStep {
    Reply(OutboundFrame),
    Close(OutboundFrame),
}

/// Per-connection state. Nothing here outlives the socket.
#[derive(Debug)]
pub struct ChatSession {
    user_id: String,
    character_id: String,
    conversation_id: Option<String>,
}

impl ChatSession {
    pub fn new(user_id: String, character_id: String, conversation_id: &str) -> ChatSession {
        let conversation_id = if NEW_CONVERSATION_MARKERS.contains(&conversation_id) {
            None
        } else {
            Some(conversation_id.to_owned())
        };
        ChatSession {
            user_id,
            character_id,
            conversation_id,
        }
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub async fn handle_text(&mut self, platform: &dyn PlatformService, text: &str) -> SessionStep {
        if is_exit_phrase(text) {
            return SessionStep::Close(self.character_frame(GOODBYE.to_owned()));
        }

        match platform
            .send_message(
                &self.user_id,
                &self.character_id,
                text,
                self.conversation_id.as_deref(),
            )
            .await
        {
            Ok(turn) => {
                self.conversation_id = Some(turn.conversation_id);
                SessionStep::Reply(self.character_frame(turn.reply))
            }
            Err(e) => {
                warn!("websocket turn failed: {e}");
                SessionStep::Reply(OutboundFrame::Error {
                    message: e.to_string(),
                })
            }
        }
    }

    fn character_frame(&self, content: String) -> OutboundFrame {
        OutboundFrame::Message {
            role: MessageRole::Character,
            content,
            conversation_id: self.conversation_id.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// Matches whole messages like "Bye!" or "thank you", not words inside longer text.
pub fn is_exit_phrase(text: &str) -> bool {
    let normalized = text
        .trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    EXIT_PHRASES.contains(&normalized.as_str())
}

pub async fn websocket_chat(
    ws: WebSocketUpgrade,
    Path((user_id, character_id, conversation_id)): Path<(String, String, String)>,
    Inject(characters): Inject<dyn CharacterRepository>,
    Inject(platform): Inject<dyn PlatformService>,
) -> Response {
    let session = ChatSession::new(user_id, character_id, &conversation_id);
    ws.on_upgrade(move |socket| run_session(socket, session, characters, platform))
}

async fn run_session(
    socket: WebSocket,
    mut session: ChatSession,
    characters: Ref<dyn CharacterRepository>,
    platform: Ref<dyn PlatformService>,
) {
    let (mut sender, mut receiver) = socket.split();

    let character = match characters.get_character(&session.character_id).await {
        Ok(character) => character,
        Err(e) => {
            let frame = OutboundFrame::Error {
                message: e.to_string(),
            };
            let _ = sender.send(encode(&frame)).await;
            let _ = sender.close().await;
            return;
        }
    };

    let welcome = OutboundFrame::Welcome {
        message: format!("Welcome to your conversation with {}!", character.name),
        character,
    };
    if sender.send(encode(&welcome)).await.is_err() {
        return;
    }

    while let Some(frame) = receiver.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!("websocket receive failed: {e}");
                break;
            }
        };

        match session.handle_text(&*platform, &text).await {
            SessionStep::Reply(frame) => {
                if sender.send(encode(&frame)).await.is_err() {
                    break;
                }
            }
            SessionStep::Close(frame) => {
                let _ = sender.send(encode(&frame)).await;
                let _ = sender.close().await;
                break;
            }
        }
    }

    info!(
        "websocket connection closed for conversation {}",
        session.conversation_id().unwrap_or("<none>")
    );
}

fn encode(frame: &OutboundFrame) -> Message {
    // Frames only hold strings and timestamps, which always serialize.
    Message::Text(serde_json::to_string(frame).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::ChatTurn;
    use crate::error::PlatformError;
    use async_trait::async_trait;

    struct EchoPlatform;

    #[async_trait]
    impl PlatformService for EchoPlatform {
        async fn send_message(
            &self,
            _user_id: &str,
            character_id: &str,
            message_text: &str,
            conversation_id: Option<&str>,
        ) -> Result<ChatTurn, PlatformError> {
            if character_id == "ghost" {
                return Err(PlatformError::not_found("character", character_id));
            }
            Ok(ChatTurn {
                conversation_id: conversation_id.unwrap_or("c-1").to_owned(),
                reply: format!("echo {message_text}"),
            })
        }
    }

    #[test]
    fn test_new_conversation_markers() {
        for marker in ["null", "undefined", "new"] {
            let session = ChatSession::new("u".into(), "coach".into(), marker);
            assert_eq!(session.conversation_id(), None);
        }
        let session = ChatSession::new("u".into(), "coach".into(), "abc");
        assert_eq!(session.conversation_id(), Some("abc"));
    }

    #[test]
    fn test_exit_phrases_match_whole_messages_only() {
        assert!(is_exit_phrase("Bye!"));
        assert!(is_exit_phrase("  thank you. "));
        assert!(is_exit_phrase("STOP"));
        assert!(!is_exit_phrase("please don't stop talking"));
        assert!(!is_exit_phrase("unstoppable"));
    }

    #[tokio::test]
    async fn test_turn_adopts_created_conversation_id() {
        let mut session = ChatSession::new("u".into(), "coach".into(), "null");

        let step = session.handle_text(&EchoPlatform, "hi").await;

        match step {
            SessionStep::Reply(OutboundFrame::Message {
                role,
                content,
                conversation_id,
                ..
            }) => {
                assert_eq!(role, MessageRole::Character);
                assert_eq!(content, "echo hi");
                assert_eq!(conversation_id.as_deref(), Some("c-1"));
            }
            other => panic!("unexpected step: {other:?}"),
        }
        assert_eq!(session.conversation_id(), Some("c-1"));
    }

    #[tokio::test]
    async fn test_exit_phrase_closes_without_calling_platform() {
        let mut session = ChatSession::new("u".into(), "ghost".into(), "null");

        let step = session.handle_text(&EchoPlatform, "goodbye").await;

        match step {
            SessionStep::Close(OutboundFrame::Message { content, .. }) => {
                assert!(content.starts_with("Goodbye!"));
            }
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_turn_keeps_session_open() {
        let mut session = ChatSession::new("u".into(), "ghost".into(), "null");

        let step = session.handle_text(&EchoPlatform, "hello?").await;

        assert!(matches!(step, SessionStep::Reply(OutboundFrame::Error { .. })));
    }

    #[test]
    fn test_frames_are_tagged_by_type() {
        let json = serde_json::to_value(OutboundFrame::Error {
            message: "nope".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "nope");
    }
}
