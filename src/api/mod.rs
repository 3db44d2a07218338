use crate::error::PlatformError;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::error;
use serde_json::json;

pub mod auth;
pub mod characters;
pub mod chat;
pub mod conversations;
pub mod health;
pub mod ws;

const X_USER_ID: &str = "X-User-ID";
pub const ANONYMOUS_USER: &str = "anonymous";

/// All HTTP and WebSocket routes.
pub fn router() -> Router {
    Router::new()
        .nest("/api/v1", v1_router())
        .route("/login", post(auth::login))
        .route("/api/create-character", post(characters::create_character))
        .route("/api/send-message", post(chat::send_message))
        .route(
            "/ws/chat/:user_id/:character_id/:conversation_id",
            get(ws::websocket_chat),
        )
}

fn v1_router() -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/chat", post(chat::chat))
        .nest("/characters", characters::router())
        .nest("/conversations", conversations::router())
}

/// The caller's user id, taken from the `X-User-ID` header. Required.
#[derive(Debug)]
pub struct ExtractUser(pub String);

/// Like [`ExtractUser`], but a missing header is `None`. A malformed one is still rejected.
#[derive(Debug)]
pub struct MaybeUser(pub Option<String>);

fn user_from_parts(parts: &Parts) -> Result<Option<String>, (StatusCode, &'static str)> {
    match parts.headers.get(X_USER_ID) {
        Some(user_id) => {
            let user_id = user_id
                .to_str()
                .map_err(|_| (StatusCode::BAD_REQUEST, "invalid user id"))?
                .trim();
            if user_id.is_empty() {
                return Err((StatusCode::BAD_REQUEST, "invalid user id"));
            }
            Ok(Some(user_id.to_owned()))
        }
        None => Ok(None),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ExtractUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, (StatusCode, &'static str)> {
        user_from_parts(parts)?
            .map(ExtractUser)
            .ok_or((StatusCode::BAD_REQUEST, "`X-User-ID` header is missing"))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, (StatusCode, &'static str)> {
        Ok(MaybeUser(user_from_parts(parts)?))
    }
}

impl PlatformError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PlatformError::NotFound { .. } => StatusCode::NOT_FOUND,
            PlatformError::Validation(_) => StatusCode::BAD_REQUEST,
            PlatformError::Auth => StatusCode::UNAUTHORIZED,
            PlatformError::Upstream(_) => StatusCode::BAD_GATEWAY,
            PlatformError::UpstreamTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            PlatformError::Storage(_) | PlatformError::Template(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for PlatformError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{self}");
        }
        (
            status,
            Json(json!({ "error": self.kind(), "message": self.to_string() })),
        )
            .into_response()
    }
}
