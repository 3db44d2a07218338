//! Error taxonomy shared by the stores, the assistant and the HTTP layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("invalid username or password")]
    Auth,

    #[error("LLM provider error: {0}")]
    Upstream(String),

    #[error("LLM provider timed out: {0}")]
    UpstreamTimeout(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("template error: {0}")]
    Template(String),
}

impl From<minijinja::Error> for PlatformError {
    fn from(e: minijinja::Error) -> Self {
        PlatformError::Template(e.to_string())
    }
}

impl PlatformError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        PlatformError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        PlatformError::Validation(message.into())
    }

    /// Stable machine-readable name, used as the `error` field of responses.
    pub fn kind(&self) -> &'static str {
        match self {
            PlatformError::NotFound { .. } => "not_found",
            PlatformError::Validation(_) => "validation_error",
            PlatformError::Auth => "auth_error",
            PlatformError::Upstream(_) | PlatformError::UpstreamTimeout(_) => "upstream_error",
            PlatformError::Storage(_) => "storage_error",
            PlatformError::Template(_) => "internal_error",
        }
    }
}
