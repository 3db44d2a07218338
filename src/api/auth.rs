//! Login endpoint

use crate::api::auth::schemas::{LoginRequest, LoginResponse};
use crate::core::traits::UserService;
use crate::error::PlatformError;
use axum::Json;
use di_axum::Inject;

/// Logs in or registers. The returned `user_id` is the session identifier clients send back
/// in the `X-User-ID` header and the WebSocket path.
pub async fn login(
    Inject(users): Inject<dyn UserService>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, PlatformError> {
    let outcome = users.login(&request.username, &request.password).await?;

    Ok(Json(LoginResponse {
        user_id: outcome.user.id,
        username: outcome.user.username,
        created: outcome.created,
    }))
}

pub mod schemas {
    use serde::{Deserialize, Serialize};

    #[derive(Deserialize)]
    pub struct LoginRequest {
        pub username: String,
        pub password: String,
    }

    #[derive(Serialize, Debug)]
    pub struct LoginResponse {
        pub user_id: String,
        pub username: String,
        pub created: bool,
    }
}
