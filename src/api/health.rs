//! Liveness endpoint

use crate::infrastructure::settings::Settings;
use axum::Json;
use di_axum::Inject;
use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct HealthResponse {
    pub status: &'static str,
    pub name: String,
    pub version: String,
    pub environment: String,
}

pub async fn health(Inject(settings): Inject<Settings>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        name: settings.app_name.clone(),
        version: settings.app_version.clone(),
        environment: settings.environment.clone(),
    })
}
