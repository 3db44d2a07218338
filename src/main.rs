//! Character chat backend
//!
//! (c) Softlandia 2025

use character_chat_api::infrastructure::settings::Settings;
use character_chat_api::{app, build_provider};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use log::{info, warn};
use tokio::runtime::{Builder, Runtime};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env().context("invalid configuration")?;

    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(web_server_task(settings))
}

async fn web_server_task(settings: Settings) -> anyhow::Result<()> {
    if settings.reload {
        warn!("RELOAD is set but has no effect, restart the process to pick up changes");
    }
    if settings.stub_mode() {
        warn!("GROQ_API_KEY not set, characters will answer with stub replies");
    }

    let provider = build_provider(settings.clone())?;

    let app = app(provider).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_headers(Any)
                    .allow_methods([Method::GET, Method::POST])
                    .allow_origin([
                        HeaderValue::from_static("http://localhost:3000"),
                        HeaderValue::from_static("http://localhost:5173"),
                    ]),
            ),
    );

    let listener = tokio::net::TcpListener::bind(settings.bind_address())
        .await
        .with_context(|| format!("cannot bind {}", settings.bind_address()))?;
    info!(
        "{} {} ({}) listening on {}",
        settings.app_name,
        settings.app_version,
        settings.environment,
        listener.local_addr()?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("cannot listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
}
