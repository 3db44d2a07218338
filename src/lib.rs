//! Character chat backend - Library exports for testing
//!
//! (c) Softlandia 2025

pub mod api;
pub mod core;
pub mod error;
pub mod infrastructure;

use crate::core::assistant::LlmAssistant;
use crate::core::services::{AccountUserService, ChatPlatformService};
use crate::infrastructure::repositories::{
    JsonCharacterRepository, JsonConversationRepository, JsonUserRepository,
};
use crate::infrastructure::settings::Settings;
use crate::infrastructure::storage::DataDirectory;
use anyhow::anyhow;
use axum::Router;
use di::{Injectable, Ref, ServiceCollection, ServiceProvider, singleton_factory};
use di_axum::RouterServiceProviderExtensions;

/// Registers everything except the assistant, so callers can choose their own.
///
/// Settings and storage are singletons; stores and services are scoped to a request and
/// re-read their files every time.
pub fn base_services(settings: Settings) -> ServiceCollection {
    let mut services = ServiceCollection::new();
    services
        .add(singleton_factory(move |_| Ref::new(settings.clone())))
        .add(DataDirectory::singleton())
        .add(JsonCharacterRepository::scoped())
        .add(JsonConversationRepository::scoped())
        .add(JsonUserRepository::scoped())
        .add(ChatPlatformService::scoped())
        .add(AccountUserService::scoped());
    services
}

pub fn build_provider(settings: Settings) -> anyhow::Result<ServiceProvider> {
    let mut services = base_services(settings);
    services.add(LlmAssistant::singleton());
    services
        .build_provider()
        .map_err(|e| anyhow!("invalid service registrations: {e:?}"))
}

/// The full router with the service provider attached.
pub fn app(provider: ServiceProvider) -> Router {
    api::router().with_provider(provider)
}
