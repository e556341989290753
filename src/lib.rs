//! Drill Feedback Service
//!
//! Generates AI feedback for consulting practice drills and simulations:
//! - A typed, TTL-scoped cache over an in-memory or Redis backend
//! - A completion client with per-attempt timeouts and bounded retries
//! - An orchestrator that deduplicates generations and serves reads from cache

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use config::StorageBackend;
use domain::{DomainError, FeedbackRepository};
use domain::feedback::InMemoryFeedbackRepository;
use infrastructure::{
    cache::{CacheSettings, CacheStore},
    feedback::PostgresFeedbackRepository,
    llm::{HttpClient, OpenAiProvider, ResilientClient},
    services::FeedbackService,
};
use tracing::{info, warn};

/// Create the application state with default configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let cache = Arc::new(create_cache_store(config).await?);
    let client = Arc::new(create_completion_client(config)?);
    let repository = create_repository(config).await?;

    let feedback_service = FeedbackService::new(cache.clone(), client, repository)?
        .with_freshness(config.cache.freshness());

    info!("Application state initialized");
    Ok(AppState::new(Arc::new(feedback_service), cache))
}

async fn create_cache_store(config: &AppConfig) -> Result<CacheStore, DomainError> {
    let mut settings = CacheSettings::new(
        config.cache.url.clone(),
        config.cache.ttl_by_category()?,
        config.cache.max_size,
    )?;

    if let Some(prefix) = &config.cache.key_prefix {
        settings = settings.with_key_prefix(prefix.clone());
    }

    let store = CacheStore::from_settings(settings);
    store.connect().await?;

    Ok(store)
}

fn create_completion_client(config: &AppConfig) -> Result<ResilientClient, DomainError> {
    let llm = &config.llm;

    if llm.api_key.is_empty() {
        warn!("No completion API key configured; feedback generation will fail upstream");
    }

    let provider = OpenAiProvider::with_base_url(HttpClient::new(), llm.api_key.clone(), llm.base_url.clone());
    let client = ResilientClient::new(Arc::new(provider), llm.model.clone(), config.retry.policy()?)
        .with_max_tokens(llm.max_tokens)
        .with_temperature(llm.temperature);

    info!(model = %llm.model, max_attempts = config.retry.max_attempts, "Completion client configured");
    Ok(client)
}

async fn create_repository(config: &AppConfig) -> Result<Arc<dyn FeedbackRepository>, DomainError> {
    match config.storage.backend {
        StorageBackend::InMemory => {
            info!("Using in-memory feedback repository");
            Ok(Arc::new(InMemoryFeedbackRepository::new()))
        }
        StorageBackend::Postgres => {
            let url = config.storage.database_url.as_deref().ok_or_else(|| {
                DomainError::configuration("storage.database_url is required for the postgres backend")
            })?;

            let repository = PostgresFeedbackRepository::connect(url, config.storage.max_connections).await?;
            repository.migrate().await?;

            info!("Using PostgreSQL feedback repository");
            Ok(Arc::new(repository))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_default_state_starts_in_memory() {
        let state = create_app_state().await.unwrap();

        assert!(state.cache.is_connected());
        assert!(state.cache.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_postgres_backend_requires_url() {
        let mut config = AppConfig::default();
        config.storage.backend = StorageBackend::Postgres;

        let err = create_app_state_with_config(&config).await.unwrap_err();
        assert!(err.to_string().contains("database_url"));
    }

    #[tokio::test]
    async fn test_invalid_cache_url_is_rejected() {
        let mut config = AppConfig::default();
        config.cache.url = "ftp://nowhere".to_string();

        assert!(create_app_state_with_config(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_feedback_ttl_fails_startup() {
        let mut config = AppConfig::default();
        config.cache.ttl = HashMap::from([("drill".to_string(), 60)]);

        let err = create_app_state_with_config(&config).await.unwrap_err();
        assert!(err.to_string().contains("feedback"));
    }
}
