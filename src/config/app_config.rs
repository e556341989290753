use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{CacheCategory, DomainError, RetryPolicy};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cache: CacheConfig,
    pub llm: LlmConfig,
    pub retry: RetryConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Cache store settings; `ttl` maps category names to seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub url: String,
    pub max_size: i64,
    pub freshness_secs: u64,
    pub key_prefix: Option<String>,
    pub ttl: HashMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    InMemory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        let ttl = HashMap::from([
            (CacheCategory::Drill.as_str().to_string(), 300),
            (CacheCategory::Simulation.as_str().to_string(), 300),
            (CacheCategory::Feedback.as_str().to_string(), 3600),
        ]);

        Self {
            url: "memory://local".to_string(),
            max_size: 10_000,
            freshness_secs: 300,
            key_prefix: None,
            ttl,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1500,
            temperature: 0.3,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1000,
            timeout_ms: 30_000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_url: None,
            max_connections: 10,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Copy that is safe to print
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();

        if !copy.llm.api_key.is_empty() {
            copy.llm.api_key = "***".to_string();
        }

        if let Some(url) = &copy.storage.database_url {
            copy.storage.database_url = Some(redact_url_password(url));
        }

        copy
    }
}

impl CacheConfig {
    /// Category TTLs keyed by the typed category
    pub fn ttl_by_category(&self) -> Result<HashMap<CacheCategory, u64>, DomainError> {
        self.ttl
            .iter()
            .map(|(name, secs)| Ok((name.parse::<CacheCategory>()?, *secs)))
            .collect()
    }

    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }
}

impl RetryConfig {
    pub fn policy(&self) -> Result<RetryPolicy, DomainError> {
        RetryPolicy::from_millis(self.max_attempts, self.delay_ms, self.timeout_ms)
    }
}

fn redact_url_password(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };

    match rest.split_once('@') {
        Some((credentials, host)) => match credentials.split_once(':') {
            Some((user, _)) => format!("{}://{}:***@{}", scheme, user, host),
            None => url.to_string(),
        },
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_usable() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.backend, StorageBackend::InMemory);
        assert!(config.retry.policy().is_ok());

        let ttl = config.cache.ttl_by_category().unwrap();
        assert_eq!(ttl.get(&CacheCategory::Feedback), Some(&3600));
    }

    #[test]
    fn test_unknown_ttl_category_is_rejected() {
        let mut config = CacheConfig::default();
        config.ttl.insert("leaderboard".to_string(), 60);

        assert!(matches!(
            config.ttl_by_category(),
            Err(DomainError::Configuration { .. })
        ));
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "retry": {"max_attempts": 5},
            "storage": {"backend": "postgres", "database_url": "postgres://app:secret@db/feedback"}
        }))
        .unwrap();

        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.delay_ms, 1000);
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_redacted_hides_secrets() {
        let mut config = AppConfig::default();
        config.llm.api_key = "sk-live".to_string();
        config.storage.database_url = Some("postgres://app:secret@db:5432/feedback".to_string());

        let redacted = config.redacted();

        assert_eq!(redacted.llm.api_key, "***");
        assert_eq!(
            redacted.storage.database_url.as_deref(),
            Some("postgres://app:***@db:5432/feedback")
        );
    }
}
