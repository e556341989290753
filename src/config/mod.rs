mod app_config;

pub use app_config::{
    AppConfig, CacheConfig, LlmConfig, LogFormat, LoggingConfig, RetryConfig, ServerConfig,
    StorageBackend, StorageConfig,
};
