//! Typed, category-scoped cache facade over a backend

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::in_memory::{InMemoryCache, InMemoryCacheConfig};
use super::redis::{RedisCache, RedisCacheConfig};
use crate::domain::DomainError;
use crate::domain::cache::{Cache, CacheCategory, TtlPolicy};

const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Backend selected by the URL scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    InMemory,
    Redis,
}

impl CacheBackendKind {
    fn from_url(url: &str) -> Result<Self, DomainError> {
        let scheme = url.split("://").next().unwrap_or_default().to_lowercase();

        match scheme.as_str() {
            "memory" => Ok(Self::InMemory),
            "redis" | "rediss" => Ok(Self::Redis),
            _ => Err(DomainError::configuration(format!(
                "Unsupported cache URL '{}'. Expected memory://, redis:// or rediss://",
                url
            ))),
        }
    }
}

/// Validated cache settings
#[derive(Debug, Clone)]
pub struct CacheSettings {
    url: String,
    kind: CacheBackendKind,
    ttl: TtlPolicy,
    max_size: u64,
    key_prefix: Option<String>,
    connection_timeout: Duration,
}

impl CacheSettings {
    /// Validates cache configuration once, up front
    pub fn new(
        url: impl Into<String>,
        ttl_by_category: HashMap<CacheCategory, u64>,
        max_size: i64,
    ) -> Result<Self, DomainError> {
        let url = url.into();

        if url.trim().is_empty() {
            return Err(DomainError::configuration("Cache URL cannot be empty"));
        }

        if max_size <= 0 {
            return Err(DomainError::configuration(format!(
                "Cache max size must be positive, got {}",
                max_size
            )));
        }

        let kind = CacheBackendKind::from_url(&url)?;
        let ttl = TtlPolicy::new(ttl_by_category)?;

        Ok(Self {
            url,
            kind,
            ttl,
            max_size: max_size as u64,
            key_prefix: None,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
        })
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn kind(&self) -> CacheBackendKind {
        self.kind
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn ttl(&self) -> &TtlPolicy {
        &self.ttl
    }
}

/// Process-wide cache handle
///
/// Created once at startup and shared by `Arc`. Every operation requires a
/// successful `connect()` first.
#[derive(Debug)]
pub struct CacheStore {
    settings: CacheSettings,
    backend: OnceCell<Arc<dyn Cache>>,
    connected: AtomicBool,
}

impl CacheStore {
    /// Validates configuration; the backend is opened by `connect`
    pub fn configure(
        url: impl Into<String>,
        ttl_by_category: HashMap<CacheCategory, u64>,
        max_size: i64,
    ) -> Result<Self, DomainError> {
        Ok(Self::from_settings(CacheSettings::new(url, ttl_by_category, max_size)?))
    }

    pub fn from_settings(settings: CacheSettings) -> Self {
        Self {
            settings,
            backend: OnceCell::new(),
            connected: AtomicBool::new(false),
        }
    }

    /// Uses an already constructed backend instead of the one the URL names
    pub fn with_backend(settings: CacheSettings, backend: Arc<dyn Cache>) -> Self {
        Self {
            settings,
            backend: OnceCell::new_with(Some(backend)),
            connected: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Opens the backend (once) and verifies it with a ping. Safe to call repeatedly.
    pub async fn connect(&self) -> Result<(), DomainError> {
        let backend = self
            .backend
            .get_or_try_init(|| self.open_backend())
            .await?;

        backend.ping().await?;

        if !self.connected.swap(true, Ordering::AcqRel) {
            info!(
                backend = ?self.settings.kind,
                max_size = self.settings.max_size,
                "Cache store connected"
            );
        }

        Ok(())
    }

    /// Round-trips to the backend; used by readiness checks
    pub async fn ping(&self) -> Result<(), DomainError> {
        self.backend()?.ping().await
    }

    /// Stores `value` under `key` with the TTL registered for `category`
    pub async fn set<V>(&self, key: &str, value: &V, category: CacheCategory) -> Result<(), DomainError>
    where
        V: Serialize + ?Sized,
    {
        if key.is_empty() {
            return Err(DomainError::validation("Cache key cannot be empty"));
        }

        let ttl = self.settings.ttl.ttl_for(category)?;

        let data = serde_json::to_string(value).map_err(|e| {
            DomainError::serialization(format!("Failed to serialize value for key '{}': {}", key, e))
        })?;

        if data == "null" {
            return Err(DomainError::validation(format!(
                "Cannot cache an absent value for key '{}'",
                key
            )));
        }

        self.backend()?.set_raw(key, &data, ttl).await?;
        debug!(key, %category, ttl_secs = ttl.as_secs(), "Cache entry stored");

        Ok(())
    }

    /// Returns the value for `key`, or `None` if it is absent, expired or unreadable
    pub async fn get<V>(&self, key: &str) -> Result<Option<V>, DomainError>
    where
        V: DeserializeOwned,
    {
        if key.is_empty() {
            return Err(DomainError::validation("Cache key cannot be empty"));
        }

        let Some(data) = self.backend()?.get_raw(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&data) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable cache entry");
                Ok(None)
            }
        }
    }

    /// Removes `key`; a missing key is not an error
    pub async fn delete(&self, key: &str) -> Result<(), DomainError> {
        let existed = self.backend()?.delete(key).await?;
        debug!(key, existed, "Cache entry deleted");
        Ok(())
    }

    /// Removes every entry in the namespace
    pub async fn clear(&self) -> Result<(), DomainError> {
        self.backend()?.clear().await?;
        info!("Cache store cleared");
        Ok(())
    }

    /// Approximate number of live entries
    pub async fn size(&self) -> Result<usize, DomainError> {
        self.backend()?.size().await
    }

    fn backend(&self) -> Result<&Arc<dyn Cache>, DomainError> {
        if !self.is_connected() {
            return Err(DomainError::connection(
                "Cache store is not connected; call connect() first",
            ));
        }

        self.backend
            .get()
            .ok_or_else(|| DomainError::connection("Cache backend is not initialized"))
    }

    async fn open_backend(&self) -> Result<Arc<dyn Cache>, DomainError> {
        match self.settings.kind {
            CacheBackendKind::InMemory => {
                let config = InMemoryCacheConfig::default()
                    .with_max_capacity(self.settings.max_size)
                    .with_max_ttl(self.settings.ttl.max_ttl());

                Ok(Arc::new(InMemoryCache::with_config(config)))
            }
            CacheBackendKind::Redis => {
                let mut config = RedisCacheConfig::new(self.settings.url.clone())
                    .with_connection_timeout(self.settings.connection_timeout);

                if let Some(prefix) = &self.settings.key_prefix {
                    config = config.with_key_prefix(prefix.clone());
                }

                Ok(Arc::new(RedisCache::connect(config).await?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCache;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Record {
        id: u32,
    }

    fn drill_ttl(secs: u64) -> HashMap<CacheCategory, u64> {
        HashMap::from([(CacheCategory::Drill, secs)])
    }

    async fn connected_store(ttl_secs: u64) -> CacheStore {
        let store = CacheStore::configure("memory://local", drill_ttl(ttl_secs), 100).unwrap();
        store.connect().await.unwrap();
        store
    }

    #[test]
    fn test_configure_rejects_invalid_settings() {
        assert!(matches!(
            CacheStore::configure("", drill_ttl(300), 100),
            Err(DomainError::Configuration { .. })
        ));
        assert!(matches!(
            CacheStore::configure("memory://local", HashMap::new(), 100),
            Err(DomainError::Configuration { .. })
        ));
        assert!(matches!(
            CacheStore::configure("memory://local", drill_ttl(300), 0),
            Err(DomainError::Configuration { .. })
        ));
        assert!(matches!(
            CacheStore::configure("memory://local", drill_ttl(300), -5),
            Err(DomainError::Configuration { .. })
        ));
        assert!(matches!(
            CacheStore::configure("memcached://host", drill_ttl(300), 10),
            Err(DomainError::Configuration { .. })
        ));
    }

    #[test]
    fn test_backend_kind_from_url() {
        let settings = CacheSettings::new("redis://localhost:6379", drill_ttl(1), 1).unwrap();
        assert_eq!(settings.kind(), CacheBackendKind::Redis);

        let settings = CacheSettings::new("memory://", drill_ttl(1), 1).unwrap();
        assert_eq!(settings.kind(), CacheBackendKind::InMemory);
    }

    #[tokio::test]
    async fn test_operations_require_connect() {
        let store = CacheStore::configure("memory://local", drill_ttl(300), 100).unwrap();

        let result = store.set("k", &Record { id: 1 }, CacheCategory::Drill).await;
        assert!(matches!(result, Err(DomainError::Connection { .. })));

        let result: Result<Option<Record>, _> = store.get("k").await;
        assert!(matches!(result, Err(DomainError::Connection { .. })));
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let store = connected_store(300).await;
        store.set("k", &Record { id: 1 }, CacheCategory::Drill).await.unwrap();

        store.connect().await.unwrap();

        let value: Option<Record> = store.get("k").await.unwrap();
        assert_eq!(value, Some(Record { id: 1 }));
    }

    #[tokio::test]
    async fn test_connect_fails_when_backend_unreachable() {
        let settings = CacheSettings::new("memory://local", drill_ttl(300), 10).unwrap();
        let store = CacheStore::with_backend(settings, Arc::new(MockCache::new().with_error("down")));

        assert!(matches!(
            store.connect().await,
            Err(DomainError::Connection { .. })
        ));
        assert!(!store.is_connected());
    }

    #[tokio::test]
    async fn test_set_get_round_trip_and_category_scenario() {
        let store = connected_store(300).await;

        store.set("k", &Record { id: 1 }, CacheCategory::Drill).await.unwrap();
        let value: Option<Record> = store.get("k").await.unwrap();
        assert_eq!(value, Some(Record { id: 1 }));

        let result = store.set("k", &Record { id: 2 }, CacheCategory::Simulation).await;
        assert!(matches!(result, Err(DomainError::Configuration { .. })));

        // JSON object keys must be strings, so this map cannot be encoded
        let unencodable: BTreeMap<(u8, u8), u8> = BTreeMap::from([((1, 2), 3)]);
        let result = store.set("k", &unencodable, CacheCategory::Drill).await;
        assert!(matches!(result, Err(DomainError::Serialization { .. })));

        let value: Option<Record> = store.get("k").await.unwrap();
        assert_eq!(value, Some(Record { id: 1 }));
    }

    #[tokio::test]
    async fn test_set_validates_key_and_value() {
        let store = connected_store(300).await;

        let result = store.set("", &Record { id: 1 }, CacheCategory::Drill).await;
        assert!(matches!(result, Err(DomainError::Validation { .. })));

        let absent: Option<Record> = None;
        let result = store.set("k", &absent, CacheCategory::Drill).await;
        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let store = connected_store(1).await;

        store.set("k", &Record { id: 1 }, CacheCategory::Drill).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        let value: Option<Record> = store.get("k").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_undecodable_entry_degrades_to_miss() {
        let settings = CacheSettings::new("memory://local", drill_ttl(300), 10).unwrap();
        let backend = Arc::new(MockCache::new().with_raw_entry("k", "{not json"));
        let store = CacheStore::with_backend(settings, backend);
        store.connect().await.unwrap();

        let value: Option<Record> = store.get("k").await.unwrap();
        assert!(value.is_none());

        let value: Option<Record> = store.get("missing").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_delete_and_clear_are_best_effort() {
        let store = connected_store(300).await;

        store.delete("never-set").await.unwrap();

        store.set("a", &Record { id: 1 }, CacheCategory::Drill).await.unwrap();
        store.set("b", &Record { id: 2 }, CacheCategory::Drill).await.unwrap();
        store.delete("a").await.unwrap();

        let value: Option<Record> = store.get("a").await.unwrap();
        assert!(value.is_none());

        store.clear().await.unwrap();
        let value: Option<Record> = store.get("b").await.unwrap();
        assert!(value.is_none());
    }
}
