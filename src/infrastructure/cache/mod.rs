//! Cache infrastructure - backends and the cache store

mod in_memory;
mod redis;
mod store;

pub use in_memory::{InMemoryCache, InMemoryCacheConfig};
pub use redis::{RedisCache, RedisCacheConfig};
pub use store::{CacheBackendKind, CacheSettings, CacheStore};
