//! Cache domain - TTL-scoped caching abstraction

mod category;
mod repository;

pub use category::{CacheCategory, TtlPolicy};
pub use repository::Cache;

#[cfg(test)]
pub use repository::mock::MockCache;
