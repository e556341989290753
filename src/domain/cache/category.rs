//! Cache categories and their TTL registry

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Category of a cache entry; each category carries its own TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheCategory {
    Drill,
    Simulation,
    Feedback,
}

impl CacheCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drill => "drill",
            Self::Simulation => "simulation",
            Self::Feedback => "feedback",
        }
    }
}

impl fmt::Display for CacheCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drill" => Ok(Self::Drill),
            "simulation" => Ok(Self::Simulation),
            "feedback" => Ok(Self::Feedback),
            _ => Err(DomainError::configuration(format!(
                "Unknown cache category: {}. Valid categories: drill, simulation, feedback",
                s
            ))),
        }
    }
}

/// Registered TTL per category, validated at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlPolicy {
    ttls: HashMap<CacheCategory, Duration>,
}

impl TtlPolicy {
    /// Builds a policy from TTLs in seconds. Empty maps and zero TTLs are rejected.
    pub fn new(ttl_secs: HashMap<CacheCategory, u64>) -> Result<Self, DomainError> {
        if ttl_secs.is_empty() {
            return Err(DomainError::configuration(
                "At least one cache category TTL must be registered",
            ));
        }

        if let Some((category, _)) = ttl_secs.iter().find(|(_, secs)| **secs == 0) {
            return Err(DomainError::configuration(format!(
                "TTL for cache category '{}' must be a positive number of seconds",
                category
            )));
        }

        let ttls = ttl_secs
            .into_iter()
            .map(|(category, secs)| (category, Duration::from_secs(secs)))
            .collect();

        Ok(Self { ttls })
    }

    /// TTL for a category, or a configuration error if none was registered
    pub fn ttl_for(&self, category: CacheCategory) -> Result<Duration, DomainError> {
        self.ttls.get(&category).copied().ok_or_else(|| {
            DomainError::configuration(format!(
                "No TTL registered for cache category '{}'",
                category
            ))
        })
    }

    /// Longest registered TTL, used as the backend-wide upper bound
    pub fn max_ttl(&self) -> Duration {
        self.ttls.values().copied().max().unwrap_or_default()
    }
}
