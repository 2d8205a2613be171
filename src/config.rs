//! Cache configuration
//!
//! Plain structs with sensible defaults. All of them deserialize with
//! `#[serde(default)]`, so a host application can embed them in its own
//! settings file and only spell out what differs. Durations are whole seconds.

use std::time::Duration;

use serde::Deserialize;

/// Fallback TTL used by every backend when neither the write nor the
/// configuration names one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

const DEFAULT_MAX_CAPACITY: u64 = 50_000;
const DEFAULT_TAG_COMPACTION_THRESHOLD: usize = 10_000;
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_PREFIX: &str = "tagcache";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_NO_CACHE_PARAM: &str = "no-cache";

/// Configuration for the in-process backend
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Maximum number of entries kept before LRU eviction kicks in
    pub max_capacity: u64,
    /// TTL applied to writes that don't carry their own
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
    /// Number of tagged writes between two tag index compactions (0 disables)
    pub tag_compaction_threshold: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_capacity: DEFAULT_MAX_CAPACITY,
            ttl: DEFAULT_TTL,
            tag_compaction_threshold: DEFAULT_TAG_COMPACTION_THRESHOLD,
        }
    }
}

impl MemoryConfig {
    pub fn with_max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_tag_compaction_threshold(mut self, threshold: usize) -> Self {
        self.tag_compaction_threshold = threshold;
        self
    }
}

/// How [`crate::RedisBackend::reset`] enumerates and removes keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetStrategy {
    /// A Lua script scans and unlinks on the server in one call.
    #[default]
    ServerScript,
    /// Client-driven `SCAN` pages followed by batched `UNLINK`s, for stores
    /// without scripting. Keys written while the scan runs may survive it.
    ClientScan,
}

/// Configuration for the Redis backend
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Connection URL, including credentials and database if needed
    pub url: String,
    /// Namespace every physical key lives under (must not be empty)
    pub prefix: String,
    /// Deployment identifier nested under the prefix
    pub app_version: Option<String>,
    /// TTL applied to writes that don't carry their own
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
    /// Upper bound for establishing the first connection
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,
    pub reset_strategy: ResetStrategy,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REDIS_URL.to_owned(),
            prefix: DEFAULT_PREFIX.to_owned(),
            app_version: None,
            ttl: DEFAULT_TTL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reset_strategy: ResetStrategy::default(),
        }
    }
}

impl RedisConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_app_version(mut self, app_version: impl Into<String>) -> Self {
        self.app_version = Some(app_version.into());
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_reset_strategy(mut self, strategy: ResetStrategy) -> Self {
        self.reset_strategy = strategy;
        self
    }
}

/// Defaults applied by [`crate::CacheManager`] to the handles it produces
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Handle TTL; `None` defers to the backend's own default
    #[serde(with = "duration_secs_opt")]
    pub ttl: Option<Duration>,
    /// Query parameter that forces a refresh of the cached response
    pub no_cache_param: String,
    /// Request headers whose values take part in the cache key
    pub vary_headers: Vec<String>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            ttl: None,
            no_cache_param: DEFAULT_NO_CACHE_PARAM.to_owned(),
            vary_headers: Vec::new(),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

mod duration_secs_opt {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs: Option<u64> = Option::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
