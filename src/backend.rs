//! The contract every cache backend fulfils
//!
//! Backends are shared process-wide behind an `Arc<dyn CacheBackend>`. Each
//! one owns an [`Availability`] switch and checks it before touching its
//! store, so a disabled backend fails every accessor with
//! [`CacheError::Disabled`] no matter which implementation is wired in.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::{CacheError, CacheRecord, CacheResult};

/// Enable/disable switch shared by all backends
#[derive(Debug)]
pub struct Availability {
    enabled: AtomicBool,
}

impl Default for Availability {
    fn default() -> Self {
        Self {
            enabled: AtomicBool::new(true),
        }
    }
}

impl Availability {
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Fail with [`CacheError::Disabled`] unless the switch is on.
    pub fn ensure_enabled(&self) -> CacheResult<()> {
        if self.is_enabled() {
            Ok(())
        } else {
            Err(CacheError::Disabled)
        }
    }
}

/// Storage contract for tag-indexed cache records.
///
/// Implementations must call [`Availability::ensure_enabled`] before doing
/// any work in `get`, `set`, `invalidate_tags` and `reset`.
#[async_trait]
pub trait CacheBackend: Send + Sync + 'static {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    fn availability(&self) -> &Availability;

    fn enable(&self) {
        self.availability().enable();
    }

    fn disable(&self) {
        self.availability().disable();
    }

    fn is_enabled(&self) -> bool {
        self.availability().is_enabled()
    }

    /// Look up a record. A missing key is `Ok(None)`, never an error.
    async fn get(&self, key: &str) -> CacheResult<Option<CacheRecord>>;

    /// Store `record` under `key` and file the key under each tag.
    ///
    /// `ttl: None` uses the backend default. Returns whether the write is
    /// durable by the backend's own guarantee.
    ///
    /// Expiry granularity is backend specific: the memory backend honours
    /// any duration, so `Duration::ZERO` is stored already expired, while
    /// Redis rounds down to whole seconds with a floor of one second.
    async fn set(
        &self,
        key: &str,
        record: CacheRecord,
        tags: &[String],
        ttl: Option<Duration>,
    ) -> CacheResult<bool>;

    /// Drop every record filed under `tag`. Unknown tags are a no-op.
    async fn invalidate_tag(&self, tag: &str) -> CacheResult<()> {
        self.invalidate_tags(&[tag.to_owned()]).await
    }

    /// Drop every record filed under any of `tags`.
    async fn invalidate_tags(&self, tags: &[String]) -> CacheResult<()>;

    /// Remove everything this backend instance is responsible for.
    async fn reset(&self) -> CacheResult<()>;
}
