//! Backend that never caches anything
//!
//! Reads always miss, writes and invalidations always succeed. Wiring it in
//! turns caching off without touching any call site.

use std::time::Duration;

use async_trait::async_trait;

use crate::{Availability, CacheBackend, CacheRecord, CacheResult};

#[derive(Debug, Default)]
pub struct NullBackend {
    availability: Availability,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for NullBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    fn availability(&self) -> &Availability {
        &self.availability
    }

    async fn get(&self, _key: &str) -> CacheResult<Option<CacheRecord>> {
        self.availability.ensure_enabled()?;
        Ok(None)
    }

    async fn set(
        &self,
        _key: &str,
        _record: CacheRecord,
        _tags: &[String],
        _ttl: Option<Duration>,
    ) -> CacheResult<bool> {
        self.availability.ensure_enabled()?;
        Ok(true)
    }

    async fn invalidate_tags(&self, _tags: &[String]) -> CacheResult<()> {
        self.availability.ensure_enabled()
    }

    async fn reset(&self) -> CacheResult<()> {
        self.availability.ensure_enabled()
    }
}
