//! Request-scoped cache handle
//!
//! A [`ResponseCache`] is bound to one derived key and to the shared backend.
//! Handlers call [`ResponseCache::exists`], serve [`ResponseCache::data`] on a
//! hit, and otherwise compute the response and hand it to
//! [`ResponseCache::set`] together with the tags that should invalidate it.
//! The no-op variant has the same surface but never reads or writes, so
//! handlers don't need to branch on whether caching applies.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::{CacheBackend, CacheRecord, CacheResult};

/// Per-write options for [`ResponseCache::set`]
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    ttl: Option<Duration>,
    tags: Vec<String>,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the handle's TTL for this write.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

struct Binding {
    backend: Arc<dyn CacheBackend>,
    key: String,
    ttl: Option<Duration>,
}

/// Cache handle for a single request
pub struct ResponseCache {
    binding: Option<Binding>,
    record: Option<CacheRecord>,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("key", &self.key())
            .field("backend", &self.binding.as_ref().map(|b| b.backend.name()))
            .field("exists", &self.exists())
            .finish()
    }
}

impl ResponseCache {
    /// Bind a handle to `key`. `ttl: None` defers to the backend default.
    pub fn new(backend: Arc<dyn CacheBackend>, key: impl Into<String>, ttl: Option<Duration>) -> Self {
        Self {
            binding: Some(Binding {
                backend,
                key: key.into(),
                ttl,
            }),
            record: None,
        }
    }

    /// A handle that never reads or writes.
    pub fn noop() -> Self {
        Self {
            binding: None,
            record: None,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.binding.is_none()
    }

    /// The derived key, `None` for the no-op handle.
    pub fn key(&self) -> Option<&str> {
        self.binding.as_ref().map(|b| b.key.as_str())
    }

    /// Load the stored record, replacing whatever an earlier fetch found.
    pub async fn fetch(&mut self) -> CacheResult<()> {
        if let Some(binding) = &self.binding {
            self.record = binding.backend.get(&binding.key).await?;
        }
        Ok(())
    }

    /// Whether the last [`fetch`](Self::fetch) found a record.
    pub fn exists(&self) -> bool {
        self.record.is_some()
    }

    pub fn record(&self) -> Option<&CacheRecord> {
        self.record.as_ref()
    }

    pub fn data(&self) -> Option<&Value> {
        self.record.as_ref().map(|r| &r.data)
    }

    /// Decode the cached payload, `Ok(None)` on a miss.
    pub fn data_as<T: DeserializeOwned>(&self) -> CacheResult<Option<T>> {
        self.record.as_ref().map(|record| record.payload_as::<T>()).transpose()
    }

    /// Store `payload` under this handle's key.
    ///
    /// Returns the backend's durability flag; the no-op handle stores nothing
    /// and returns `false`.
    pub async fn set<T: Serialize + ?Sized>(&self, payload: &T, options: SetOptions) -> CacheResult<bool> {
        let Some(binding) = &self.binding else {
            return Ok(false);
        };

        let record = CacheRecord::new(payload)?;
        let ttl = options.ttl.or(binding.ttl);
        debug!(key = binding.key.as_str(), tags = ?options.tags, "Storing response");
        binding
            .backend
            .set(&binding.key, record, &options.tags, ttl)
            .await
    }
}
