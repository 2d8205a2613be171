//! In-process backend built on Moka
//!
//! Entries live in a bounded Moka cache with LRU eviction and per-entry
//! expiry. A side index maps each tag to the keys written with it. The index
//! is only pruned on invalidation and by periodic compaction, so it may name
//! keys that already expired or were evicted; invalidating those deletes
//! nothing and is harmless.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::{Availability, CacheBackend, CacheRecord, CacheResult, MemoryConfig};

#[derive(Clone)]
struct Entry {
    record: Arc<CacheRecord>,
    ttl: Duration,
}

/// Expiry driven by the TTL carried on each entry; overwrites restart it.
struct EntryTtl;

impl Expiry<String, Entry> for EntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

#[derive(Default)]
struct TagIndex {
    keys_by_tag: HashMap<String, Vec<String>>,
    tagged_writes: usize,
}

impl TagIndex {
    /// Drop keys that are no longer stored and tags left without keys.
    fn compact(&mut self, entries: &Cache<String, Entry>) -> usize {
        let mut pruned = 0;
        self.keys_by_tag.retain(|_, keys| {
            let before = keys.len();
            keys.sort_unstable();
            keys.dedup();
            keys.retain(|key| entries.contains_key(key));
            pruned += before - keys.len();
            !keys.is_empty()
        });
        self.tagged_writes = 0;
        pruned
    }
}

/// One store together with its tag index. Replaced wholesale on reset.
struct Generation {
    config: MemoryConfig,
    entries: Cache<String, Entry>,
    // Held across the entry write/removal so a set and an invalidation of the
    // same tag never interleave.
    tags: Mutex<TagIndex>,
}

impl Generation {
    fn new(config: MemoryConfig) -> Self {
        let entries = Cache::builder()
            .max_capacity(config.max_capacity)
            .eviction_policy(EvictionPolicy::lru())
            .expire_after(EntryTtl)
            .build();

        Self {
            config,
            entries,
            tags: Mutex::new(TagIndex::default()),
        }
    }
}

/// Bounded, time-expiring in-process backend with a tag index
pub struct MemoryBackend {
    availability: Availability,
    current: RwLock<Arc<Generation>>,
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("enabled", &self.availability.is_enabled())
            .finish_non_exhaustive()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

impl MemoryBackend {
    pub fn new(config: MemoryConfig) -> Self {
        debug!(
            max_capacity = config.max_capacity,
            ttl_seconds = config.ttl.as_secs(),
            "In-memory cache backend created"
        );

        Self {
            availability: Availability::default(),
            current: RwLock::new(Arc::new(Generation::new(config))),
        }
    }

    /// Rebuild the store with new limits. Current contents are dropped.
    pub async fn reconfigure(&self, config: MemoryConfig) {
        debug!(
            max_capacity = config.max_capacity,
            ttl_seconds = config.ttl.as_secs(),
            "In-memory cache backend reconfigured"
        );
        *self.current.write().await = Arc::new(Generation::new(config));
    }

    /// Prune tag index entries whose keys are gone. Returns the number of
    /// key references removed.
    pub async fn compact_tag_index(&self) -> usize {
        let generation = self.generation().await;
        let mut index = generation.tags.lock().await;
        let pruned = index.compact(&generation.entries);
        debug!(pruned, tags = index.keys_by_tag.len(), "Tag index compacted");
        pruned
    }

    /// Keys currently filed under `tag`, duplicates included.
    pub async fn tagged_keys(&self, tag: &str) -> Vec<String> {
        let generation = self.generation().await;
        let index = generation.tags.lock().await;
        index.keys_by_tag.get(tag).cloned().unwrap_or_default()
    }

    async fn generation(&self) -> Arc<Generation> {
        Arc::clone(&*self.current.read().await)
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn availability(&self) -> &Availability {
        &self.availability
    }

    async fn get(&self, key: &str) -> CacheResult<Option<CacheRecord>> {
        self.availability.ensure_enabled()?;
        let generation = self.generation().await;

        match generation.entries.get(key).await {
            Some(entry) => {
                debug!(key, "Cache HIT (memory)");
                Ok(Some(CacheRecord::clone(&entry.record)))
            }
            None => {
                debug!(key, "Cache MISS (memory)");
                Ok(None)
            }
        }
    }

    async fn set(
        &self,
        key: &str,
        record: CacheRecord,
        tags: &[String],
        ttl: Option<Duration>,
    ) -> CacheResult<bool> {
        self.availability.ensure_enabled()?;
        let generation = self.generation().await;
        let ttl = ttl.unwrap_or(generation.config.ttl);
        let entry = Entry {
            record: Arc::new(record),
            ttl,
        };

        if tags.is_empty() {
            generation.entries.insert(key.to_owned(), entry).await;
        } else {
            let mut index = generation.tags.lock().await;
            generation.entries.insert(key.to_owned(), entry).await;

            for tag in tags {
                debug!(key, tag = tag.as_str(), "Adding key to tag");
                index
                    .keys_by_tag
                    .entry(tag.clone())
                    .or_default()
                    .push(key.to_owned());
            }
            index.tagged_writes += 1;

            let threshold = generation.config.tag_compaction_threshold;
            if threshold > 0 && index.tagged_writes >= threshold {
                let pruned = index.compact(&generation.entries);
                debug!(pruned, "Tag index compacted after {} tagged writes", threshold);
            }
        }

        debug!(key, ttl_seconds = ttl.as_secs(), "Cache SET (memory)");
        Ok(true)
    }

    async fn invalidate_tags(&self, tags: &[String]) -> CacheResult<()> {
        self.availability.ensure_enabled()?;
        let generation = self.generation().await;
        let mut index = generation.tags.lock().await;

        for tag in tags {
            let Some(keys) = index.keys_by_tag.remove(tag) else {
                debug!(tag = tag.as_str(), "Invalidating unknown tag, nothing to do");
                continue;
            };

            futures::future::join_all(keys.iter().map(|key| generation.entries.invalidate(key)))
                .await;
            debug!(tag = tag.as_str(), ?keys, "Tag invalidated (memory)");
        }

        Ok(())
    }

    async fn reset(&self) -> CacheResult<()> {
        self.availability.ensure_enabled()?;
        let mut current = self.current.write().await;
        let config = current.config.clone();
        *current = Arc::new(Generation::new(config));
        debug!("In-memory cache reset");
        Ok(())
    }
}
