//! tagcache - Tag-indexed response caching
//!
//! This library caches computed responses under request-derived keys and
//! lets writers invalidate groups of them by tag:
//! - `NullBackend`: never stores anything, keeps call sites unconditional
//! - `MemoryBackend`: bounded, expiring in-process Moka store
//! - `RedisBackend`: shared store, namespaced by prefix and app version
//!
//! A `CacheManager` owns the active backend and turns request heads into
//! `ResponseCache` handles. Handlers check the handle, serve a hit, or
//! compute the response and store it together with its tags.

mod backend;
mod config;
mod error;
mod handle;
mod keys;
mod manager;
mod memory;
mod null;
mod record;
mod redis;

pub use backend::{Availability, CacheBackend};
pub use config::{DEFAULT_TTL, ManagerConfig, MemoryConfig, RedisConfig, ResetStrategy};
pub use error::{CacheError, CacheResult};
pub use handle::{ResponseCache, SetOptions};
pub use keys::KeyPolicy;
pub use manager::{CacheManager, ResponseCacheFactory};
pub use memory::MemoryBackend;
pub use null::NullBackend;
pub use record::CacheRecord;
pub use self::redis::{Namespace, RedisBackend, UNLINK_BATCH_SIZE};

// Re-export async_trait for backend implementers
pub use async_trait::async_trait;
