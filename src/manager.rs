//! Process-wide entry point for request caching
//!
//! A [`CacheManager`] owns the single active backend and the request policy.
//! It is built once at startup and shared with whatever serves requests.
//! Per request, [`CacheManager::from_request`] yields a [`ResponseCacheFactory`]
//! which turns the request head into a ready [`ResponseCache`].

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use http::request::Parts;
use tracing::{debug, info};

use crate::{CacheBackend, CacheError, CacheResult, KeyPolicy, ManagerConfig, ResponseCache};

pub struct CacheManager {
    backend: OnceLock<Arc<dyn CacheBackend>>,
    config: ManagerConfig,
    policy: KeyPolicy,
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("backend", &self.backend.get().map(|b| b.name()))
            .field("config", &self.config)
            .finish()
    }
}

impl CacheManager {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend: OnceLock::from(backend),
            ..Self::unattached()
        }
    }

    /// A manager whose backend is attached later with [`attach`](Self::attach).
    pub fn unattached() -> Self {
        let config = ManagerConfig::default();
        Self {
            backend: OnceLock::new(),
            policy: KeyPolicy::from(&config),
            config,
        }
    }

    /// Attach the backend. Only the first call succeeds.
    pub fn attach(&self, backend: Arc<dyn CacheBackend>) -> CacheResult<()> {
        let name = backend.name();
        self.backend.set(backend).map_err(|_| {
            CacheError::Configuration("a cache backend is already attached".to_owned())
        })?;
        info!(backend = name, "Cache backend attached");
        Ok(())
    }

    pub fn configure(&mut self, config: ManagerConfig) {
        self.policy = KeyPolicy::from(&config);
        self.config = config;
    }

    pub fn with_config(mut self, config: ManagerConfig) -> Self {
        self.configure(config);
        self
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn policy(&self) -> &KeyPolicy {
        &self.policy
    }

    /// The attached backend, or a configuration error if none is attached yet.
    pub fn backend(&self) -> CacheResult<&Arc<dyn CacheBackend>> {
        self.backend.get().ok_or_else(|| {
            CacheError::Configuration("no cache backend attached to the manager".to_owned())
        })
    }

    pub fn enable(&self) -> CacheResult<()> {
        self.backend()?.enable();
        Ok(())
    }

    pub fn disable(&self) -> CacheResult<()> {
        self.backend()?.disable();
        Ok(())
    }

    pub fn is_enabled(&self) -> CacheResult<bool> {
        Ok(self.backend()?.is_enabled())
    }

    pub async fn invalidate_tag(&self, tag: &str) -> CacheResult<()> {
        self.backend()?.invalidate_tag(tag).await
    }

    pub async fn invalidate_tags(&self, tags: &[String]) -> CacheResult<()> {
        self.backend()?.invalidate_tags(tags).await
    }

    pub async fn reset(&self) -> CacheResult<()> {
        self.backend()?.reset().await
    }

    /// Capture what a request needs to build its handle. Performs no I/O.
    ///
    /// `ttl` overrides the manager's default for handles built by the factory.
    pub fn from_request(&self, ttl: Option<Duration>) -> CacheResult<ResponseCacheFactory> {
        Ok(ResponseCacheFactory {
            backend: Arc::clone(self.backend()?),
            policy: self.policy.clone(),
            ttl: ttl.or(self.config.ttl),
        })
    }
}

/// Builds a [`ResponseCache`] from a request head
#[derive(Clone)]
pub struct ResponseCacheFactory {
    backend: Arc<dyn CacheBackend>,
    policy: KeyPolicy,
    ttl: Option<Duration>,
}

impl std::fmt::Debug for ResponseCacheFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCacheFactory")
            .field("backend", &self.backend.name())
            .field("policy", &self.policy)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl ResponseCacheFactory {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn key_for(&self, request: &Parts) -> String {
        self.policy.derive(request)
    }

    /// Resolve the handle for `request`.
    ///
    /// Disabled backends and requests with an `Authorization` header get the
    /// no-op handle. A request carrying the no-cache parameter gets a bound
    /// handle that is not fetched, so the handler recomputes and overwrites.
    pub async fn resolve(&self, request: &Parts) -> CacheResult<ResponseCache> {
        if !self.backend.is_enabled() {
            debug!(backend = self.backend.name(), "Cache disabled, skipping");
            return Ok(ResponseCache::noop());
        }

        if self.policy.bypasses(request) {
            debug!(path = request.uri.path(), "Authorization header present, skipping cache");
            return Ok(ResponseCache::noop());
        }

        let key = self.policy.derive(request);
        if self.policy.forces_refresh(request) {
            debug!(key = key.as_str(), "Refresh requested, not reading cache");
            return Ok(ResponseCache::new(Arc::clone(&self.backend), key, self.ttl));
        }

        let mut handle = ResponseCache::new(Arc::clone(&self.backend), key, self.ttl);
        handle.fetch().await?;
        debug!(key = ?handle.key(), hit = handle.exists(), "Cache lookup");
        Ok(handle)
    }
}
