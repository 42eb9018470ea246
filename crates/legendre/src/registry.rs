//! Process-lifetime access point for coefficient loaders.
//!
//! The registry owns the configuration, the persistent store and one cache
//! per cached loader kind. Loaders of uncached kinds are built per request.

use once_cell::sync::OnceCell;
use regrid_common::Grid;
use tracing::debug;

use crate::cache::ThreadSafeCache;
use crate::config::LegendreConfig;
use crate::error::Result;
use crate::loader::{open_loader, LegendreLoader, LoaderHandle};
use crate::store::PersistentStore;
use crate::types::{cache_key, CacheStats, LoaderKind};

static GLOBAL: OnceCell<LegendreRegistry> = OnceCell::new();

/// Factory and cache for [`LegendreLoader`]s.
#[derive(Debug)]
pub struct LegendreRegistry {
    config: LegendreConfig,
    store: PersistentStore,
    mapped: ThreadSafeCache<dyn LegendreLoader>,
    shared: ThreadSafeCache<dyn LegendreLoader>,
}

impl LegendreRegistry {
    pub fn new(config: LegendreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: PersistentStore::new(config.data_dir.clone()),
            mapped: ThreadSafeCache::new(config.cache_size),
            shared: ThreadSafeCache::new(config.cache_size),
            config,
        })
    }

    /// The process-wide registry, configured from the environment on first use.
    pub fn global() -> Result<&'static LegendreRegistry> {
        GLOBAL.get_or_try_init(|| LegendreRegistry::new(LegendreConfig::from_env()?))
    }

    pub fn config(&self) -> &LegendreConfig {
        &self.config
    }

    pub fn store(&self) -> &PersistentStore {
        &self.store
    }

    fn cache_for(&self, kind: LoaderKind) -> Option<&ThreadSafeCache<dyn LegendreLoader>> {
        if !kind.is_cached() {
            return None;
        }
        match kind {
            LoaderKind::SharedMemory => Some(&self.shared),
            _ => Some(&self.mapped),
        }
    }

    /// Cached loader for `truncation` and `grid` with the configured kind, if any.
    pub fn polynomials(&self, truncation: usize, grid: &dyn Grid) -> Option<LoaderHandle> {
        self.cache_for(self.config.loader)?
            .get(&cache_key(truncation, &grid.coeff_info()))
    }

    /// Offer `loader` to the cache for its kind and return the handle to use.
    ///
    /// When another loader was cached first, that one is returned instead.
    pub fn add_polynomials(
        &self,
        truncation: usize,
        grid: &dyn Grid,
        loader: LoaderHandle,
    ) -> LoaderHandle {
        match self.cache_for(loader.kind()) {
            Some(cache) => cache.put(&cache_key(truncation, &grid.coeff_info()), loader),
            None => loader,
        }
    }

    /// Loader for `truncation` and `grid` using the configured kind.
    pub fn loader(&self, truncation: usize, grid: &dyn Grid) -> Result<LoaderHandle> {
        self.loader_of_kind(self.config.loader, truncation, grid)
    }

    /// Loader of an explicit kind: make sure the file exists, reuse a cached
    /// loader if there is one, otherwise build and cache a new one.
    pub fn loader_of_kind(
        &self,
        kind: LoaderKind,
        truncation: usize,
        grid: &dyn Grid,
    ) -> Result<LoaderHandle> {
        let path = self.store.ensure_exists(truncation, grid)?;
        let key = cache_key(truncation, &grid.coeff_info());

        if let Some(cache) = self.cache_for(kind) {
            if let Some(found) = cache.get(&key) {
                debug!(key = %key, kind = %kind, "Legendre loader cache hit");
                return Ok(found);
            }
        }

        let loader = open_loader(kind, truncation, grid.nshalf(), &path, &self.config)?;
        Ok(match self.cache_for(kind) {
            Some(cache) => cache.put(&key, loader),
            None => loader,
        })
    }

    /// Drop every cached loader.
    pub fn clear(&self) {
        self.mapped.clear();
        self.shared.clear();
    }

    /// Statistics of the cache for `kind`.
    pub fn cache_stats(&self, kind: LoaderKind) -> Option<CacheStats> {
        self.cache_for(kind).map(ThreadSafeCache::stats)
    }
}
