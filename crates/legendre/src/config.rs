//! Configuration for coefficient storage and loading.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{LegendreError, Result};
use crate::types::LoaderKind;

/// Default number of loaders kept per cache.
pub const DEFAULT_CACHE_SIZE: usize = 12;

/// Default chunk size used when copying a file into shared memory.
pub const DEFAULT_LOAD_BUFFER_BYTES: usize = 10 * 1024 * 1024;

/// Configuration for the Legendre coefficient subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegendreConfig {
    /// Strategy used to serve coefficient rows.
    pub loader: LoaderKind,

    /// Directory holding `ecregrid_cf_t<T>_<grid>` files.
    pub data_dir: PathBuf,

    /// Maximum number of loaders kept in each process cache.
    pub cache_size: usize,

    /// Chunk size for streaming a file into shared memory.
    pub load_buffer_bytes: usize,

    /// Override of the per-segment shared-memory maximum (bytes).
    pub shm_segment_max: Option<usize>,

    /// Remove shared memory from the host when the loader is dropped.
    pub unload_on_drop: bool,
}

impl Default for LegendreConfig {
    fn default() -> Self {
        Self {
            loader: LoaderKind::default(),
            data_dir: std::env::temp_dir().join("legendre_polynomials"),
            cache_size: DEFAULT_CACHE_SIZE,
            load_buffer_bytes: DEFAULT_LOAD_BUFFER_BYTES,
            shm_segment_max: None,
            unload_on_drop: false,
        }
    }
}

impl LegendreConfig {
    /// Config for the given data directory, defaults elsewhere.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Select a loader by name, honouring the `tmp-` aliases.
    pub fn set_loader(&mut self, name: &str) -> Result<()> {
        self.loader = name.parse()?;
        self.unload_on_drop = LoaderKind::is_temporary_alias(name);
        Ok(())
    }

    /// Load configuration from environment variables.
    ///
    /// Unparseable numeric values are ignored; an unknown loader name is an
    /// error.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("LEGENDRE_LOADER") {
            config.set_loader(&val)?;
        }

        if let Ok(val) = std::env::var("LEGENDRE_DATA_DIR") {
            if !val.is_empty() {
                config.data_dir = PathBuf::from(val);
            }
        }

        if let Ok(val) = std::env::var("LEGENDRE_CACHE_SIZE") {
            if let Ok(size) = val.parse() {
                config.cache_size = size;
            }
        }

        if let Ok(val) = std::env::var("LEGENDRE_LOAD_BUFFER_BYTES") {
            if let Ok(size) = val.parse() {
                config.load_buffer_bytes = size;
            }
        }

        if let Ok(val) = std::env::var("LEGENDRE_SHM_SEGMENT_MAX") {
            if let Ok(size) = val.parse() {
                config.shm_segment_max = Some(size);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.cache_size == 0 {
            return Err(LegendreError::Config("cache_size must be > 0".to_string()));
        }

        if self.load_buffer_bytes == 0 {
            return Err(LegendreError::Config(
                "load_buffer_bytes must be > 0".to_string(),
            ));
        }

        if self.shm_segment_max == Some(0) {
            return Err(LegendreError::Config(
                "shm_segment_max must be > 0".to_string(),
            ));
        }

        if self.unload_on_drop && self.loader != LoaderKind::SharedMemory {
            return Err(LegendreError::Config(format!(
                "unload_on_drop only applies to shared memory, loader is {}",
                self.loader
            )));
        }

        Ok(())
    }
}
