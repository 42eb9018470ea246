//! Associated Legendre Polynomial Coefficients for Spectral Transforms
//!
//! This crate generates, stores and serves the Legendre coefficient rows
//! needed to move fields between spherical-harmonic (spectral) space and
//! grid-point space. It provides:
//!
//! - **Generation**: normalised P(n,m) rows for one latitude or a batch
//! - **Persistent store**: one immutable file per (truncation, grid), published atomically
//! - **Loaders**: recompute, read, memory-map or share the file across processes
//! - **Caching**: reference-count aware process cache and a global registry
//! - **Transforms**: Legendre synthesis/analysis plus the Fourier stage
//!
//! # Architecture
//!
//! ```text
//! LegendreRegistry::loader(T, grid)
//!      │
//!      ├─► PersistentStore::ensure_exists
//!      │         │
//!      │         ├─► File present, size checked: reuse
//!      │         │
//!      │         └─► Missing: generate rows (rayon), write temp, rename
//!      │
//!      ├─► ThreadSafeCache lookup (MemoryMap / SharedMemory)
//!      │
//!      └─► open_loader ──► OnFly | ReadFromFile | MemoryMap | SharedMemory
//!               │
//!               ▼
//!      SpectralToGrid / GridToSpectral
//! ```
//!
//! # Example
//!
//! ```ignore
//! use legendre::{spectral_to_grid, LegendreRegistry};
//! use regrid_common::RegularGaussian;
//!
//! let registry = LegendreRegistry::global()?;
//! let grid = RegularGaussian::new(80)?;
//! let loader = registry.loader(159, &grid)?;
//! let values = spectral_to_grid(loader.as_ref(), &grid, &coefficients, false, None)?;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod generator;
pub mod loader;
pub mod platform;
pub mod registry;
pub mod store;
pub mod transform;
pub mod types;

// Re-export commonly used types at crate root
pub use cache::ThreadSafeCache;
pub use config::{LegendreConfig, DEFAULT_CACHE_SIZE, DEFAULT_LOAD_BUFFER_BYTES};
pub use error::{LegendreError, Result};
pub use generator::{generate_row, generate_rows, row_length, row_offset, spectral_length};
pub use loader::{
    load_shared_memory, open_loader, unload_shared_memory, LegendreLoader, LoaderHandle,
    MemoryMapLoader, OnFlyLoader, ReadFromFileLoader, Row, SharedMemoryLoader,
    SharedMemoryOptions,
};
pub use registry::LegendreRegistry;
pub use store::PersistentStore;
pub use transform::{
    grid_to_spectral, spectral_to_grid, GridToSpectral, LatitudeRow, SpectralToGrid,
};
pub use types::{cache_key, CacheStats, LoaderKind};
