//! Loader strategies serving coefficient rows from a coefficient file.
//!
//! All loaders are built after the file has been validated by
//! [`PersistentStore::ensure_exists`](crate::store::PersistentStore::ensure_exists)
//! and expose the same [`LegendreLoader`] interface:
//!
//! | kind           | memory         | per row cost      | shared across processes |
//! |----------------|----------------|-------------------|-------------------------|
//! | OnFly          | one row        | O(T^2) compute    | no                      |
//! | ReadFromFile   | one row        | one `read`        | no                      |
//! | MemoryMap      | whole file     | none              | via page cache          |
//! | SharedMemory   | whole file     | none              | yes, loaded once        |

mod memory_map;
mod on_fly;
mod read_file;
mod shared_memory;

use std::fmt;
use std::ops::Deref;
use std::path::Path;
use std::sync::{Arc, MutexGuard};

use crate::config::LegendreConfig;
use crate::error::{LegendreError, Result};
use crate::generator::row_length;
use crate::types::LoaderKind;

pub use memory_map::MemoryMapLoader;
pub use on_fly::{OnFlyLoader, Scratch};
pub use read_file::{ReadFromFileLoader, ReadState};
pub use shared_memory::{
    load_shared_memory, unload_shared_memory, SharedMemoryLoader, SharedMemoryOptions,
};

/// Shared handle to a loader.
pub type LoaderHandle = Arc<dyn LegendreLoader>;

/// Access to the coefficient rows of one (truncation, grid) pair.
pub trait LegendreLoader: Send + Sync + fmt::Debug {
    fn kind(&self) -> LoaderKind;

    fn truncation(&self) -> usize;

    /// Number of rows (northern latitudes including the equator).
    fn rows(&self) -> usize;

    /// Path of the coefficient file backing this loader.
    fn path(&self) -> &Path;

    /// Values per row.
    fn row_length(&self) -> usize {
        row_length(self.truncation())
    }

    /// Row for the northern latitude `latitude`, stored at `row_index`.
    ///
    /// File-backed loaders use only `row_index`; OnFly uses only `latitude`.
    fn row_at(&self, latitude: f64, row_index: usize) -> Result<Row<'_>>;

    /// All rows, when the whole file is resident in memory.
    fn whole_buffer(&self) -> Option<&[f64]> {
        None
    }
}

/// One coefficient row, borrowed from a resident buffer or from a loader's
/// private scratch space. The scratch lock is held until the row is dropped.
pub enum Row<'a> {
    Resident(&'a [f64]),
    Computed(MutexGuard<'a, Scratch>),
    Read(MutexGuard<'a, ReadState>),
}

impl Deref for Row<'_> {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        match self {
            Row::Resident(row) => row,
            Row::Computed(guard) => guard.row(),
            Row::Read(guard) => guard.row(),
        }
    }
}

impl fmt::Debug for Row<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Row").field("len", &self.len()).finish()
    }
}

/// Slice row `row_index` out of a resident buffer.
pub(crate) fn resident_row<'a>(
    buffer: &'a [f64],
    truncation: usize,
    row_index: usize,
    path: &Path,
) -> Result<Row<'a>> {
    let len = row_length(truncation);
    let range = row_index
        .checked_mul(len)
        .and_then(|start| Some(start..start.checked_add(len)?))
        .ok_or_else(|| {
            LegendreError::wrong_value(format!(
                "row {} of {} values overflows the address space",
                row_index, len
            ))
        })?;
    buffer
        .get(range)
        .map(Row::Resident)
        .ok_or_else(|| {
            LegendreError::read_error(
                path,
                format!("row {} beyond {} rows", row_index, buffer.len() / len),
            )
        })
}

/// Build a loader of the given kind for an existing, validated file.
pub fn open_loader(
    kind: LoaderKind,
    truncation: usize,
    nshalf: usize,
    path: &Path,
    config: &LegendreConfig,
) -> Result<LoaderHandle> {
    let loader: LoaderHandle = match kind {
        LoaderKind::OnFly => Arc::new(OnFlyLoader::new(truncation, nshalf, path)),
        LoaderKind::ReadFromFile => Arc::new(ReadFromFileLoader::open(truncation, nshalf, path)?),
        LoaderKind::MemoryMap => Arc::new(MemoryMapLoader::open(truncation, nshalf, path)?),
        LoaderKind::SharedMemory => Arc::new(SharedMemoryLoader::open(
            truncation,
            nshalf,
            path,
            SharedMemoryOptions::from(config),
        )?),
    };
    tracing::debug!(kind = %kind, path = %path.display(), truncation, "Opened Legendre loader");
    Ok(loader)
}
