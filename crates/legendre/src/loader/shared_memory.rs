//! Coefficients held in System V shared memory, loaded once per host.
//!
//! Layout of the region for a file of `size` bytes:
//!
//! ```text
//! [ file bytes | padding to page | trailer { ready, magic, path[1024] } | padding ]
//! ```
//!
//! The first process to take the semaphore for a file copies it in and sets
//! `ready`; every later attacher checks the trailer and reuses the data.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{fence, Ordering};
use std::time::Instant;

use tracing::{debug, info, warn};

use super::{resident_row, LegendreLoader, Row};
use crate::config::{LegendreConfig, DEFAULT_LOAD_BUFFER_BYTES};
use crate::error::{LegendreError, Result};
use crate::platform::{self, remove_shared_region, page_size, round_up, Semaphore, SharedRegion};
use crate::store::{check_size, PersistentStore};
use crate::types::LoaderKind;

const MAGIC: i32 = 1_234_567_890;
const TRAILER_PATH: usize = 1024;

#[repr(C)]
#[derive(Clone, Copy)]
struct Trailer {
    ready: i32,
    magic: i32,
    path: [u8; TRAILER_PATH],
}

/// Tuning for shared-memory loading.
#[derive(Debug, Clone)]
pub struct SharedMemoryOptions {
    /// Chunk size used to copy the file in.
    pub load_buffer_bytes: usize,
    /// Per-segment maximum; the kernel limit when `None`.
    pub segment_max: Option<usize>,
    /// Remove the region from the host when the loader is dropped.
    pub unload_on_drop: bool,
}

impl Default for SharedMemoryOptions {
    fn default() -> Self {
        Self {
            load_buffer_bytes: DEFAULT_LOAD_BUFFER_BYTES,
            segment_max: None,
            unload_on_drop: false,
        }
    }
}

impl From<&LegendreConfig> for SharedMemoryOptions {
    fn from(config: &LegendreConfig) -> Self {
        Self {
            load_buffer_bytes: config.load_buffer_bytes,
            segment_max: config.shm_segment_max,
            unload_on_drop: config.unload_on_drop,
        }
    }
}

/// An attached, populated region for one file.
#[derive(Debug)]
struct SharedFile {
    // Detached before the semaphore handle goes away
    region: SharedRegion,
    semaphore: Semaphore,
    real_path: PathBuf,
    size: usize,
    populated_here: bool,
}

impl SharedFile {
    fn attach(path: &Path, expected: Option<u64>, options: &SharedMemoryOptions) -> Result<Self> {
        let real_path =
            fs::canonicalize(path).map_err(|e| LegendreError::cant_open(path, "realpath", e))?;
        let real_bytes = real_path.as_os_str().len();
        if real_bytes >= TRAILER_PATH - 1 {
            return Err(LegendreError::wrong_value(format!(
                "path {} is {} bytes, maximum is {}",
                real_path.display(),
                real_bytes,
                TRAILER_PATH - 2
            )));
        }

        let size = fs::metadata(&real_path)
            .map_err(|e| LegendreError::cant_open(&real_path, "stat", e))?
            .len();
        if let Some(expected) = expected {
            check_size(&real_path, expected, size)?;
        }
        let size = size as usize;

        let page = page_size()?;
        let data_len = round_up(size, page);
        let required = page * (1 + (data_len + std::mem::size_of::<Trailer>()) / page);
        let segment_max = options.segment_max.unwrap_or_else(platform::segment_max) / page * page;
        if segment_max == 0 {
            return Err(LegendreError::wrong_value(format!(
                "shared memory segment maximum is below the page size {}",
                page
            )));
        }

        info!(
            path = %real_path.display(),
            bytes = required,
            page_size = page,
            segment_max,
            "Attaching shared memory"
        );

        let semaphore = Semaphore::open(&real_path)?;
        let lock = semaphore.lock()?;

        let region = SharedRegion::create_or_attach(&real_path, required, segment_max)?;
        // SAFETY: data_len + size_of::<Trailer>() <= required, and data_len is page aligned.
        let trailer = unsafe { region.as_mut_ptr().add(data_len) as *mut Trailer };
        // SAFETY: the trailer lies inside the attached region.
        let current = unsafe { std::ptr::read_volatile(trailer) };

        let populated_here = if current.ready != 0 {
            check_trailer(&current, &real_path)?;
            debug!(path = %real_path.display(), "Shared memory already loaded");
            false
        } else {
            let start = Instant::now();
            // SAFETY: the first `size` bytes of the region are ours while the lock is held.
            let dst = unsafe { std::slice::from_raw_parts_mut(region.as_mut_ptr(), size) };
            copy_file(&real_path, dst, options.load_buffer_bytes)?;

            let mut record = Trailer {
                ready: 0,
                magic: MAGIC,
                path: [0; TRAILER_PATH],
            };
            record.path[..real_bytes].copy_from_slice(real_path.as_os_str().as_encoded_bytes());
            // SAFETY: trailer points into the attached region.
            unsafe {
                std::ptr::write_volatile(trailer, record);
                fence(Ordering::SeqCst);
                std::ptr::write_volatile(std::ptr::addr_of_mut!((*trailer).ready), 1);
            }
            info!(
                path = %real_path.display(),
                bytes = size,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Loaded file into shared memory"
            );
            true
        };

        lock.unlock()?;

        Ok(Self {
            region,
            semaphore,
            real_path,
            size,
            populated_here,
        })
    }

    fn values(&self) -> &[f64] {
        // SAFETY: the region is page aligned and holds `size` populated bytes.
        unsafe {
            std::slice::from_raw_parts(
                self.region.as_ptr() as *const f64,
                self.size / std::mem::size_of::<f64>(),
            )
        }
    }
}

impl Drop for SharedFile {
    fn drop(&mut self) {
        self.semaphore.release_if_held();
        debug!(path = %self.real_path.display(), "Releasing shared memory");
    }
}

fn check_trailer(trailer: &Trailer, path: &Path) -> Result<()> {
    if trailer.magic != MAGIC {
        return Err(LegendreError::wrong_value(format!(
            "shared memory for {} has bad magic {}",
            path.display(),
            trailer.magic
        )));
    }
    let end = trailer
        .path
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(TRAILER_PATH);
    let stored = &trailer.path[..end];
    if stored != path.as_os_str().as_encoded_bytes() {
        return Err(LegendreError::wrong_value(format!(
            "shared memory for {} was loaded from {}",
            path.display(),
            String::from_utf8_lossy(stored)
        )));
    }
    Ok(())
}

fn copy_file(path: &Path, dst: &mut [u8], chunk: usize) -> Result<()> {
    let mut file = File::open(path).map_err(|e| LegendreError::cant_open(path, "open", e))?;
    for (i, block) in dst.chunks_mut(chunk.max(1)).enumerate() {
        file.read_exact(block).map_err(|e| {
            LegendreError::read_error(path, format!("read chunk {} into shared memory: {}", i, e))
        })?;
    }
    Ok(())
}

/// Serves rows from a host-wide shared-memory copy of the coefficient file.
#[derive(Debug)]
pub struct SharedMemoryLoader {
    truncation: usize,
    nshalf: usize,
    path: PathBuf,
    unload_on_drop: bool,
    shared: Option<SharedFile>,
}

impl SharedMemoryLoader {
    pub fn open(
        truncation: usize,
        nshalf: usize,
        path: &Path,
        options: SharedMemoryOptions,
    ) -> Result<Self> {
        let expected = PersistentStore::expected_size(truncation, nshalf);
        let shared = SharedFile::attach(path, Some(expected), &options)?;
        Ok(Self {
            truncation,
            nshalf,
            path: path.to_path_buf(),
            unload_on_drop: options.unload_on_drop,
            shared: Some(shared),
        })
    }

    /// True if this instance copied the file into shared memory.
    pub fn populated_here(&self) -> bool {
        self.shared.as_ref().is_some_and(|s| s.populated_here)
    }

    /// Number of segments backing the region.
    pub fn segment_count(&self) -> usize {
        self.shared.as_ref().map_or(0, |s| s.region.segment_count())
    }

    fn values(&self) -> &[f64] {
        self.shared.as_ref().map(|s| s.values()).unwrap_or(&[])
    }
}

impl LegendreLoader for SharedMemoryLoader {
    fn kind(&self) -> LoaderKind {
        LoaderKind::SharedMemory
    }

    fn truncation(&self) -> usize {
        self.truncation
    }

    fn rows(&self) -> usize {
        self.nshalf
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn row_at(&self, _latitude: f64, row_index: usize) -> Result<Row<'_>> {
        resident_row(self.values(), self.truncation, row_index, &self.path)
    }

    fn whole_buffer(&self) -> Option<&[f64]> {
        Some(self.values())
    }
}

impl Drop for SharedMemoryLoader {
    fn drop(&mut self) {
        // Detach before removing
        drop(self.shared.take());
        if self.unload_on_drop {
            if let Err(e) = unload_shared_memory(&self.path) {
                warn!(path = %self.path.display(), error = %e, "Failed to unload shared memory");
            }
        }
    }
}

/// Copy `path` into shared memory (if not already there) and detach.
///
/// Returns true if this call performed the copy.
pub fn load_shared_memory(path: &Path, options: &SharedMemoryOptions) -> Result<bool> {
    let shared = SharedFile::attach(path, None, options)?;
    Ok(shared.populated_here)
}

/// Remove the shared memory and semaphore for `path` from the host.
///
/// Already-unloaded files are not an error. Returns the number of segments removed.
pub fn unload_shared_memory(path: &Path) -> Result<usize> {
    let real_path =
        fs::canonicalize(path).map_err(|e| LegendreError::cant_open(path, "realpath", e))?;
    let removed = remove_shared_region(&real_path)?;
    if let Some(semaphore) = Semaphore::existing(&real_path)? {
        semaphore.remove()?;
    }
    if removed == 0 {
        debug!(path = %real_path.display(), "Shared memory already unloaded");
    } else {
        info!(path = %real_path.display(), segments = removed, "Unloaded shared memory");
    }
    Ok(removed)
}
