//! Thin wrappers over the POSIX calls used by the loaders.
//!
//! Everything `unsafe` in the crate lives under this module. Each wrapper
//! owns the resource it acquires and releases it on drop.

pub mod mmap;
pub mod sem;
pub mod shm;

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use crate::error::{LegendreError, Result};

pub use mmap::MappedFile;
pub use sem::{IpcLock, Semaphore};
pub use shm::{remove_shared_region, SharedRegion};

/// Fallback per-segment maximum when the kernel limit cannot be read.
pub const DEFAULT_SEGMENT_MAX: usize = 32 * 1024 * 1024;

/// System page size in bytes.
pub fn page_size() -> Result<usize> {
    // SAFETY: sysconf has no preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size <= 0 {
        return Err(LegendreError::BadParameter(format!(
            "sysconf(_SC_PAGESIZE) returned {}",
            size
        )));
    }
    Ok(size as usize)
}

/// Round `n` up to a multiple of `page`.
#[inline]
pub fn round_up(n: usize, page: usize) -> usize {
    n.div_ceil(page) * page
}

/// Derive a System V IPC key from an existing file and a project id.
pub fn ipc_key(path: &Path, id: i32) -> Result<libc::key_t> {
    let c_path = c_path(path)?;
    // SAFETY: c_path is a valid NUL-terminated string for the duration of the call.
    let key = unsafe { libc::ftok(c_path.as_ptr(), id) };
    if key == -1 {
        return Err(LegendreError::bad_parameter("ftok", path));
    }
    Ok(key)
}

/// Largest shared-memory segment the kernel will create.
pub fn segment_max() -> usize {
    std::fs::read_to_string("/proc/sys/kernel/shmmax")
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(|v| v.min(usize::MAX as u64) as usize)
        .unwrap_or(DEFAULT_SEGMENT_MAX)
}

fn c_path(path: &Path) -> Result<CString> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| LegendreError::wrong_value(format!("path {} contains NUL", path.display())))
}

fn last_errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}
