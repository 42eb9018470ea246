//! Contiguous regions built from one or more System V shared-memory segments.
//!
//! Segment `i` of a region for file `path` uses the key `ftok(path, i + 1)`.
//! When a region needs more than one segment, the first is attached where
//! the kernel chooses, detached, and re-attached low enough that the
//! remaining segments can be attached directly above it.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{ipc_key, last_errno};
use crate::error::{LegendreError, Result};

/// `ftok` only uses the low 8 bits of the project id.
const MAX_SEGMENTS: usize = 255;

/// A contiguous, attached shared-memory region.
#[derive(Debug)]
pub struct SharedRegion {
    base: *mut u8,
    len: usize,
    segments: Vec<(*mut libc::c_void, usize)>,
    path: PathBuf,
}

// SAFETY: the region is only written while the owner holds the cross-process
// lock during construction; afterwards it is read-only.
unsafe impl Send for SharedRegion {}
unsafe impl Sync for SharedRegion {}

impl SharedRegion {
    /// Attach (creating where absent) a region of `len` bytes for `path`,
    /// split into segments of at most `segment_max` bytes.
    ///
    /// `len` and `segment_max` must be multiples of the page size.
    pub fn create_or_attach(path: &Path, len: usize, segment_max: usize) -> Result<Self> {
        if segment_max == 0 || len == 0 {
            return Err(LegendreError::wrong_value(format!(
                "shared region of {} bytes with segment maximum {}",
                len, segment_max
            )));
        }
        let count = len.div_ceil(segment_max);
        if count > MAX_SEGMENTS {
            return Err(LegendreError::wrong_value(format!(
                "{} needs {} shared memory segments, at most {} supported",
                path.display(),
                count,
                MAX_SEGMENTS
            )));
        }

        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            let size = segment_size(len, segment_max, i);
            ids.push((get_segment(path, i, size)?, size));
        }

        let mut region = Self {
            base: std::ptr::null_mut(),
            len,
            segments: Vec::with_capacity(count),
            path: path.to_path_buf(),
        };

        let (first_id, first_size) = ids[0];
        let mut base = attach(first_id, std::ptr::null_mut(), path)?;
        if count > 1 {
            // Move the first segment down so the rest fit contiguously above it
            // SAFETY: base was returned by shmat.
            unsafe { libc::shmdt(base) };
            let shift = (count - 1) * segment_max;
            let target = (base as usize).checked_sub(shift).ok_or_else(|| {
                LegendreError::wrong_value(format!(
                    "cannot place {} segments below {:p}",
                    count, base
                ))
            })?;
            base = attach(first_id, target as *mut libc::c_void, path)?;
        }
        region.segments.push((base, first_size));
        region.base = base as *mut u8;

        let mut next = base as usize + first_size;
        for &(id, size) in &ids[1..] {
            let addr = attach(id, next as *mut libc::c_void, path)?;
            region.segments.push((addr, size));
            next += size;
        }

        debug!(
            path = %path.display(),
            bytes = len,
            segments = count,
            "Attached shared memory"
        );
        Ok(region)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.base
    }

    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.base
    }
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        for &(addr, _) in &self.segments {
            // SAFETY: addr was returned by shmat and is detached once.
            if unsafe { libc::shmdt(addr) } != 0 {
                warn!(
                    path = %self.path.display(),
                    error = %std::io::Error::last_os_error(),
                    "shmdt failed"
                );
            }
        }
        debug!(path = %self.path.display(), segments = self.segments.len(), "Detached shared memory");
    }
}

/// Mark every segment of the region for `path` for removal.
///
/// Returns the number of segments removed; zero if nothing was loaded.
pub fn remove_shared_region(path: &Path) -> Result<usize> {
    let mut removed = 0;
    for i in 0..MAX_SEGMENTS {
        let key = ipc_key(path, (i + 1) as i32)?;
        // SAFETY: plain syscall with integer arguments.
        let id = unsafe { libc::shmget(key, 0, 0o600) };
        if id < 0 {
            if last_errno() == libc::ENOENT {
                break;
            }
            return Err(LegendreError::bad_parameter("shmget", path));
        }
        // SAFETY: IPC_RMID ignores the buffer argument.
        if unsafe { libc::shmctl(id, libc::IPC_RMID, std::ptr::null_mut()) } < 0 {
            return Err(LegendreError::bad_parameter("shmctl(IPC_RMID)", path));
        }
        removed += 1;
    }
    Ok(removed)
}

fn segment_size(len: usize, segment_max: usize, index: usize) -> usize {
    (len - index * segment_max).min(segment_max)
}

fn get_segment(path: &Path, index: usize, size: usize) -> Result<libc::c_int> {
    let key = ipc_key(path, (index + 1) as i32)?;

    // SAFETY: plain syscalls with integer arguments.
    let mut id = unsafe { libc::shmget(key, size, 0o600) };
    if id < 0 {
        if last_errno() != libc::ENOENT {
            return Err(LegendreError::bad_parameter("shmget", path));
        }
        id = unsafe { libc::shmget(key, size, libc::IPC_CREAT | 0o600) };
        if id < 0 {
            return Err(LegendreError::bad_parameter("shmget(IPC_CREAT)", path));
        }
    }

    // SAFETY: shmid_ds is plain data, filled by IPC_STAT.
    let mut stat: libc::shmid_ds = unsafe { std::mem::zeroed() };
    if unsafe { libc::shmctl(id, libc::IPC_STAT, &mut stat) } < 0 {
        return Err(LegendreError::bad_parameter("shmctl(IPC_STAT)", path));
    }
    // A size mismatch means a stale segment or another file under the same key
    if stat.shm_segsz as usize != size {
        return Err(LegendreError::BadParameter(format!(
            "shared memory segment {} for {} has {} bytes, expected {}",
            index,
            path.display(),
            stat.shm_segsz,
            size
        )));
    }
    Ok(id)
}

fn attach(id: libc::c_int, addr: *mut libc::c_void, path: &Path) -> Result<*mut libc::c_void> {
    // SAFETY: id is a valid segment; addr is null or page aligned.
    let ptr = unsafe { libc::shmat(id, addr, 0) };
    if ptr as isize == -1 {
        return Err(LegendreError::bad_parameter("shmat", path));
    }
    Ok(ptr)
}
