//! Read-only shared file mappings.

use std::fs::File;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::ptr::NonNull;

use crate::error::{LegendreError, Result};

/// A whole file mapped read-only with `MAP_SHARED`.
#[derive(Debug)]
pub struct MappedFile {
    ptr: NonNull<u8>,
    len: usize,
}

// SAFETY: the mapping is read-only and lives until drop.
unsafe impl Send for MappedFile {}
unsafe impl Sync for MappedFile {}

impl MappedFile {
    /// Map the first `len` bytes of `file`.
    pub fn map_read_only(file: &File, len: usize, path: &Path) -> Result<Self> {
        if len == 0 {
            return Err(LegendreError::wrong_value(format!(
                "cannot map empty file {}",
                path.display()
            )));
        }
        // SAFETY: fd is open for reading; the kernel picks the address.
        let addr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(LegendreError::bad_parameter("mmap", path));
        }
        let ptr = NonNull::new(addr as *mut u8)
            .ok_or_else(|| LegendreError::bad_parameter("mmap", path))?;
        Ok(Self { ptr, len })
    }

    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: ptr..ptr+len is a live read-only mapping owned by self.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for MappedFile {
    fn drop(&mut self) {
        // SAFETY: unmapping exactly the region returned by mmap.
        let rc = unsafe { libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.len) };
        if rc != 0 {
            tracing::warn!(
                error = %std::io::Error::last_os_error(),
                bytes = self.len,
                "munmap failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_reads_file_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data");
        std::fs::write(&path, b"legendre").unwrap();
        let file = File::open(&path).unwrap();

        let map = MappedFile::map_read_only(&file, 8, &path).unwrap();
        assert_eq!(map.len(), 8);
        assert_eq!(map.as_bytes(), b"legendre");
    }

    #[test]
    fn test_empty_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty");
        std::fs::write(&path, b"").unwrap();
        let file = File::open(&path).unwrap();
        assert!(MappedFile::map_read_only(&file, 0, &path).is_err());
    }
}
