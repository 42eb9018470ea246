//! On-disk coefficient files.
//!
//! A coefficient file holds one row per northern-hemisphere latitude of the
//! global grid (equator included), native-endian `f64`, no header. Files are
//! written under a temporary name, made read-only straight away and renamed
//! into place, so the canonical name only ever refers to a complete file.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use regrid_common::Grid;
use tracing::{debug, info, warn};

use crate::error::{LegendreError, Result};
use crate::generator::{generate_rows, row_length};

/// Rows generated per parallel batch before being written out.
const ROWS_PER_BATCH: usize = 64;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Guarantees that a correctly sized coefficient file exists for a (T, grid) pair.
#[derive(Debug, Clone)]
pub struct PersistentStore {
    data_dir: PathBuf,
}

impl PersistentStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// `ecregrid_cf_t<T>_<signature>`
    pub fn file_name(truncation: usize, signature: &str) -> String {
        format!("ecregrid_cf_t{}_{}", truncation, signature)
    }

    pub fn canonical_path(&self, truncation: usize, signature: &str) -> PathBuf {
        self.data_dir.join(Self::file_name(truncation, signature))
    }

    /// A temp path unique to this writer: the `x`-prefixed file name followed
    /// by the process id and a per-process counter.
    pub fn temp_path(&self, truncation: usize, signature: &str) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.data_dir.join(format!(
            "x{}.{}.{}",
            Self::file_name(truncation, signature),
            std::process::id(),
            n
        ))
    }

    /// Exact size in bytes of a valid file.
    pub fn expected_size(truncation: usize, nshalf: usize) -> u64 {
        (row_length(truncation) * nshalf * std::mem::size_of::<f64>()) as u64
    }

    /// Make sure the coefficient file for `truncation` and `grid` exists and
    /// has the right size, generating it if needed. Returns its path.
    pub fn ensure_exists(&self, truncation: usize, grid: &dyn Grid) -> Result<PathBuf> {
        let signature = grid.coeff_info();
        let path = self.canonical_path(truncation, &signature);
        let nshalf = grid.nshalf();
        let expected = Self::expected_size(truncation, nshalf);

        match fs::metadata(&path) {
            Ok(meta) => {
                check_size(&path, expected, meta.len())?;
                debug!(path = %path.display(), bytes = expected, "Coefficient file present");
                return Ok(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(LegendreError::cant_open(&path, "stat", e)),
        }

        let latitudes = grid.north_hemisphere_latitudes();
        if latitudes.len() != nshalf {
            return Err(LegendreError::wrong_value(format!(
                "grid {} has {} northern latitudes, expected {}",
                signature,
                latitudes.len(),
                nshalf
            )));
        }

        fs::create_dir_all(&self.data_dir)
            .map_err(|e| LegendreError::cant_open(&self.data_dir, "create directory", e))?;

        let temp = self.temp_path(truncation, &signature);
        let start = Instant::now();
        info!(
            path = %path.display(),
            truncation,
            rows = nshalf,
            "Generating Legendre coefficients"
        );

        if let Err(e) = write_rows(&temp, truncation, &latitudes) {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp, &path) {
            let _ = fs::remove_file(&temp);
            return Err(LegendreError::cant_open(&path, "rename", e));
        }

        info!(
            path = %path.display(),
            bytes = expected,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Legendre coefficients written"
        );
        Ok(path)
    }

    /// Delete the file for `truncation` and `grid`. Returns false if it did not exist.
    pub fn remove(&self, truncation: usize, grid: &dyn Grid) -> Result<bool> {
        let path = self.canonical_path(truncation, &grid.coeff_info());
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "Removed coefficient file");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(LegendreError::cant_open(&path, "remove", e)),
        }
    }
}

/// Reject a file whose size does not match its truncation and grid.
pub(crate) fn check_size(path: &Path, expected: u64, actual: u64) -> Result<()> {
    if expected != actual {
        warn!(
            path = %path.display(),
            expected,
            actual,
            "Coefficient file has the wrong size"
        );
        return Err(LegendreError::corrupt_cache(path, expected, actual));
    }
    Ok(())
}

fn write_rows(temp: &Path, truncation: usize, latitudes: &[f64]) -> Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp)
        .map_err(|e| LegendreError::cant_open(temp, "create", e))?;

    // The open descriptor stays writable after the mode change
    file.set_permissions(fs::Permissions::from_mode(0o444))
        .map_err(|e| LegendreError::cant_open(temp, "chmod", e))?;

    let mut writer = BufWriter::new(file);
    for (batch, chunk) in latitudes.chunks(ROWS_PER_BATCH).enumerate() {
        let rows = generate_rows(truncation, chunk);
        writer
            .write_all(bytemuck::cast_slice(&rows))
            .map_err(|e| {
                LegendreError::write_error(temp, format!("write batch {}: {}", batch, e))
            })?;
    }

    let file = writer
        .into_inner()
        .map_err(|e| LegendreError::write_error(temp, format!("flush: {}", e.error())))?;
    file.sync_all()
        .map_err(|e| LegendreError::write_error(temp, format!("sync: {}", e)))?;
    Ok(())
}
