use std::fs::File;
use std::path::{Path, PathBuf};

use super::{resident_row, LegendreLoader, Row};
use crate::error::{LegendreError, Result};
use crate::platform::MappedFile;
use crate::store::{check_size, PersistentStore};
use crate::types::LoaderKind;

/// Maps the whole coefficient file read-only; rows are served in place.
#[derive(Debug)]
pub struct MemoryMapLoader {
    truncation: usize,
    nshalf: usize,
    path: PathBuf,
    map: MappedFile,
}

impl MemoryMapLoader {
    pub fn open(truncation: usize, nshalf: usize, path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| LegendreError::cant_open(path, "open", e))?;
        let size = file
            .metadata()
            .map_err(|e| LegendreError::cant_open(path, "stat", e))?
            .len();
        check_size(path, PersistentStore::expected_size(truncation, nshalf), size)?;

        let map = MappedFile::map_read_only(&file, size as usize, path)?;
        // Page alignment of the mapping guarantees f64 alignment
        bytemuck::try_cast_slice::<u8, f64>(map.as_bytes())
            .map_err(|e| LegendreError::wrong_value(format!("{}: {}", path.display(), e)))?;

        tracing::info!(path = %path.display(), bytes = size, "Mapped Legendre coefficients");
        Ok(Self {
            truncation,
            nshalf,
            path: path.to_path_buf(),
            map,
        })
    }

    fn values(&self) -> &[f64] {
        bytemuck::cast_slice(self.map.as_bytes())
    }
}

impl LegendreLoader for MemoryMapLoader {
    fn kind(&self) -> LoaderKind {
        LoaderKind::MemoryMap
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
