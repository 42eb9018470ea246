use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{LegendreLoader, Row};
use crate::error::{LegendreError, Result};
use crate::generator::row_length;
use crate::store::{check_size, PersistentStore};
use crate::types::LoaderKind;

/// Open file, its current offset and the last row read.
#[derive(Debug)]
pub struct ReadState {
    file: File,
    position: u64,
    row: Vec<f64>,
}

impl ReadState {
    pub fn row(&self) -> &[f64] {
        &self.row
    }
}

/// Reads one row per request from the coefficient file.
#[derive(Debug)]
pub struct ReadFromFileLoader {
    truncation: usize,
    nshalf: usize,
    path: PathBuf,
    state: Mutex<ReadState>,
}

impl ReadFromFileLoader {
    pub fn open(truncation: usize, nshalf: usize, path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| LegendreError::cant_open(path, "open", e))?;
        let size = file
            .metadata()
            .map_err(|e| LegendreError::cant_open(path, "stat", e))?
            .len();
        check_size(path, PersistentStore::expected_size(truncation, nshalf), size)?;

        Ok(Self {
            truncation,
            nshalf,
            path: path.to_path_buf(),
            state: Mutex::new(ReadState {
                file,
                position: 0,
                row: vec![0.0; row_length(truncation)],
            }),
        })
    }
}

impl LegendreLoader for ReadFromFileLoader {
    fn kind(&self) -> LoaderKind {
        LoaderKind::ReadFromFile
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
        if row_index >= self.nshalf {
            return Err(LegendreError::read_error(
                &self.path,
                format!("row {} beyond {} rows", row_index, self.nshalf),
            ));
        }

        let mut guard = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let state = &mut *guard;

        let bytes = (state.row.len() * std::mem::size_of::<f64>()) as u64;
        let offset = row_index as u64 * bytes;
        if state.position != offset {
            state.file.seek(SeekFrom::Start(offset)).map_err(|e| {
                state.position = u64::MAX;
                LegendreError::read_error(&self.path, format!("seek to {}: {}", offset, e))
            })?;
            state.position = offset;
        }

        if let Err(e) = state.file.read_exact(bytemuck::cast_slice_mut(&mut state.row)) {
            // Offset is unknown after a short read
            state.position = u64::MAX;
            return Err(LegendreError::read_error(
                &self.path,
                format!("read row {}: {}", row_index, e),
            ));
        }
        state.position = offset + bytes;

        Ok(Row::Read(guard))
    }
}
