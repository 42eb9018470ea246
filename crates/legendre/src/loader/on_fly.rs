use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{LegendreLoader, Row};
use crate::error::Result;
use crate::generator::{generate_row, row_length, work_length};
use crate::types::LoaderKind;

/// Per-loader buffers for recomputed rows.
#[derive(Debug)]
pub struct Scratch {
    row: Vec<f64>,
    work: Vec<f64>,
}

impl Scratch {
    pub fn row(&self) -> &[f64] {
        &self.row
    }
}

/// Recomputes each requested row; never touches the file.
///
/// Callers on different threads serialise on the scratch buffers, so
/// concurrent users should build their own instance.
#[derive(Debug)]
pub struct OnFlyLoader {
    truncation: usize,
    nshalf: usize,
    path: PathBuf,
    scratch: Mutex<Scratch>,
}

impl OnFlyLoader {
    pub fn new(truncation: usize, nshalf: usize, path: &Path) -> Self {
        Self {
            truncation,
            nshalf,
            path: path.to_path_buf(),
            scratch: Mutex::new(Scratch {
                row: vec![0.0; row_length(truncation)],
                work: vec![0.0; work_length(truncation)],
            }),
        }
    }
}

impl LegendreLoader for OnFlyLoader {
    fn kind(&self) -> LoaderKind {
        LoaderKind::OnFly
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

    fn row_at(&self, latitude: f64, _row_index: usize) -> Result<Row<'_>> {
        // Scratch is fully rewritten on every call, so poisoning is harmless
        let mut guard = self
            .scratch
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let Scratch { row, work } = &mut *guard;
        generate_row(self.truncation, latitude, row, work);
        Ok(Row::Computed(guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_fly_matches_generator() {
        let loader = OnFlyLoader::new(10, 4, Path::new("/nonexistent"));
        assert_eq!(loader.kind(), LoaderKind::OnFly);
        assert_eq!(loader.row_length(), row_length(10));
        assert!(loader.whole_buffer().is_none());

        let mut expected = vec![0.0; row_length(10)];
        let mut work = vec![0.0; work_length(10)];
        generate_row(10, 42.0, &mut expected, &mut work);

        let row = loader.row_at(42.0, 0).unwrap();
        assert_eq!(&*row, expected.as_slice());
    }
}
