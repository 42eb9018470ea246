//! Isolated coefficient data directories.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary data directory removed when dropped.
///
/// # Example
///
/// ```
/// use test_utils::TempDataDir;
///
/// let dir = TempDataDir::new();
/// assert!(dir.path().is_dir());
/// assert!(dir.file("ecregrid_cf_t21_N32").ends_with("ecregrid_cf_t21_N32"));
/// ```
#[derive(Debug)]
pub struct TempDataDir {
    dir: TempDir,
}

impl TempDataDir {
    /// Creates a fresh directory under the system temp location.
    ///
    /// Panics if the directory cannot be created; only meant for tests.
    pub fn new() -> Self {
        let dir = tempfile::Builder::new()
            .prefix("legendre-test-")
            .tempdir()
            .unwrap_or_else(|e| panic!("cannot create temporary data directory: {}", e));
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a file inside the directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Names of all regular files currently in the directory, sorted.
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path())
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().is_file())
                    .filter_map(|e| e.file_name().into_string().ok())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl Default for TempDataDir {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_files_and_cleans_up() {
        let dir = TempDataDir::new();
        let root = dir.path().to_path_buf();
        std::fs::write(dir.file("b"), b"2").unwrap();
        std::fs::write(dir.file("a"), b"1").unwrap();
        std::fs::create_dir(dir.file("sub")).unwrap();
        assert_eq!(dir.file_names(), vec!["a".to_string(), "b".to_string()]);

        drop(dir);
        assert!(!root.exists());
    }
}
