//! Error types for Legendre coefficient handling.

use std::io;
use std::path::{Path, PathBuf};

use regrid_common::GridError;
use thiserror::Error;

/// Errors that can occur while generating, loading or using coefficients.
#[derive(Error, Debug)]
pub enum LegendreError {
    /// A file or IPC object could not be created, opened or renamed.
    #[error("cannot open {path}: {operation}: {source}")]
    CantOpenFile {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    /// Short or failed read.
    #[error("read error on {path}: {operation}")]
    ReadError {
        path: PathBuf,
        operation: String,
    },

    /// Short or failed write.
    #[error("write error on {path}: {operation}")]
    WriteError {
        path: PathBuf,
        operation: String,
    },

    /// A platform size assumption or a shared-memory trailer check failed.
    #[error("wrong value: {0}")]
    WrongValue(String),

    /// An IPC or page-size system call failed.
    #[error("bad parameter: {0}")]
    BadParameter(String),

    /// A coefficient file exists with the wrong size for its truncation and grid.
    #[error("corrupt coefficient file {path}: expected {expected} bytes, found {actual}")]
    CorruptCache {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// The configured loader name is not recognised.
    #[error("unknown Legendre loader '{0}', choices are: on-fly, fileio, mapped, shared, tmp-shmem")]
    UnknownLoader(String),

    /// Configuration failed validation.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Grid(#[from] GridError),
}

impl LegendreError {
    /// Create a CantOpenFile error.
    pub fn cant_open(path: impl AsRef<Path>, operation: &'static str, source: io::Error) -> Self {
        Self::CantOpenFile {
            path: path.as_ref().to_path_buf(),
            operation,
            source,
        }
    }

    /// Create a ReadError.
    pub fn read_error(path: impl AsRef<Path>, operation: impl Into<String>) -> Self {
        Self::ReadError {
            path: path.as_ref().to_path_buf(),
            operation: operation.into(),
        }
    }

    /// Create a WriteError.
    pub fn write_error(path: impl AsRef<Path>, operation: impl Into<String>) -> Self {
        Self::WriteError {
            path: path.as_ref().to_path_buf(),
            operation: operation.into(),
        }
    }

    pub fn wrong_value(msg: impl Into<String>) -> Self {
        Self::WrongValue(msg.into())
    }

    /// Create a BadParameter error from a failed system call, capturing errno.
    pub fn bad_parameter(call: &str, path: impl AsRef<Path>) -> Self {
        Self::BadParameter(format!(
            "{} failed for {}: {}",
            call,
            path.as_ref().display(),
            io::Error::last_os_error()
        ))
    }

    pub fn corrupt_cache(path: impl AsRef<Path>, expected: u64, actual: u64) -> Self {
        Self::CorruptCache {
            path: path.as_ref().to_path_buf(),
            expected,
            actual,
        }
    }

    /// True for errors a caller may recover from by deleting the file and retrying.
    pub fn is_corrupt_cache(&self) -> bool {
        matches!(self, Self::CorruptCache { .. })
    }
}

/// Result type for Legendre operations.
pub type Result<T> = std::result::Result<T, LegendreError>;
