//! Core types shared across loaders, caches and transforms.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LegendreError;

/// Strategy used to serve coefficient rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoaderKind {
    /// Recompute every row on request.
    OnFly,
    /// Seek and read one row at a time from the file.
    ReadFromFile,
    /// Map the whole file read-only.
    #[default]
    MemoryMap,
    /// Copy the file once into System V shared memory for all processes on the host.
    SharedMemory,
}

impl LoaderKind {
    pub const ALL: [LoaderKind; 4] = [
        Self::OnFly,
        Self::ReadFromFile,
        Self::MemoryMap,
        Self::SharedMemory,
    ];

    /// Get the canonical name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnFly => "on-fly",
            Self::ReadFromFile => "fileio",
            Self::MemoryMap => "mapped-memory",
            Self::SharedMemory => "shared-memory",
        }
    }

    /// Whether loaders of this kind are kept in the process cache.
    ///
    /// OnFly and ReadFromFile loaders carry per-caller state and are built
    /// for each request.
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::MemoryMap | Self::SharedMemory)
    }

    /// True for the `tmp-` aliases, whose shared memory is removed on drop.
    pub fn is_temporary_alias(name: &str) -> bool {
        name.trim().to_lowercase().starts_with("tmp-")
    }
}

impl FromStr for LoaderKind {
    type Err = LegendreError;

    /// Parse a loader name (case-insensitive), accepting the historical aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "on-fly" | "on_fly" | "onfly" => Ok(Self::OnFly),
            "fileio" | "file-io" | "read" => Ok(Self::ReadFromFile),
            "mapped" | "mapped-memory" | "mmap" | "default" => Ok(Self::MemoryMap),
            "shared" | "shmem" | "shared-memory" | "tmp-shmem" | "tmp-shared-memory" => {
                Ok(Self::SharedMemory)
            }
            _ => Err(LegendreError::UnknownLoader(s.to_string())),
        }
    }
}

impl fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache key for a loader: truncation and grid signature.
pub fn cache_key(truncation: usize, signature: &str) -> String {
    format!("T={}&Grid={}", truncation, signature)
}

/// Statistics about a loader cache.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub evictions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_kind_aliases() {
        assert_eq!("on-fly".parse::<LoaderKind>().unwrap(), LoaderKind::OnFly);
        assert_eq!("ON_FLY".parse::<LoaderKind>().unwrap(), LoaderKind::OnFly);
        assert_eq!("fileio".parse::<LoaderKind>().unwrap(), LoaderKind::ReadFromFile);
        assert_eq!("mapped".parse::<LoaderKind>().unwrap(), LoaderKind::MemoryMap);
        assert_eq!("default".parse::<LoaderKind>().unwrap(), LoaderKind::MemoryMap);
        assert_eq!("shmem".parse::<LoaderKind>().unwrap(), LoaderKind::SharedMemory);
        assert_eq!(
            "tmp-shared-memory".parse::<LoaderKind>().unwrap(),
            LoaderKind::SharedMemory
        );
    }

    #[test]
    fn test_unknown_loader_rejected() {
        let err = "zarr".parse::<LoaderKind>().unwrap_err();
        assert!(matches!(err, LegendreError::UnknownLoader(ref s) if s == "zarr"));
        assert!(err.to_string().contains("choices"));
    }

    #[test]
    fn test_canonical_names_round_trip() {
        for kind in LoaderKind::ALL {
            assert_eq!(kind.as_str().parse::<LoaderKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_cached_kinds() {
        assert!(!LoaderKind::OnFly.is_cached());
        assert!(!LoaderKind::ReadFromFile.is_cached());
        assert!(LoaderKind::MemoryMap.is_cached());
        assert!(LoaderKind::SharedMemory.is_cached());
        assert!(LoaderKind::is_temporary_alias("tmp-shmem"));
        assert!(!LoaderKind::is_temporary_alias("shmem"));
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_key(21, "N32"), "T=21&Grid=N32");
    }
}
