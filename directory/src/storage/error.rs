//! Errors reported by the storage facade and its backends.

use alloc::boxed::Box;
use core::time::Duration;
use std::{io, path::PathBuf};

use thiserror::Error as ThisError;

/// Everything that can go wrong while reading or changing the host directory.
#[derive(Debug, ThisError)]
pub enum StorageError {
    /// A mutation was attempted while the storage is readonly.
    #[error("storage is readonly")]
    Readonly,
    #[error("cannot seed hosts in readonly mode")]
    SeedReadonly,

    #[error("invalid storage configuration: {0}")]
    Config(String),
    #[error("failed to connect to valkey server")]
    Connect(#[source] redis::RedisError),

    #[error("failed to read storage file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write storage file {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse hosts document {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize hosts document")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to save storage file after ensuring unique, uppercase MAC addresses")]
    Normalize(#[source] Box<StorageError>),
    #[error("failed to add seeded host '{mac}' from {}", path.display())]
    Seed {
        path: PathBuf,
        mac: String,
        #[source]
        source: Box<StorageError>,
    },

    #[error("failed to {op}")]
    Remote {
        op: &'static str,
        #[source]
        source: redis::RedisError,
    },
    #[error("valkey operation '{op}' timed out after {timeout:?}")]
    Timeout { op: &'static str, timeout: Duration },

    /// The ordering index references a host whose record is gone.
    #[error("MAC address '{mac}' is in the hosts index but no record is found")]
    MissingRecord { mac: String },
    /// The index entry was removed but the record survived.
    #[error("removed host '{mac}' from the hosts index, but failed to delete its record")]
    OrphanedRecord {
        mac: String,
        #[source]
        source: Box<StorageError>,
    },
}

impl StorageError {
    /// Whether this error stems from the readonly policy rather than a fault.
    #[must_use]
    pub const fn is_readonly(&self) -> bool {
        matches!(*self, Self::Readonly | Self::SeedReadonly)
    }

    /// Whether the remote record and ordering index were found to disagree.
    #[must_use]
    pub const fn is_inconsistency(&self) -> bool {
        matches!(
            *self,
            Self::MissingRecord { .. } | Self::OrphanedRecord { .. }
        )
    }
}
