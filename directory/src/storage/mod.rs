//! Durable host directory with interchangeable storage backends.
//!
//! [`Storage`] wraps exactly one [`StorageBackend`], selected by configuration, and
//! adds the readonly policy and optional one-time seeding on top of it.

mod backend;
mod error;
pub mod file;
#[cfg(test)]
pub(crate) mod testsuite;
pub mod valkey;

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::fs;
use tracing::{debug, info};

pub use backend::{Host, HostsDocument, StorageBackend, is_valid_mac, normalize_mac};
pub use error::StorageError;
pub use file::{FileBackend, FileConfig};
pub use valkey::{ValkeyBackend, ValkeyConfig};

/// Which backend persists the hosts.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// A single TOML document on the local filesystem.
    #[default]
    File,
    /// A Valkey (or Redis) server.
    Valkey,
}

/// The `[storage]` section of the configuration.
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    #[serde(rename = "type", default)]
    pub backend: BackendType,
    /// Reject all modifications. The backend may force this even when unset.
    #[serde(default = "do_readonly")]
    pub readonly: bool,
    #[serde(default)]
    pub file: FileConfig,
    #[serde(default)]
    pub valkey: ValkeyConfig,
    /// Hosts document added to the backend once on startup.
    #[serde(default)]
    pub seed_hosts: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            readonly: do_readonly(),
            file: FileConfig::default(),
            valkey: ValkeyConfig::default(),
            seed_hosts: None,
        }
    }
}

const fn do_readonly() -> bool {
    true
}

/// Policy layer in front of the configured backend.
pub struct Storage {
    backend: Box<dyn StorageBackend>,
    readonly: bool,
}

impl Storage {
    /// Creates the configured backend, resolves the readonly state and seeds hosts.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be created, the seed file cannot be read,
    /// or seeding is requested while the storage is readonly.
    #[tracing::instrument(skip_all, fields(backend = ?config.backend))]
    pub async fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let backend: Box<dyn StorageBackend> = match config.backend {
            BackendType::File => Box::new(FileBackend::open(&config.file).await?),
            BackendType::Valkey => Box::new(ValkeyBackend::connect(&config.valkey).await?),
        };
        Self::with_backend(backend, config.readonly, config.seed_hosts.as_deref()).await
    }

    /// Wraps an already constructed backend.
    ///
    /// # Errors
    ///
    /// See [`Storage::new`].
    pub async fn with_backend(
        backend: Box<dyn StorageBackend>,
        readonly: bool,
        seed_hosts: Option<&Path>,
    ) -> Result<Self, StorageError> {
        let readonly = readonly || backend.readonly().await?;
        if readonly {
            info!("Storage is readonly");
        }

        let storage = Self { backend, readonly };

        if let Some(path) = seed_hosts {
            storage.seed(path).await?;
        }

        Ok(storage)
    }

    #[tracing::instrument(skip(self))]
    async fn seed(&self, path: &Path) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::SeedReadonly);
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|source| StorageError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let document: HostsDocument =
            toml::from_str(&content).map_err(|source| StorageError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        for host in &document.hosts {
            debug!(mac = %host.mac, name = %host.name, "Adding seeded host");
            self.backend
                .add_host(host)
                .await
                .map_err(|e| StorageError::Seed {
                    path: path.to_path_buf(),
                    mac: host.mac.clone(),
                    source: Box::new(e),
                })?;
        }
        info!(count = document.hosts.len(), "Seeded hosts");
        Ok(())
    }

    /// Whether modifications are rejected.
    #[must_use]
    pub const fn readonly(&self) -> bool {
        self.readonly
    }

    /// All hosts in insertion order.
    ///
    /// # Errors
    ///
    /// Forwards backend errors.
    pub async fn get_hosts(&self) -> Result<Vec<Host>, StorageError> {
        self.backend.get_hosts().await
    }

    /// A single host by MAC, `None` if unknown.
    ///
    /// # Errors
    ///
    /// Forwards backend errors.
    pub async fn get_host(&self, mac: &str) -> Result<Option<Host>, StorageError> {
        self.backend.get_host(mac).await
    }

    /// Adds or updates a host.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Readonly`] in readonly mode, otherwise forwards backend errors.
    pub async fn add_host(&self, host: &Host) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::Readonly);
        }
        self.backend.add_host(host).await
    }

    /// Removes a host; unknown MACs are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Readonly`] in readonly mode, otherwise forwards backend errors.
    pub async fn remove_host(&self, mac: &str) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::Readonly);
        }
        self.backend.remove_host(mac).await
    }
}
