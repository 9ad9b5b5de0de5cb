//! Storage backend persisting the whole directory as a single TOML document.

use std::{
    collections::HashSet,
    ffi::{OsStr, OsString},
    fs::Permissions,
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::{
    fs::{self, OpenOptions},
    sync::RwLock,
};
use tracing::{debug, info};

use super::{Host, HostsDocument, StorageBackend, StorageError, normalize_mac};

/// Configuration of the file backend.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct FileConfig {
    /// Path to the hosts document. Relative paths are resolved relative to the config file.
    #[serde(default = "default_hosts_path")]
    pub path: PathBuf,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: default_hosts_path(),
        }
    }
}

fn default_hosts_path() -> PathBuf {
    PathBuf::from("hosts.toml")
}

/// Keeps an in-memory copy of the document and rewrites the file on every change.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    document: RwLock<HostsDocument>,
}

impl FileBackend {
    /// Opens the hosts document at `config.path`, creating it when missing.
    ///
    /// MAC addresses are normalized and duplicates dropped (first occurrence wins).
    /// If that changed anything the corrected document is written back immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, created or parsed, or if the
    /// normalized document cannot be written back.
    #[tracing::instrument(skip_all, fields(path = %config.path.display()))]
    pub async fn open(config: &FileConfig) -> Result<Self, StorageError> {
        let path = config.path.clone();

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("Storage file not found, creating new file");
                let document = HostsDocument::default();
                save(&path, &document).await?;
                return Ok(Self {
                    path,
                    document: RwLock::new(document),
                });
            }
            Err(source) => return Err(StorageError::Read { path, source }),
        };

        let loaded: HostsDocument = toml::from_str(&content).map_err(|source| {
            StorageError::Parse {
                path: path.clone(),
                source,
            }
        })?;
        debug!("Storage file loaded");

        let (document, changed) = normalize_document(loaded);
        if changed {
            info!("Rewriting storage file with unique, uppercase MAC addresses");
            save(&path, &document)
                .await
                .map_err(|e| StorageError::Normalize(Box::new(e)))?;
        }

        Ok(Self {
            path,
            document: RwLock::new(document),
        })
    }

    /// Path of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Uppercases all MACs and drops later duplicates.
/// Returns the cleaned document and whether it differs from the input.
fn normalize_document(document: HostsDocument) -> (HostsDocument, bool) {
    let mut seen = HashSet::with_capacity(document.hosts.len());
    let mut hosts = Vec::with_capacity(document.hosts.len());
    let mut changed = false;

    for host in document.hosts {
        let normalized = host.normalized();
        changed |= normalized.mac != host.mac;
        if seen.insert(normalized.mac.clone()) {
            hosts.push(normalized);
        } else {
            debug!(mac = %normalized.mac, "Dropping duplicate host entry");
            changed = true;
        }
    }

    (HostsDocument { hosts }, changed)
}

/// Sibling path the document is staged in before it replaces `path`.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_else(|| OsStr::new("hosts")));
    name.push(".tmp");
    path.with_file_name(name)
}

async fn replace_with_staged(
    staging: &Path,
    path: &Path,
    data: String,
    permissions: Option<Permissions>,
) -> io::Result<()> {
    fs::write(staging, data).await?;
    if let Some(permissions) = permissions {
        fs::set_permissions(staging, permissions).await?;
    }
    fs::rename(staging, path).await
}

/// Replaces the document on disk atomically: the data is written to a staging file
/// in the same directory and renamed over `path`, so a failed write never leaves a
/// truncated document behind.
async fn save(path: &Path, document: &HostsDocument) -> Result<(), StorageError> {
    let data = toml::to_string(document)?;
    let write_error = |source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };

    // An existing document keeps its permissions, and a write protected one stays untouched.
    let permissions = match fs::metadata(path).await {
        Ok(metadata) => {
            OpenOptions::new()
                .write(true)
                .open(path)
                .await
                .map_err(write_error)?;
            Some(metadata.permissions())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(source) => return Err(write_error(source)),
    };

    let staging = staging_path(path);
    if let Err(source) = replace_with_staged(&staging, path, data, permissions).await {
        if let Err(e) = fs::remove_file(&staging).await {
            debug!(staging = %staging.display(), error = %e, "Could not remove staging file");
        }
        return Err(write_error(source));
    }

    debug!(path = %path.display(), "Storage file saved");
    Ok(())
}

#[async_trait]
impl StorageBackend for FileBackend {
    #[tracing::instrument(skip_all, fields(mac = %host.mac))]
    async fn add_host(&self, host: &Host) -> Result<(), StorageError> {
        let host = host.normalized();
        let mut document = self.document.write().await;

        let mut updated = document.clone();
        match updated.hosts.iter_mut().find(|h| h.mac == host.mac) {
            Some(existing) => {
                existing.name = host.name;
                existing.address = host.address;
            }
            None => updated.hosts.push(host),
        }

        save(&self.path, &updated).await?;
        *document = updated;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn remove_host(&self, mac: &str) -> Result<(), StorageError> {
        let mac = normalize_mac(mac);
        let mut document = self.document.write().await;

        let Some(index) = document.hosts.iter().position(|h| h.mac == mac) else {
            return Ok(());
        };

        let mut updated = document.clone();
        updated.hosts.remove(index);

        save(&self.path, &updated).await?;
        *document = updated;
        Ok(())
    }

    async fn get_host(&self, mac: &str) -> Result<Option<Host>, StorageError> {
        let mac = normalize_mac(mac);
        let document = self.document.read().await;
        Ok(document.hosts.iter().find(|h| h.mac == mac).cloned())
    }

    async fn get_hosts(&self) -> Result<Vec<Host>, StorageError> {
        Ok(self.document.read().await.hosts.clone())
    }

    async fn readonly(&self) -> Result<bool, StorageError> {
        let writable = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .await
            .is_ok();
        Ok(!writable)
    }
}
