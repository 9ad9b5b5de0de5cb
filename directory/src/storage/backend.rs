//! Host entity model and the capability contract every storage backend implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::StorageError;

/// A directory entry, keyed by its hardware address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// MAC address of the host, stored as uppercase colon-separated hex.
    pub mac: String,
    /// Display name, not required to be unique.
    pub name: String,
    /// Hostname or IP used for liveness probing. `None` when unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Host {
    /// Creates a host without a probe address.
    pub fn new(mac: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            mac: mac.into(),
            name: name.into(),
            address: None,
        }
    }

    /// Sets the probe address.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Returns a copy with the MAC in canonical form.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            mac: normalize_mac(&self.mac),
            ..self.clone()
        }
    }
}

/// The on-disk document: used by the file backend and for seed files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostsDocument {
    #[serde(default)]
    pub hosts: Vec<Host>,
}

/// Brings a MAC into canonical form: uppercase, colon separated.
///
/// This is a pure text transform. Malformed input is normalized as far as possible
/// and never rejected; see [`is_valid_mac`] for validation.
#[must_use]
pub fn normalize_mac(mac: &str) -> String {
    mac.replace('-', ":").to_ascii_uppercase()
}

/// Checks for six hex octets separated by `:` or `-`.
#[must_use]
pub fn is_valid_mac(mac: &str) -> bool {
    let octets: Vec<&str> = mac.split([':', '-']).collect();
    octets.len() == 6
        && octets
            .iter()
            .all(|octet| octet.len() == 2 && octet.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Concurrency safe storage for the configured hosts.
///
/// Implementations are shared between tasks without further synchronization.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Add a new host, overwrite name and address if the MAC already exists.
    /// The MAC is matched case-insensitively and stored in canonical form.
    async fn add_host(&self, host: &Host) -> Result<(), StorageError>;

    /// Remove a host, ignore if the host does not exist.
    async fn remove_host(&self, mac: &str) -> Result<(), StorageError>;

    /// Look up a single host, `None` if it is unknown.
    async fn get_host(&self, mac: &str) -> Result<Option<Host>, StorageError>;

    /// All hosts in insertion order.
    async fn get_hosts(&self) -> Result<Vec<Host>, StorageError>;

    /// Live check whether the persistence medium currently rejects writes.
    async fn readonly(&self) -> Result<bool, StorageError>;
}
