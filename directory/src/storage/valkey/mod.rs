//! Storage backend keeping each host as its own Valkey record.
//!
//! Every host is stored under its MAC address as key. Insertion order is kept in a
//! separate sorted set, scored by insertion time. Writing the record and the index
//! entry are two independent commands: a failure in between can leave a record
//! without an index entry (invisible, effectively garbage) or, on removal, the
//! other way around. This is reported, not rolled back.

mod codec;
pub mod store;

use core::{
    future::Future,
    sync::atomic::{AtomicI64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use redis::{
    Client, ConnectionAddr, ConnectionInfo, RedisConnectionInfo, RedisResult,
    sentinel::{SentinelClient, SentinelNodeConnectionInfo, SentinelServerType},
};
use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;
use tokio::time::timeout;
use tracing::{debug, info};

use self::{
    codec::{deserialize_host, serialize_host},
    store::{KeyValueStore, ValkeyConnection},
};
use super::{Host, StorageBackend, StorageError, normalize_mac};

/// Key of the sorted set holding all known MACs in insertion order.
const HOSTS_INDEX_KEY: &str = "hosts";

/// Upper bound for every single command sent to the server.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_PORT: u16 = 6379;

/// Connection settings for the Valkey backend.
#[derive(Debug, Deserialize, Default)]
pub struct ValkeyConfig {
    /// `host:port` pairs. Exactly one server, or the sentinels when `sentinel` is set.
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<SecretString>,
    /// Logical database index.
    #[serde(default)]
    pub db: i64,
    #[serde(default)]
    pub tls: bool,
    /// Resolve the primary through the sentinels in `addresses`.
    #[serde(default)]
    pub sentinel: bool,
    /// Name of the monitored primary, required with `sentinel`.
    #[serde(default)]
    pub master: Option<String>,
}

impl ValkeyConfig {
    fn redis_connection_info(&self) -> RedisConnectionInfo {
        RedisConnectionInfo {
            db: self.db,
            username: self.username.clone(),
            password: self
                .password
                .as_ref()
                .map(|p| p.expose_secret().to_string()),
            ..RedisConnectionInfo::default()
        }
    }

    fn connection_info(&self, address: &str) -> Result<ConnectionInfo, StorageError> {
        let (host, port) = split_address(address)?;
        let addr = if self.tls {
            ConnectionAddr::TcpTls {
                host,
                port,
                insecure: false,
                tls_params: None,
            }
        } else {
            ConnectionAddr::Tcp(host, port)
        };
        Ok(ConnectionInfo {
            addr,
            redis: self.redis_connection_info(),
        })
    }
}

/// Splits `host:port`, defaulting the port. IPv6 hosts must be bracketed.
fn split_address(address: &str) -> Result<(String, u16), StorageError> {
    let invalid = || StorageError::Config(format!("invalid valkey address '{address}'"));

    let (host, port) = match address.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && (!host.contains(':') || host.starts_with('[')) => {
            (host, port.parse().map_err(|_| invalid())?)
        }
        _ if address.is_empty() => return Err(invalid()),
        _ => (address, DEFAULT_PORT),
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(invalid());
    }
    Ok((host.to_string(), port))
}

/// Valkey backed [`StorageBackend`].
pub struct ValkeyBackend<S = ValkeyConnection> {
    store: S,
    timeout: Duration,
    last_score: AtomicI64,
}

impl ValkeyBackend {
    /// Connects to the configured server, directly or through Sentinel.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is incomplete or the connection cannot be established.
    #[tracing::instrument(skip_all, fields(addresses = ?config.addresses, sentinel = config.sentinel))]
    pub async fn connect(config: &ValkeyConfig) -> Result<Self, StorageError> {
        let connection = if config.sentinel {
            let master = config
                .master
                .clone()
                .filter(|m| !m.is_empty())
                .ok_or_else(|| {
                    StorageError::Config("sentinel requires the name of the master".to_string())
                })?;
            if config.addresses.is_empty() {
                return Err(StorageError::Config(
                    "at least one sentinel address is required".to_string(),
                ));
            }
            let sentinels = config
                .addresses
                .iter()
                .map(|a| config.connection_info(a))
                .collect::<Result<Vec<_>, _>>()?;
            let node_info = SentinelNodeConnectionInfo {
                tls_mode: config.tls.then_some(redis::TlsMode::Secure),
                redis_connection_info: Some(config.redis_connection_info()),
                ..SentinelNodeConnectionInfo::default()
            };
            let mut client = SentinelClient::build(
                sentinels,
                master,
                Some(node_info),
                SentinelServerType::Master,
            )
            .map_err(StorageError::Connect)?;
            bounded("connect to valkey primary", DEFAULT_TIMEOUT, client.get_async_connection())
                .await
                .map_err(connect_error)?
        } else {
            let address = match config.addresses.as_slice() {
                &[ref address] => address,
                &[] => {
                    return Err(StorageError::Config(
                        "a valkey address is required".to_string(),
                    ));
                }
                _ => {
                    return Err(StorageError::Config(
                        "multiple valkey addresses are only supported with sentinel".to_string(),
                    ));
                }
            };
            let client = Client::open(config.connection_info(address)?)
                .map_err(StorageError::Connect)?;
            bounded(
                "connect to valkey server",
                DEFAULT_TIMEOUT,
                client.get_multiplexed_async_connection(),
            )
            .await
            .map_err(connect_error)?
        };

        info!("Connected to valkey");
        Ok(Self::with_store(ValkeyConnection(connection), DEFAULT_TIMEOUT))
    }
}

fn connect_error(e: StorageError) -> StorageError {
    match e {
        StorageError::Remote { source, .. } => StorageError::Connect(source),
        other => other,
    }
}

/// Runs a single store command, bounded by `limit`.
async fn bounded<T>(
    op: &'static str,
    limit: Duration,
    command: impl Future<Output = RedisResult<T>>,
) -> Result<T, StorageError> {
    match timeout(limit, command).await {
        Ok(result) => result.map_err(|source| StorageError::Remote { op, source }),
        Err(_) => Err(StorageError::Timeout { op, timeout: limit }),
    }
}

impl<S: KeyValueStore> ValkeyBackend<S> {
    pub(crate) const fn with_store(store: S, timeout: Duration) -> Self {
        Self {
            store,
            timeout,
            last_score: AtomicI64::new(0),
        }
    }

    /// Insertion score: wall clock microseconds, strictly increasing within this process.
    fn next_score(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_micros();
        let previous = self
            .last_score
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(previous + 1)
    }
}

#[async_trait]
impl<S: KeyValueStore> StorageBackend for ValkeyBackend<S> {
    #[tracing::instrument(skip_all, fields(mac = %host.mac))]
    async fn add_host(&self, host: &Host) -> Result<(), StorageError> {
        let host = host.normalized();
        let value = serialize_host(&host);

        bounded("set host", self.timeout, self.store.set(&host.mac, &value)).await?;
        bounded(
            "add host to list",
            self.timeout,
            self.store
                .zadd_nx(HOSTS_INDEX_KEY, self.next_score(), &host.mac),
        )
        .await?;
        debug!("Stored host");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn remove_host(&self, mac: &str) -> Result<(), StorageError> {
        let mac = normalize_mac(mac);

        bounded(
            "remove host from list",
            self.timeout,
            self.store.zrem(HOSTS_INDEX_KEY, &mac),
        )
        .await?;
        bounded("delete host", self.timeout, self.store.del(&mac))
            .await
            .map_err(|e| StorageError::OrphanedRecord {
                mac: mac.clone(),
                source: Box::new(e),
            })?;
        Ok(())
    }

    async fn get_host(&self, mac: &str) -> Result<Option<Host>, StorageError> {
        let mac = normalize_mac(mac);
        let value = bounded("get host", self.timeout, self.store.get(&mac)).await?;
        Ok(value.map(|v| deserialize_host(&mac, &v)))
    }

    async fn get_hosts(&self) -> Result<Vec<Host>, StorageError> {
        let macs = bounded(
            "get known hosts list",
            self.timeout,
            self.store.zrange_all(HOSTS_INDEX_KEY),
        )
        .await?;
        if macs.is_empty() {
            return Ok(Vec::new());
        }

        let values = bounded("get host records", self.timeout, self.store.mget(&macs)).await?;

        macs.into_iter()
            .zip(values.into_iter().chain(core::iter::repeat(None)))
            .map(|(mac, value)| match value {
                Some(value) => Ok(deserialize_host(&mac, &value)),
                None => Err(StorageError::MissingRecord { mac }),
            })
            .collect()
    }

    async fn readonly(&self) -> Result<bool, StorageError> {
        // Valkey can be made readonly via ACLs or by connecting to a replica, but there is no
        // reliable way to tell that apart from a network failure. Assume writable; mutations
        // will report the error instead.
        Ok(false)
    }
}
