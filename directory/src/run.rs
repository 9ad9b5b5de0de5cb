//! Executes a single CLI command against the configured storage.

use core::fmt::Write as _;

use eyre::{WrapErr as _, eyre};
use tracing::info;

use crate::{
    cli::Command,
    config::DirectoryConfig,
    storage::{BackendType, Host, Storage, is_valid_mac},
};

fn format_host(host: &Host) -> String {
    match host.address {
        Some(ref address) => format!("{}\t{}\t{address}", host.mac, host.name),
        None => format!("{}\t{}", host.mac, host.name),
    }
}

/// Runs `command` and returns what should be printed to stdout.
///
/// # Errors
///
/// Returns an error for invalid input, unknown hosts, readonly storage
/// and any failure of the storage backend.
pub async fn execute(
    config: &DirectoryConfig,
    storage: &Storage,
    command: &Command,
) -> eyre::Result<String> {
    let mut out = String::new();
    match *command {
        Command::List => {
            for host in storage.get_hosts().await.wrap_err("Failed to list hosts")? {
                writeln!(out, "{}", format_host(&host))?;
            }
        }
        Command::Get { ref mac } => {
            let host = storage
                .get_host(mac)
                .await
                .wrap_err(format!("Failed to get host {mac}"))?
                .ok_or_else(|| eyre!("Host {mac} not found"))?;
            writeln!(out, "{}", format_host(&host))?;
        }
        Command::Add {
            ref mac,
            ref name,
            ref address,
        } => {
            if !is_valid_mac(mac) {
                return Err(eyre!("Invalid MAC address: {mac}"));
            }
            let mut host = Host::new(mac.as_str(), name.as_str());
            host.address.clone_from(address);
            storage
                .add_host(&host)
                .await
                .wrap_err(format!("Failed to add host {mac}"))?;
            info!(%mac, %name, "Added host");
        }
        Command::Remove { ref mac } => {
            storage
                .remove_host(mac)
                .await
                .wrap_err(format!("Failed to remove host {mac}"))?;
            info!(%mac, "Removed host");
        }
        Command::Status => {
            let backend = match config.storage.backend {
                BackendType::File => format!("file ({})", config.storage.file.path.display()),
                BackendType::Valkey => format!("valkey ({})", config.storage.valkey.addresses.join(", ")),
            };
            writeln!(out, "backend:\t{backend}")?;
            writeln!(out, "readonly:\t{}", storage.readonly())?;
        }
    }
    Ok(out)
}
