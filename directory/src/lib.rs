//! Library entry for the `wakedir` host directory.
//!
//! Exposes `inner_main` so a workspace-level shim binary can call into the directory logic.
//!
//! Hosts are kept in a [`storage::Storage`], backed either by a TOML file or a Valkey server.
#![cfg_attr(
    test,
    expect(clippy::indexing_slicing, reason = "This is not problematic in tests",)
)]

extern crate alloc;
extern crate core;

pub mod cli;
pub mod config;
pub mod run;
pub mod storage;

use std::env;
use std::sync::Once;

use eyre::{Result, WrapErr as _};
use tracing::{Instrument as _, debug, info};
use tracing_subscriber::{EnvFilter, fmt::time::ChronoLocal};

use cli::{Cli, LogFormat};
use storage::Storage;

static INIT_TRACING: Once = Once::new();
static INIT_RUSTLS: Once = Once::new();

fn init_tracing(log_format: LogFormat) {
    INIT_TRACING.call_once(move || {
        let default_level = if env::var("WAKEDIR_INTEGRATION_TEST").is_ok() {
            "error"
        } else {
            "info"
        };

        // Logs go to stderr, stdout carries command output.
        let builder = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
            )
            .with_timer(ChronoLocal::rfc_3339())
            .with_writer(std::io::stderr);

        match log_format {
            LogFormat::Compact => builder.compact().init(),
            LogFormat::Json => builder.json().init(),
            LogFormat::Pretty => builder.pretty().init(),
        }
    });
}

/// The directory's main function; can be called from a shim binary.
///
/// Loads the config, opens the storage and runs the requested command,
/// printing its output to stdout.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded, the storage cannot be opened
/// or the command fails.
pub async fn inner_main(invocation: Cli) -> Result<()> {
    init_tracing(invocation.log_format);

    INIT_RUSTLS.call_once(|| {
        // Errors only when a provider is already installed.
        if rustls_openssl::default_provider().install_default().is_err() {
            debug!("rustls crypto provider was already installed");
        }
    });

    let startup_span = tracing::info_span!("wakedir", config_path = %invocation.config, pid=?std::process::id(), version = env!("CARGO_PKG_VERSION"));
    run_command(&invocation).instrument(startup_span).await
}

async fn run_command(invocation: &Cli) -> Result<()> {
    let config = config::load(&invocation.config).await?;
    let storage = Storage::new(&config.storage)
        .await
        .wrap_err("Failed to initialize storage")?;
    info!(readonly = storage.readonly(), "Storage ready");

    let output = run::execute(&config, &storage, &invocation.command).await?;
    print!("{output}");
    Ok(())
}
