//! Command-line interface definitions for the host directory.
//!
//! This module contains the CLI argument parsing structures and enums
//! used by the main binary.

use std::env;

use clap::{Parser, Subcommand, ValueEnum};

/// Top-level command-line interface definition.
#[derive(Debug, Parser)]
#[command(name = "wakedir")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "wakedir.toml", env = "WAKEDIR_CONFIG")]
    pub config: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format for tracing.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
    Pretty,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print all hosts in insertion order.
    List,

    /// Print a single host.
    Get { mac: String },

    /// Add a host, or replace name and address of an existing one.
    Add {
        mac: String,
        name: String,
        /// Hostname or IP used to check whether the host is up
        #[arg(long)]
        address: Option<String>,
    },

    /// Remove a host. Unknown hosts are ignored.
    Remove { mac: String },

    /// Show the storage backend and whether it accepts modifications.
    Status,
}
