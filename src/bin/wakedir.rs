//! Shim binary that calls into the `wakedir_directory` library's `inner_main`.
#![recursion_limit = "256"]
use clap::Parser as _;
use eyre::Result;
use wakedir_directory::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Delegate to library entrypoint
    wakedir_directory::inner_main(Cli::parse()).await
}
