//! Configuration management: the TOML config file and its data types.

mod loader;
mod types;

pub use loader::*;
pub use types::*;
