//! Configuration data types for the host directory.

use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use crate::storage::StorageConfig;

/// Root config structure.
///
/// ```toml
/// [storage]
/// type = "file"
/// readonly = false
///
/// [storage.file]
/// path = "hosts.toml"
/// ```
#[derive(Debug, Deserialize, Default)]
pub struct DirectoryConfig {
    /// Where and how hosts are persisted.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl DirectoryConfig {
    /// Rewrites relative paths so they are relative to the config file's directory.
    pub(crate) fn resolve_paths(&mut self, config_path: &Path) {
        let storage = &mut self.storage;
        storage.file.path = resolve_config_relative_paths(config_path, &storage.file.path);
        if let Some(ref mut seed) = storage.seed_hosts {
            *seed = resolve_config_relative_paths(config_path, seed);
        }
    }
}

/// Resolves a path to an absolute one.
///
/// If the path is absolute, returns it as-is. If relative, joins it with the
/// config file's parent directory and normalizes the result to remove redundant
/// components like `./`.
///
/// # Arguments
///
/// * `config_path` - Path to the config file
/// * `relative_path` - Path to resolve (may be absolute or relative)
pub fn resolve_config_relative_paths(config_path: &Path, relative_path: &Path) -> PathBuf {
    let resolved = if relative_path.is_absolute() {
        relative_path.to_path_buf()
    } else {
        config_path
            .parent()
            .map_or_else(|| relative_path.to_path_buf(), |d| d.join(relative_path))
    };

    // We can't use canonicalize() because the file might not exist yet
    normalize_path(&resolved)
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        use Component as C;
        match component {
            C::Normal(c) => {
                result.push(c);
            }
            C::ParentDir => {
                result.pop();
            }
            C::CurDir => {}
            C::RootDir | C::Prefix(_) => {
                result.push(component);
            }
        }
    }
    result
}
