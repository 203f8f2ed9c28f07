//! Unified path management for liaison configuration and data files.
//!
//! Platform directories are resolved through the `dirs` crate so every store
//! agrees on where things live.

use liaison_core::CoreError;
use liaison_core::config::StorageSettings;
use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for CoreError {
    fn from(e: PathError) -> Self {
        CoreError::config(e.to_string())
    }
}

/// Unified path management for liaison.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/liaison/           # Config directory
/// └── config.toml              # CoreConfig
///
/// ~/.local/share/liaison/      # Data directory (overridable via [storage].data_dir)
/// ├── interactions.jsonl       # Interaction journal
/// └── ledger.toml              # Ledger snapshot
/// ```
pub struct LiaisonPaths;

impl LiaisonPaths {
    const APP_NAME: &'static str = "liaison";

    /// Returns the liaison configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to config directory (e.g., `~/.config/liaison/`)
    /// - `Err(PathError::HomeDirNotFound)`: Could not determine directory
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(Self::APP_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the platform data directory for liaison.
    pub fn default_data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(Self::APP_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the configured data directory, or the platform default.
    pub fn data_dir(storage: &StorageSettings) -> Result<PathBuf, PathError> {
        match &storage.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::default_data_dir(),
        }
    }

    /// Returns the interaction journal path.
    pub fn journal_file(storage: &StorageSettings) -> Result<PathBuf, PathError> {
        Ok(Self::data_dir(storage)?.join(&storage.journal_file))
    }

    /// Returns the ledger snapshot path.
    pub fn ledger_file(storage: &StorageSettings) -> Result<PathBuf, PathError> {
        Ok(Self::data_dir(storage)?.join(&storage.ledger_file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_data_dir_wins() {
        let storage = StorageSettings {
            data_dir: Some(PathBuf::from("/tmp/liaison-test")),
            ..StorageSettings::default()
        };

        assert_eq!(
            LiaisonPaths::journal_file(&storage).unwrap(),
            PathBuf::from("/tmp/liaison-test/interactions.jsonl")
        );
        assert_eq!(
            LiaisonPaths::ledger_file(&storage).unwrap(),
            PathBuf::from("/tmp/liaison-test/ledger.toml")
        );
    }
}
