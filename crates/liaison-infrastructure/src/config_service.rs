//! Configuration service implementation.
//!
//! This module provides a ConfigService that loads the core configuration
//! from the configuration file (~/.config/liaison/config.toml).

use crate::paths::LiaisonPaths;
use crate::storage::AtomicTomlFile;
use liaison_core::config::CoreConfig;
use liaison_core::{CoreError, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Configuration service that loads and caches the core configuration.
///
/// A missing file yields `CoreConfig::default()`; a malformed one is an error
/// rather than a silent fallback, since costs are read from it.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: Option<PathBuf>,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<CoreConfig>>>,
}

impl ConfigService {
    /// Creates a service reading the default config file.
    pub fn new() -> Self {
        Self {
            path: None,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a service reading an explicit config file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Resolves the config file this service reads.
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => Ok(LiaisonPaths::config_file()?),
        }
    }

    /// Gets the configuration, loading from file if not cached.
    pub fn get_config(&self) -> Result<CoreConfig> {
        {
            let read_lock = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let loaded = Self::load_config(&self.config_path()?)?;

        {
            let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
            *write_lock = Some(loaded.clone());
        }

        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = None;
    }

    /// Writes a default config file.
    ///
    /// Refuses to overwrite an existing file unless `force` is set.
    pub fn init_default(&self, force: bool) -> Result<PathBuf> {
        let path = self.config_path()?;
        if path.exists() && !force {
            return Err(CoreError::config(format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            )));
        }

        AtomicTomlFile::<CoreConfig>::new(path.clone()).save(&CoreConfig::default())?;
        self.invalidate_cache();
        tracing::info!(path = %path.display(), "Wrote default configuration");
        Ok(path)
    }

    fn load_config(path: &Path) -> Result<CoreConfig> {
        let file = AtomicTomlFile::<CoreConfig>::new(path.to_path_buf());
        match file.load()? {
            Some(config) => {
                tracing::debug!(path = %path.display(), "Loaded configuration");
                Ok(config)
            }
            None => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                Ok(CoreConfig::default())
            }
        }
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::with_path(temp_dir.path().join("config.toml"));

        let config = service.get_config().unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.costs.super_interest, 2);
    }

    #[test]
    fn test_partial_file_overrides_costs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[costs]\nview_contact = 3\n").unwrap();

        let config = ConfigService::with_path(&path).get_config().unwrap();
        assert_eq!(config.costs.view_contact, 3);
        assert_eq!(config.costs.interest, 1);
        assert_eq!(config.fanout.channel_capacity, 64);
    }

    #[test]
    fn test_config_is_cached_until_invalidated() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let service = ConfigService::with_path(&path);
        assert_eq!(service.get_config().unwrap().costs.chat, 1);

        std::fs::write(&path, "[costs]\nchat = 5\n").unwrap();
        assert_eq!(service.get_config().unwrap().costs.chat, 1);

        service.invalidate_cache();
        assert_eq!(service.get_config().unwrap().costs.chat, 5);
    }

    #[test]
    fn test_init_default_refuses_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::with_path(temp_dir.path().join("config.toml"));

        let path = service.init_default(false).unwrap();
        assert!(path.exists());
        assert!(service.init_default(false).unwrap_err().to_string().contains("already exists"));
        assert!(service.init_default(true).is_ok());
        assert_eq!(service.get_config().unwrap(), CoreConfig::default());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[costs\n").unwrap();

        assert!(ConfigService::with_path(&path).get_config().is_err());
    }
}
