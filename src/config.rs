// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Store and worker configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory by [`PipemeshConfig::load`]
pub const CONFIG_FILE: &str = "pipemesh.toml";

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipemeshConfig {
    /// Root directory of the result store
    pub store_dir: PathBuf,
    /// Index file name, relative to `store_dir`
    pub index_file: PathBuf,
    /// Worker threads for background builds, `None` lets rayon decide
    pub workers: Option<usize>,
}

impl Default for PipemeshConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("models/pipemesh"),
            index_file: PathBuf::from("index.json"),
            workers: None,
        }
    }
}

impl PipemeshConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: PipemeshConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load `pipemesh.toml` if present, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = if Path::new(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply `PIPEMESH_STORE_DIR` and `PIPEMESH_WORKERS` as looked up by `var`
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = var("PIPEMESH_STORE_DIR") {
            self.store_dir = PathBuf::from(dir);
        }

        if let Some(workers) = var("PIPEMESH_WORKERS") {
            let workers: usize = workers
                .trim()
                .parse()
                .with_context(|| format!("PIPEMESH_WORKERS is not a number: {workers:?}"))?;
            // Zero means "let the pool decide"
            self.workers = (workers > 0).then_some(workers);
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Full path of the index file
    pub fn index_path(&self) -> PathBuf {
        self.store_dir.join(&self.index_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = PipemeshConfig::default();
        assert_eq!(config.index_path(), PathBuf::from("models/pipemesh/index.json"));
        assert_eq!(config.workers, None);
    }

    #[test]
    fn save_and_reload() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(CONFIG_FILE);
        let config = PipemeshConfig {
            store_dir: dir.path().join("store"),
            workers: Some(3),
            ..Default::default()
        };
        config.save(&path)?;
        assert_eq!(PipemeshConfig::from_file(&path)?, config);
        Ok(())
    }

    #[test]
    fn partial_file_uses_defaults() -> Result<()> {
        let config: PipemeshConfig = toml::from_str("workers = 2\n")?;
        assert_eq!(config.workers, Some(2));
        assert_eq!(config.store_dir, PathBuf::from("models/pipemesh"));
        Ok(())
    }

    #[test]
    fn environment_overrides() -> Result<()> {
        let vars: HashMap<&str, &str> =
            HashMap::from([("PIPEMESH_STORE_DIR", "/srv/ducts"), ("PIPEMESH_WORKERS", "0")]);
        let mut config = PipemeshConfig {
            workers: Some(8),
            ..Default::default()
        };
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()))?;
        assert_eq!(config.store_dir, PathBuf::from("/srv/ducts"));
        assert_eq!(config.workers, None);

        let bad = |name: &str| (name == "PIPEMESH_WORKERS").then(|| "many".to_string());
        assert!(config.apply_overrides(bad).is_err());
        Ok(())
    }
}
