//! Persisted algorithm configuration
//!
//! The hike threshold is the only tunable that survives restarts. Loading
//! never fails: a missing or unreadable file yields the default.

use crate::cycle::DEFAULT_HIKE_THRESHOLD;
use crate::error::{CycleError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

fn default_hike_threshold() -> f64 {
    DEFAULT_HIKE_THRESHOLD
}

/// Tunable detection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgoConfig {
    /// Day-over-day increase (cpl) that counts as a hike
    #[serde(default = "default_hike_threshold")]
    pub hike_threshold: f64,
    /// Keys written by other tools, kept verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for AlgoConfig {
    fn default() -> Self {
        Self::with_threshold(DEFAULT_HIKE_THRESHOLD)
    }
}

impl AlgoConfig {
    pub fn with_threshold(hike_threshold: f64) -> Self {
        Self {
            hike_threshold,
            extra: serde_json::Map::new(),
        }
    }

    /// Reject thresholds that cannot classify anything
    pub fn validate(&self) -> Result<()> {
        if !self.hike_threshold.is_finite() || self.hike_threshold <= 0.0 {
            return Err(CycleError::InvalidParameter(format!(
                "hike_threshold must be a positive number, got {}",
                self.hike_threshold
            )));
        }
        Ok(())
    }
}

/// JSON file backing for [`AlgoConfig`]
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored config, falling back to the default on any problem
    pub fn load(&self) -> AlgoConfig {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no stored config, using defaults");
            return AlgoConfig::default();
        }

        match self.try_load() {
            Ok(config) => config,
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "config unreadable, using defaults"
                );
                AlgoConfig::default()
            }
        }
    }

    fn try_load(&self) -> Result<AlgoConfig> {
        let contents = fs::read_to_string(&self.path)?;
        let config: AlgoConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Persist `config`, replacing the previous file in one rename
    pub fn save(&self, config: &AlgoConfig) -> Result<()> {
        config.validate()?;
        let json = serde_json::to_string_pretty(config)?;

        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), hike_threshold = config.hike_threshold, "saved config");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_default() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("algo_config.json"));
        assert_eq!(store.load(), AlgoConfig::default());
        assert_eq!(store.load().hike_threshold, 8.0);
    }

    #[test]
    fn test_corrupt_file_gives_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("algo_config.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(ConfigStore::new(&path).load(), AlgoConfig::default());

        fs::write(&path, r#"{"hike_threshold": -2}"#).unwrap();
        assert_eq!(ConfigStore::new(&path).load(), AlgoConfig::default());
    }

    #[test]
    fn test_round_trip_preserves_values() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("algo_config.json"));

        let mut config = AlgoConfig::with_threshold(6.5);
        config
            .extra
            .insert("tuned_on".to_string(), serde_json::json!("2024-06-01"));
        store.save(&config).unwrap();

        let loaded = store.load();
        assert_eq!(loaded, config);

        store.save(&loaded).unwrap();
        assert_eq!(store.load(), config);
    }

    #[test]
    fn test_missing_threshold_key_defaults() {
        let config: AlgoConfig = serde_json::from_str(r#"{"note": "x"}"#).unwrap();
        assert_eq!(config.hike_threshold, 8.0);
        assert_eq!(config.extra["note"], "x");
    }

    #[test]
    fn test_save_rejects_invalid() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("algo_config.json"));
        assert!(store.save(&AlgoConfig::with_threshold(f64::NAN)).is_err());
    }
}
