//! Configuration file support.
//!
//! An `hzbench.toml` file lets a project pin default benchmark options and
//! suite scheduling without repeating them in code.
//!
//! ## Configuration File Location
//!
//! [`HarnessConfig::discover_from`] searches for the file in the given
//! directory and then each parent, stopping at the repository root (a
//! directory containing `.git`) or the filesystem root.
//!
//! ## Example Configuration
//!
//! ```toml
//! [benchmark]
//! min_time = 0.0       # derive from the calibrated clock
//! max_time = 5.0
//! init_count = 1
//! min_samples = 5
//! asynchronous = false
//! delay = 0.005
//!
//! [suite]
//! queued = false
//! ```

use crate::options::BenchOptions;
use crate::types::BenchError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// The default configuration file name.
pub const CONFIG_FILE_NAME: &str = "hzbench.toml";

/// Root configuration structure for `hzbench.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Default options applied to benchmarks built from this configuration.
    pub benchmark: BenchOptions,

    /// Suite scheduling defaults.
    pub suite: SuiteConfig,
}

/// Suite scheduling defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Remove finished benchmarks from the front of the suite's queue instead
    /// of walking it by index.
    pub queued: bool,
}

impl HarnessConfig {
    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, BenchError> {
        let config: HarnessConfig = toml::from_str(contents)?;
        config.benchmark.validate()?;
        Ok(config)
    }

    /// Loads configuration from the specified file path.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, is not valid TOML, or carries invalid
    /// benchmark options.
    pub fn load_from_file(path: &Path) -> Result<Self, BenchError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
            .map_err(|e| BenchError::Config(format!("{}: {e}", path.display())))
    }

    /// Attempts to find and load configuration starting from `start_dir`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some((config, path)))` - Found and loaded configuration with its path
    /// * `Ok(None)` - No configuration file found
    /// * `Err` - A config file was found but couldn't be loaded
    pub fn discover_from(start_dir: &Path) -> Result<Option<(Self, PathBuf)>, BenchError> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.is_file() {
                debug!(path = %config_path.display(), "loading harness configuration");
                let config = Self::load_from_file(&config_path)?;
                return Ok(Some((config, config_path)));
            }

            // Stop at repository root or filesystem root
            if current.join(".git").exists() || !current.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Saves the configuration to the specified file path.
    pub fn save_to_file(&self, path: &Path) -> Result<(), BenchError> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| BenchError::Config(format!("failed to serialize configuration: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_partial_config() {
        let config = HarnessConfig::from_toml_str(
            r#"
            [benchmark]
            min_samples = 8
            asynchronous = true

            [suite]
            queued = true
            "#,
        )
        .unwrap();

        assert_eq!(config.benchmark.min_samples, 8);
        assert!(config.benchmark.asynchronous);
        assert_eq!(config.benchmark.max_time, 5.0);
        assert!(config.suite.queued);
    }

    #[test]
    fn rejects_invalid_options() {
        let result = HarnessConfig::from_toml_str("[benchmark]\ninit_count = 0\n");
        assert!(matches!(result, Err(BenchError::InvalidOptions(_))));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        let mut config = HarnessConfig::default();
        config.benchmark.max_time = 0.5;
        config.save_to_file(&path).unwrap();

        let loaded = HarnessConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn discovers_config_in_parent_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[benchmark]\nmin_samples = 3\n",
        )
        .unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let (config, path) = HarnessConfig::discover_from(&nested).unwrap().unwrap();
        assert_eq!(config.benchmark.min_samples, 3);
        assert_eq!(path, dir.path().join(CONFIG_FILE_NAME));
    }

    #[test]
    fn discovery_stops_at_repository_root() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        assert!(HarnessConfig::discover_from(dir.path()).unwrap().is_none());
    }

    #[test]
    fn unreadable_file_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let result = HarnessConfig::load_from_file(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(BenchError::Io(_))));
    }
}
