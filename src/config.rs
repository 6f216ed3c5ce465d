//! Configuration loaded from `pickemall.toml`.
//!
//! ## Config File Location
//!
//! Pass `--config <path>` explicitly, or drop a `pickemall.toml` in the working
//! directory. Without either, stock defaults apply.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//!
//! [crop]
//! quality = 90              # JPEG quality of cropped outputs (1-100)
//! ```
//!
//! Config files are sparse: override just the values you want. Unknown keys
//! are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILENAME: &str = "pickemall.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Output encoding of crop operations.
    pub crop: CropConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.crop.quality == 0 || self.crop.quality > 100 {
            return Err(ConfigError::Validation(
                "crop.quality must be 1-100".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of operations applied at once.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective worker count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Crop output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CropConfig {
    /// JPEG quality of cropped outputs (1 = worst, 100 = best).
    pub quality: u8,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self { quality: 90 }
    }
}

/// Parse and validate a config document.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load and validate the config file at `path`.
pub fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Resolve the config for a run.
///
/// An explicit path must exist. Otherwise `pickemall.toml` in `dir` is used if
/// present, else stock defaults.
pub fn load_config(explicit: Option<&Path>, dir: &Path) -> Result<Config, ConfigError> {
    if let Some(path) = explicit {
        return load_config_file(path);
    }
    let candidate = dir.join(CONFIG_FILENAME);
    if candidate.is_file() {
        load_config_file(&candidate)
    } else {
        Ok(Config::default())
    }
}

/// Returns a fully-commented stock `pickemall.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# pickemall configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum number of operations applied in parallel.
# Omit to use every CPU core. Larger values are clamped to the core count.
# max_processes = 4

# ---------------------------------------------------------------------------
# Crop output
# ---------------------------------------------------------------------------
[crop]
# JPEG encoding quality of cropped images (1 = worst, 100 = best).
quality = 90
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cores() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.processing.max_processes, None);
        assert_eq!(config.crop.quality, 90);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn stock_toml_parses_to_defaults() {
        let config = parse_config(stock_config_toml()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn parse_partial_config() {
        let config = parse_config("[crop]\nquality = 75\n").unwrap();
        assert_eq!(config.crop.quality, 75);
        assert_eq!(config.processing.max_processes, None);
    }

    #[test]
    fn parse_processing_config() {
        let config = parse_config("[processing]\nmax_processes = 2\n").unwrap();
        assert_eq!(config.processing.max_processes, Some(2));
    }

    #[test]
    fn unknown_keys_rejected() {
        let err = parse_config("[crop]\nqualty = 75\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));

        let err = parse_config("[server]\nport = 3001\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn validate_quality_range() {
        assert!(matches!(
            parse_config("[crop]\nquality = 0\n").unwrap_err(),
            ConfigError::Validation(_)
        ));
        assert!(matches!(
            parse_config("[crop]\nquality = 101\n").unwrap_err(),
            ConfigError::Validation(_)
        ));
    }

    #[test]
    fn validate_zero_processes() {
        assert!(matches!(
            parse_config("[processing]\nmax_processes = 0\n").unwrap_err(),
            ConfigError::Validation(_)
        ));
    }

    #[test]
    fn effective_threads_auto() {
        let config = ProcessingConfig {
            max_processes: None,
        };
        assert_eq!(effective_threads(&config), cores());
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_processes: Some(99999),
        };
        assert_eq!(effective_threads(&config), cores());
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn load_config_defaults_without_file() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(load_config(None, tmp.path()).unwrap(), Config::default());
    }

    #[test]
    fn load_config_from_working_directory() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "[crop]\nquality = 60\n").unwrap();
        let config = load_config(None, tmp.path()).unwrap();
        assert_eq!(config.crop.quality, 60);
    }

    #[test]
    fn load_config_explicit_path_must_exist() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing.toml");
        let err = load_config(Some(&missing), tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn explicit_path_wins_over_working_directory() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "[crop]\nquality = 60\n").unwrap();
        let explicit = tmp.path().join("other.toml");
        fs::write(&explicit, "[crop]\nquality = 40\n").unwrap();

        let config = load_config(Some(&explicit), tmp.path()).unwrap();
        assert_eq!(config.crop.quality, 40);
    }
}
