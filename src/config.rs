//! Engine configuration.
//! Reads `phenomatrix.toml` from the current directory or the path in the
//! `PHENOMATRIX_CONFIG` env var. Every field has a default, so an empty file
//! (or no file) is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::export::DEFAULT_FILE_PREFIX;
use crate::matrix::{FractalizeOptions, SplitMethod};
use crate::{Error, Result};

/// Env var naming the config file.
pub const CONFIG_ENV: &str = "PHENOMATRIX_CONFIG";

/// Config file looked up when the env var is unset.
pub const DEFAULT_CONFIG_FILE: &str = "phenomatrix.toml";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Root of the per-node working directories
    #[serde(default = "default_work_root")]
    pub work_root: PathBuf,
    /// Test-set file prefix
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    /// Shuffle before splitting
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,
    /// Fixed shuffle seed
    #[serde(default)]
    pub seed: Option<u64>,
    /// Split method used at every level
    #[serde(default)]
    pub split_method: SplitMethod,
    /// Snapshot directory of the matrix store
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,
    /// `tracing` filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_work_root() -> PathBuf { PathBuf::from("tmp/work") }
fn default_file_prefix() -> String { DEFAULT_FILE_PREFIX.to_string() }
fn default_shuffle() -> bool { true }
fn default_snapshot_dir() -> PathBuf { PathBuf::from("tmp/store") }
fn default_log_filter() -> String { "info".to_string() }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            work_root: default_work_root(),
            file_prefix: default_file_prefix(),
            shuffle: default_shuffle(),
            seed: None,
            split_method: SplitMethod::default(),
            snapshot_dir: default_snapshot_dir(),
            log_filter: default_log_filter(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    /// `Toml` for a syntax or type error, `Config` for an invalid value.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file.
    ///
    /// # Errors
    /// `Config` if the file cannot be read, otherwise as [`Self::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from `$PHENOMATRIX_CONFIG`, else `phenomatrix.toml` if present,
    /// else defaults.
    ///
    /// # Errors
    /// A named file that is missing or invalid.
    pub fn from_env() -> Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::load(Path::new(&path)),
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::load(Path::new(DEFAULT_CONFIG_FILE))
            }
            Err(_) => Ok(Self::default()),
        }
    }

    /// Check values serde cannot.
    ///
    /// # Errors
    /// `Config` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.file_prefix.is_empty() || self.file_prefix.contains(['/', '\\']) {
            return Err(Error::Config(format!(
                "file_prefix must be a non-empty file name, got {:?}",
                self.file_prefix
            )));
        }
        if self.work_root.as_os_str().is_empty() {
            return Err(Error::Config("work_root must not be empty".to_string()));
        }
        if self.snapshot_dir.as_os_str().is_empty() {
            return Err(Error::Config("snapshot_dir must not be empty".to_string()));
        }
        Ok(())
    }

    /// Fractalization options for `levels` fold counts.
    #[must_use]
    pub fn fractalize_options(&self, levels: usize) -> FractalizeOptions {
        let mut options = FractalizeOptions::default()
            .shuffle(self.shuffle)
            .methods(vec![self.split_method; levels]);
        options.seed = self.seed;
        options
    }
}
