//! Shared configuration: data directory layout and environment helpers.

use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Read an unsigned integer from the environment, falling back to `default`
/// when unset. A set but unparsable value is an error.
pub(crate) fn env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}

/// Root directory holding the entry snapshot, stored photos and scratch files.
///
/// Layout:
/// - `diets.json`: diet entry snapshot
/// - `media/`: photos of stored entries, named by fingerprint
/// - `work/`: intermediate compression artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `DIETLOG_DATA_DIR`, or `~/.dietlog` when unset.
    pub fn from_env() -> Self {
        env::var("DIETLOG_DATA_DIR")
            .map(Self::new)
            .unwrap_or_else(|_| Self::new(Self::default_dir()))
    }

    /// Get the default data directory: ~/.dietlog
    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".dietlog"))
            .unwrap_or_else(|| PathBuf::from("data/dietlog"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store_path(&self) -> PathBuf {
        self.root.join("diets.json")
    }

    pub fn media_dir(&self) -> PathBuf {
        self.root.join("media")
    }

    pub fn work_dir(&self) -> PathBuf {
        self.root.join("work")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_layout() {
        let data = DataDir::new("/var/dietlog");
        assert_eq!(data.store_path(), PathBuf::from("/var/dietlog/diets.json"));
        assert_eq!(data.media_dir(), PathBuf::from("/var/dietlog/media"));
        assert_eq!(data.work_dir(), PathBuf::from("/var/dietlog/work"));
    }

    #[test]
    fn test_env_u64_default_when_unset() {
        assert_eq!(
            env_u64("DIETLOG_TEST_SURELY_UNSET_VARIABLE", 42).unwrap(),
            42
        );
    }
}
