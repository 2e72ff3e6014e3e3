use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one file per table
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Fsync table files before they replace the previous version
    #[serde(default = "default_sync_writes")]
    pub sync_writes: bool,

    /// Extension of table files inside `data_dir`
    #[serde(default = "default_file_extension")]
    pub file_extension: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./db")
}

fn default_sync_writes() -> bool {
    true
}

fn default_file_extension() -> String {
    "tbl".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            sync_writes: default_sync_writes(),
            file_extension: default_file_extension(),
        }
    }
}

impl Config {
    /// Creates a configuration rooted at `data_dir` with default settings
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_sync_writes(mut self, sync_writes: bool) -> Self {
        self.sync_writes = sync_writes;
        self
    }

    /// Loads configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Path of the file that persists `table`
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.data_dir.join(format!("{}.{}", table, self.file_extension))
    }
}
