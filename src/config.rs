//! Configuration file of the backup command.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use derive_more::{Display, Error};

use crate::application::Application;
use crate::backends::DumpConfig;
use crate::database::DatabaseConfig;
use crate::storage::Disks;

/// Settings of the backup run itself.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BackupConfig {
    /// Directory the scratch directory of a run is created in.
    pub temporary_directory: PathBuf,

    /// Disk holding the application managed files.
    #[serde(default = "default_storage_disk")]
    pub storage_disk: String,

    /// Disk the finished archive is published to.
    pub destination_disk: String,

    /// Include the environment file (and with it the application secrets) in the archive.
    #[serde(default)]
    pub include_env: bool,

    /// Regular expressions matched against file names to exclude from the archive.
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,
}

fn default_storage_disk() -> String {
    "local".into()
}

fn default_ignore_patterns() -> Vec<String> {
    vec![r"^\.gitignore$".into()]
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            temporary_directory: "storage/backup-temp".into(),
            storage_disk: default_storage_disk(),
            destination_disk: "backup".into(),
            include_env: false,
            ignore_patterns: default_ignore_patterns(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Complete configuration.
pub struct Config {
    #[serde(default)]
    pub application: Application,

    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub dump: DumpConfig,

    #[serde(default)]
    pub disks: Disks,
}

/// Errors on reading the configuration file.
#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("Reading the config file {} failed: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[display("Parsing the config file {} failed: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl Config {
    /// Reads the configuration at `path`.
    ///
    /// If the file doesn't exist yet the default configuration is written to it and returned.
    pub fn load_or_init(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(config_str) => toml::from_str(&config_str).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!(
                    "Writing default config to {} because it doesn't exist yet",
                    path.display()
                );
                let default_config = Self::default();
                match toml::to_string_pretty(&default_config) {
                    Ok(config_str) => {
                        if let Err(e) = fs::write(path, config_str) {
                            log::warn!("Writing default config to {} failed {e}", path.display());
                        }
                    }
                    Err(e) => log::warn!("Serializing the default config failed: {e}"),
                }

                Ok(default_config)
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}
