use chrono::NaiveDateTime;
use derive_more::Display;

/// Name of a published backup archive, e.g. `2024_05_17_0330_backup.zip`.
///
/// Runs within the same minute share the name, the latest one wins.
#[derive(Clone, Debug, Display, PartialEq, Eq, Hash)]
#[display("{_0}")]
pub struct BackupFilename(String);

impl BackupFilename {
    pub fn at(timestamp: NaiveDateTime) -> Self {
        Self(format!("{}_backup.zip", timestamp.format("%Y_%m_%d_%H%M")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
