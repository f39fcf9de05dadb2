//! Named storage disks backups are read from and published to.
//!
//! Currently the following disk drivers are implemented:
//!
//! - [LocalDisk]: A directory on the local filesystem.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::io;
use std::path::{Path, PathBuf};

use derive_more::{Display, Error};

mod local;

pub use local::LocalDisk;

/// Generic storage disk.
pub trait Disk: Debug {
    /// Name of the disk as configured.
    fn name(&self) -> &str;

    /// Lists every file stored on the disk, recursively.
    ///
    /// Paths are relative to the disk root and use `/` as separator.
    fn all_files(&self) -> io::Result<Vec<String>>;

    /// Absolute path of the `file` relative to the disk root.
    fn path(&self, file: &str) -> PathBuf;

    /// Copies the local file `source` onto the disk as `dir/name`.
    ///
    /// An existing file with the same name is overwritten.
    /// Returns the path of the stored file relative to the disk root.
    fn put_file_as(&self, dir: &str, source: &Path, name: &str) -> io::Result<String>;
}

/// Configuration of a single disk.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "driver", rename_all = "lowercase")]
pub enum DiskConfig {
    /// See [LocalDisk].
    Local { root: PathBuf },
}

/// No disk with the name is configured.
#[derive(Debug, Display, Error)]
#[display("Disk '{_0}' is not configured")]
pub struct UnknownDiskError(#[error(ignore)] pub String);

/// All configured disks by name.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Disks(BTreeMap<String, DiskConfig>);

impl Default for Disks {
    fn default() -> Self {
        Self(BTreeMap::from([
            (
                "local".to_string(),
                DiskConfig::Local {
                    root: "storage/app".into(),
                },
            ),
            (
                "backup".to_string(),
                DiskConfig::Local {
                    root: "storage/backups".into(),
                },
            ),
        ]))
    }
}

impl From<BTreeMap<String, DiskConfig>> for Disks {
    fn from(disks: BTreeMap<String, DiskConfig>) -> Self {
        Self(disks)
    }
}

impl Disks {
    /// Instantiates the disk named `name`.
    ///
    /// Relative disk roots are resolved against `base_path`.
    pub fn disk(&self, name: &str, base_path: &Path) -> Result<Box<dyn Disk>, UnknownDiskError> {
        let config = self
            .0
            .get(name)
            .ok_or_else(|| UnknownDiskError(name.to_string()))?;

        let disk = match config {
            DiskConfig::Local { root } => LocalDisk::new(name, base_path.join(root)),
        };

        Ok(Box::new(disk))
    }
}
