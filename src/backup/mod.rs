//! The backup pipeline.
//!
//! A run dumps the database, zips the dump together with the managed storage
//! and publishes the archive to the destination disk:
//!
//! `Init → Dumped → Zipped → Published → CleanedUp`
//!
//! The scratch directory created during `Init` is removed on every exit path
//! before the outcome is reported.

use std::io;
use std::path::PathBuf;

use chrono::{Local, NaiveDateTime};
use derive_more::{Display, Error, From};

use crate::archive::{ArchiveBuilder, ArchiveWriteError, IgnoreMarkers, DATABASE_ENTRY, ENV_ENTRY};
use crate::backends::{self, DumpFailedError, Dumper};
use crate::config::Config;
use crate::database::{ConnectionConfig, Driver, UnsupportedDriverError};
use crate::storage::{Disk, UnknownDiskError};

mod filename;
mod publish;
mod scratch;

pub use filename::BackupFilename;
pub use publish::{publish, PublishFailedError};
pub use scratch::ScratchDirectory;

/// States of a backup run.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq)]
pub enum Stage {
    #[display("init")]
    Init,
    #[display("dumped")]
    Dumped,
    #[display("zipped")]
    Zipped,
    #[display("published")]
    Published,
    #[display("cleaned up")]
    CleanedUp,
}

#[derive(Debug, Display, Error, From)]
/// Errors aborting a backup run.
pub enum BackupError {
    /// The active database connection can't be dumped.
    #[display("Resolving the database connection failed: {_0}")]
    #[from]
    UnsupportedDriver(UnsupportedDriverError),
    /// A disk named in the configuration doesn't exist.
    #[display("Resolving the storage failed: {_0}")]
    #[from]
    UnknownDisk(UnknownDiskError),
    /// An ignore pattern isn't a valid regular expression.
    #[display("Invalid ignore pattern: {_0}")]
    #[from]
    IgnorePattern(regex::Error),
    /// The scratch directory couldn't be prepared.
    #[display("Preparing the scratch directory failed: {_0}")]
    Scratch(io::Error),
    /// Creating the database dump failed.
    #[display("Dumping the database failed: {_0}")]
    #[from]
    DumpFailed(DumpFailedError),
    /// Creating the archive failed.
    #[display("Zipping the backup failed: {_0}")]
    #[from]
    ArchiveWrite(ArchiveWriteError),
    /// Copying the archive to the destination failed.
    #[display("Publishing the backup failed: {_0}")]
    #[from]
    PublishFailed(PublishFailedError),
    /// The scratch directory couldn't be removed, possibly after an earlier error.
    #[display(
        "Removing the scratch directory {} failed: {source}{}",
        path.display(),
        cause.as_ref().map(|cause| format!(" (after: {cause})")).unwrap_or_default()
    )]
    Cleanup {
        path: PathBuf,
        source: io::Error,
        cause: Option<Box<BackupError>>,
    },
}

/// Outcome of a successful backup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReport {
    pub filename: BackupFilename,
    /// Disk the archive was published to.
    pub disk: String,
    /// Location of the archive on the disk.
    pub location: String,
    /// Number of archived files, including the database dump.
    pub entries: usize,
}

/// A fully resolved backup run.
#[derive(Debug)]
pub struct Backup {
    connection: ConnectionConfig,
    dumper: Box<dyn Dumper>,
    storage: Box<dyn Disk>,
    destination: Box<dyn Disk>,
    ignore: IgnoreMarkers,
    env_file: Option<PathBuf>,
    temporary_directory: PathBuf,
}

impl Backup {
    /// Resolves everything a run needs from the `config`.
    ///
    /// No files are touched, invalid configurations fail here.
    pub fn from_config(config: &Config) -> Result<Self, BackupError> {
        let mut connection = config.database.active_connection()?;
        // sqlite databases are files of the installation
        if connection.driver == Driver::Sqlite {
            connection.database = config
                .application
                .path(&connection.database)
                .to_string_lossy()
                .into_owned();
        }
        let dumper = backends::dumper_for(&connection, &config.dump);

        let base_path = config.application.base_path();
        let storage = config.disks.disk(&config.backup.storage_disk, base_path)?;
        let destination = config
            .disks
            .disk(&config.backup.destination_disk, base_path)?;
        let ignore = IgnoreMarkers::new(&config.backup.ignore_patterns)?;

        let env_file = config
            .backup
            .include_env
            .then(|| config.application.env_file());
        let temporary_directory = config
            .application
            .path(&config.backup.temporary_directory);

        Ok(Self {
            connection,
            dumper,
            storage,
            destination,
            ignore,
            env_file,
            temporary_directory,
        })
    }

    pub fn connection(&self) -> &ConnectionConfig {
        &self.connection
    }

    /// Runs the backup, named after the current local time.
    pub fn run(&self) -> Result<BackupReport, BackupError> {
        self.run_at(Local::now().naive_local())
    }

    /// Runs the backup, named after `timestamp`.
    pub fn run_at(&self, timestamp: NaiveDateTime) -> Result<BackupReport, BackupError> {
        log::info!(target: "backup", "Starting backup of {} database {}", self.connection.driver, self.connection.database);
        let scratch =
            ScratchDirectory::create(&self.temporary_directory).map_err(BackupError::Scratch)?;
        log::debug!(target: "backup", "Stage: {}", Stage::Init);

        let result = self.stages(&scratch, timestamp);

        let scratch_path = scratch.path().to_path_buf();
        let cleanup = scratch.delete();
        log::debug!(target: "backup", "Stage: {}", Stage::CleanedUp);

        match (result, cleanup) {
            (result, Ok(())) => result,
            (result, Err(source)) => Err(BackupError::Cleanup {
                path: scratch_path,
                source,
                cause: result.err().map(Box::new),
            }),
        }
    }

    fn stages(
        &self,
        scratch: &ScratchDirectory,
        timestamp: NaiveDateTime,
    ) -> Result<BackupReport, BackupError> {
        let dump_path = scratch.join(DATABASE_ENTRY);
        self.dumper.dump_to_file(&dump_path)?;
        log::debug!(target: "backup", "Stage: {}", Stage::Dumped);

        log::info!(target: "backup", "Zipping files and directories...");
        let filename = BackupFilename::at(timestamp);
        let archive_path = scratch.join(filename.as_str());

        let mut archive = ArchiveBuilder::new();
        archive.add_disk(self.storage.as_ref(), &self.ignore, Some(scratch.path()))?;
        archive.add_file(&dump_path, DATABASE_ENTRY);
        if let Some(env_file) = &self.env_file {
            archive.add_file(env_file, ENV_ENTRY);
        }
        let entries = archive.write(&archive_path)?;
        log::info!(target: "backup", "Zip was successfully created.");
        log::debug!(target: "backup", "Stage: {}", Stage::Zipped);

        let location = publish(self.destination.as_ref(), &archive_path, &filename)?;
        log::debug!(target: "backup", "Stage: {}", Stage::Published);

        Ok(BackupReport {
            filename,
            disk: self.destination.name().to_string(),
            location,
            entries,
        })
    }
}
