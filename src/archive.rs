//! Assembly of the zip archive holding a backup.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use derive_more::{Display, Error};
use regex::Regex;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::storage::Disk;

/// Entry name of the database dump inside the archive.
pub const DATABASE_ENTRY: &str = "database.sql";

/// Entry name of the environment file inside the archive.
pub const ENV_ENTRY: &str = ".env";

/// Errors on writing the backup archive.
#[derive(Debug, Display, Error)]
pub enum ArchiveWriteError {
    /// Listing the files of the storage disk failed.
    #[display("Listing files of disk '{disk}' failed: {source}")]
    Listing { disk: String, source: io::Error },
    /// The archive file couldn't be created.
    #[display("Opening archive {} failed: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    /// A file to be archived couldn't be read.
    #[display("Reading {} failed: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    /// Writing an entry failed.
    #[display("Writing entry {entry} failed: {source}")]
    Entry { entry: String, source: ZipError },
    /// Closing the archive failed.
    #[display("Closing archive failed: {source}")]
    Finish { source: ZipError },
}

/// File names excluded from the backup, e.g. `.gitignore` placeholders.
#[derive(Clone, Debug)]
pub struct IgnoreMarkers(Vec<Regex>);

impl IgnoreMarkers {
    pub fn new(patterns: &[String]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<_, _>>()?;

        Ok(Self(patterns))
    }

    /// Returns if the file at the `/` separated `path` is an ignore-marker.
    pub fn is_match(&self, path: &str) -> bool {
        let name = path.rsplit('/').next().unwrap_or(path);
        self.0.iter().any(|re| re.is_match(name))
    }
}

/// Collects the entries of a backup archive.
///
/// Entries are unique by their name, adding an entry twice replaces the source.
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    entries: BTreeMap<String, PathBuf>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the file at `source` as `entry`.
    pub fn add_file(&mut self, source: impl Into<PathBuf>, entry: impl Into<String>) -> &mut Self {
        let entry = entry.into();
        let source = source.into();
        log::trace!(target: "backup::archive", "Including file: {} -> {entry}", source.display());

        if let Some(replaced) = self.entries.insert(entry.clone(), source) {
            log::warn!(target: "backup::archive", "Entry {entry} replaces {}", replaced.display());
        }

        self
    }

    /// Adds every file of the `disk` except the ignore-markers.
    ///
    /// Files below `exclude` are skipped as well, which keeps a scratch
    /// directory placed inside the storage out of the archive.
    pub fn add_disk(
        &mut self,
        disk: &dyn Disk,
        ignore: &IgnoreMarkers,
        exclude: Option<&Path>,
    ) -> Result<&mut Self, ArchiveWriteError> {
        let files = disk.all_files().map_err(|source| ArchiveWriteError::Listing {
            disk: disk.name().to_string(),
            source,
        })?;

        for file in files {
            if ignore.is_match(&file) {
                log::trace!(target: "backup::archive", "Skipping ignore-marker {file}");
                continue;
            }

            let source = disk.path(&file);
            if exclude.is_some_and(|exclude| source.starts_with(exclude)) {
                log::trace!(target: "backup::archive", "Skipping excluded {file}");
                continue;
            }
            self.add_file(source, file);
        }

        Ok(self)
    }

    /// Names of all entries collected so far.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Writes and closes the archive at `path`.
    ///
    /// An existing file at `path` is overwritten.
    /// Returns the number of written entries.
    pub fn write(self, path: &Path) -> Result<usize, ArchiveWriteError> {
        let file = File::create(path).map_err(|source| ArchiveWriteError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mut zip = ZipWriter::new(file);

        for (entry, source) in &self.entries {
            let read_error = |source_err| ArchiveWriteError::Read {
                path: source.clone(),
                source: source_err,
            };
            let source_file = File::open(source).map_err(read_error)?;
            let size = source_file.metadata().map_err(read_error)?.len();

            let options = SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .large_file(size >= u64::from(u32::MAX));
            zip.start_file(entry.as_str(), options)
                .map_err(|source| ArchiveWriteError::Entry {
                    entry: entry.clone(),
                    source,
                })?;

            io::copy(&mut BufReader::new(source_file), &mut zip).map_err(|source| {
                ArchiveWriteError::Entry {
                    entry: entry.clone(),
                    source: source.into(),
                }
            })?;
            log::debug!(target: "backup::archive", "Archived {entry} ({size} bytes)");
        }

        zip.finish()
            .map_err(|source| ArchiveWriteError::Finish { source })?;

        Ok(self.entries.len())
    }
}
