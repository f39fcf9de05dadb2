use std::io;
use std::path::Path;

use derive_more::{Display, Error};

use super::BackupFilename;
use crate::storage::Disk;

/// The archive couldn't be written to the destination disk.
#[derive(Debug, Display, Error)]
#[display("Writing {name} to disk '{disk}' failed: {source}")]
pub struct PublishFailedError {
    pub disk: String,
    pub name: String,
    pub source: io::Error,
}

/// Copies the sealed `archive` to the root of the `destination`.
///
/// Returns the location of the archive on the destination disk.
pub fn publish(
    destination: &dyn Disk,
    archive: &Path,
    filename: &BackupFilename,
) -> Result<String, PublishFailedError> {
    log::info!(target: "backup::publish", "Publish {filename} to disk '{}'", destination.name());

    let location = destination
        .put_file_as("", archive, filename.as_str())
        .map_err(|source| PublishFailedError {
            disk: destination.name().to_string(),
            name: filename.to_string(),
            source,
        })?;
    log::debug!(target: "backup::publish", "Published to: {}", destination.path(&location).display());

    Ok(location)
}
