use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const SCRATCH_DIR_NAME: &str = "tmp";

/// Directory holding the intermediate files of a single backup run.
///
/// The directory is removed by [delete](Self::delete), or on drop if that never happened.
#[derive(Debug)]
pub struct ScratchDirectory {
    path: PathBuf,
    deleted: bool,
}

impl ScratchDirectory {
    /// Creates the scratch directory inside `base`, clearing leftovers of a previous run.
    pub fn create(base: &Path) -> io::Result<Self> {
        let path = base.join(SCRATCH_DIR_NAME);
        if path.exists() {
            log::warn!(target: "backup", "Clearing leftover scratch directory: {}", path.display());
            fs::remove_dir_all(&path)?;
        }
        fs::create_dir_all(&path)?;
        log::debug!(target: "backup", "Created scratch directory: {}", path.display());

        Ok(Self {
            path,
            deleted: false,
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Path of `file` inside the scratch directory.
    pub fn join(&self, file: impl AsRef<Path>) -> PathBuf {
        self.path.join(file)
    }

    /// Removes the scratch directory and everything in it.
    pub fn delete(mut self) -> io::Result<()> {
        self.deleted = true;
        remove(&self.path)
    }
}

fn remove(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => {
            log::debug!(target: "backup", "Removed scratch directory: {}", path.display());
            Ok(())
        }
    }
}

impl Drop for ScratchDirectory {
    fn drop(&mut self) {
        if !self.deleted {
            if let Err(e) = remove(&self.path) {
                log::error!(target: "backup", "Removing scratch directory {} failed: {e}", self.path.display());
            }
        }
    }
}
