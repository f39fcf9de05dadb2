use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::Disk;

/// A [Disk] backed by a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalDisk {
    name: String,
    root: PathBuf,
}

impl LocalDisk {
    pub fn new(name: &str, root: PathBuf) -> Self {
        if root.is_relative() {
            log::warn!(target: "storage::local", "Root of disk '{name}' is relative: {}", root.display());
        }

        Self {
            name: name.to_string(),
            root,
        }
    }
}

impl Disk for LocalDisk {
    fn name(&self) -> &str {
        &self.name
    }

    fn all_files(&self) -> io::Result<Vec<String>> {
        // a disk that was never written to simply has no files yet
        if !self.root.exists() {
            log::debug!(target: "storage::local", "Root of disk '{}' doesn't exist: {}", self.name, self.root.display());
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(io::Error::other)?;
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            log::trace!(target: "storage::local", "Found file: {relative}");
            files.push(relative);
        }
        files.sort();

        Ok(files)
    }

    fn path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    fn put_file_as(&self, dir: &str, source: &Path, name: &str) -> io::Result<String> {
        let relative = if dir.trim_matches('/').is_empty() {
            name.to_string()
        } else {
            format!("{}/{name}", dir.trim_matches('/'))
        };
        let destination = self.path(&relative);

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        log::debug!(target: "storage::local", "Copy {} to {}", source.display(), destination.display());

        // copy next to the destination first, an interrupted copy never replaces a backup
        let mut source_file = File::open(source)?;
        let directory = destination.parent().unwrap_or(self.root.as_path());
        let mut partial = tempfile::Builder::new()
            .prefix(".")
            .suffix(".part")
            .tempfile_in(directory)?;
        io::copy(&mut source_file, &mut partial)?;
        partial.as_file().sync_all()?;
        partial.persist(&destination).map_err(|e| e.error)?;

        Ok(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_files(dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir.join("b/d"))?;
        fs::write(dir.join("a.txt"), "a")?;
        fs::write(dir.join("b/.gitignore"), "*")?;
        fs::write(dir.join("b/c.txt"), "c")?;
        fs::write(dir.join("b/d/e.txt"), "e")?;
        Ok(())
    }

    #[test]
    fn test_all_files_is_recursive_and_relative() {
        let tmp = TempDir::new().unwrap();
        create_test_files(tmp.path()).unwrap();

        let disk = LocalDisk::new("local", tmp.path().to_path_buf());
        assert_eq!(
            disk.all_files().unwrap(),
            vec!["a.txt", "b/.gitignore", "b/c.txt", "b/d/e.txt"]
        );
    }

    #[test]
    fn test_all_files_of_missing_root() {
        let tmp = TempDir::new().unwrap();
        let disk = LocalDisk::new("local", tmp.path().join("missing"));
        assert!(disk.all_files().unwrap().is_empty());
    }

    #[test]
    fn test_put_file_as_overwrites() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source.zip");
        let disk = LocalDisk::new("backup", tmp.path().join("backups"));

        fs::write(&source, "first").unwrap();
        assert_eq!(disk.put_file_as("", &source, "x.zip").unwrap(), "x.zip");
        fs::write(&source, "second").unwrap();
        disk.put_file_as("", &source, "x.zip").unwrap();

        assert_eq!(fs::read_to_string(disk.path("x.zip")).unwrap(), "second");
        assert!(source.exists(), "publishing copies instead of moving");
    }

    #[test]
    fn test_failed_copy_keeps_existing_backup() {
        let tmp = TempDir::new().unwrap();
        let disk = LocalDisk::new("backup", tmp.path().join("backups"));
        let good = tmp.path().join("good.zip");
        fs::write(&good, "good").unwrap();
        disk.put_file_as("", &good, "x.zip").unwrap();

        // reading a directory fails after the copy has started
        let unreadable = tmp.path().join("unreadable");
        fs::create_dir(&unreadable).unwrap();
        assert!(disk.put_file_as("", &unreadable, "x.zip").is_err());

        assert_eq!(fs::read_to_string(disk.path("x.zip")).unwrap(), "good");
        assert_eq!(disk.all_files().unwrap(), vec!["x.zip"]);
    }

    #[test]
    fn test_put_file_as_into_dir() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source.zip");
        fs::write(&source, "zip").unwrap();

        let disk = LocalDisk::new("backup", tmp.path().join("backups"));
        assert_eq!(
            disk.put_file_as("/nightly/", &source, "x.zip").unwrap(),
            "nightly/x.zip"
        );
        assert!(tmp.path().join("backups/nightly/x.zip").is_file());
    }
}
