//! Dump backends for the supported database engines.
//!
//! Currently the following backends are implemented:
//!
//! - [MySql]: Dump of MySQL and MariaDB databases using `mysqldump`.
//! - [PostgreSql]: Dump of PostgreSQL databases using `pg_dump`.
//! - [Sqlite]: Dump of SQLite database files using `sqlite3`.

pub mod mysql;
pub mod postgresql;
pub mod sqlite;

pub use mysql::MySql;
pub use postgresql::PostgreSql;
pub use sqlite::Sqlite;

use std::fmt::Debug;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use derive_more::{Display, Error};

use crate::database::{ConnectionConfig, Driver};

/// Errors on dumping the database.
#[derive(Debug, Display, Error)]
pub enum DumpFailedError {
    /// The dump program couldn't be started.
    #[display("Running {program} failed: {source}")]
    NotRun { program: String, source: io::Error },
    /// The dump program exited unsuccessfully.
    #[display("{program} failed with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    /// The database file to dump doesn't exist.
    #[display("Database file {} doesn't exist", path.display())]
    MissingDatabase { path: PathBuf },
    /// The dump file or a helper file couldn't be written.
    #[display("Writing {} failed: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Generic database dumper.
pub trait Dumper: Debug {
    /// Name of the program creating the dump.
    fn program(&self) -> &'static str;

    /// Configures the connection to dump.
    ///
    /// Settings meaningless to the engine are ignored.
    fn configure(&mut self, connection: &ConnectionConfig);

    /// Writes a complete dump of the database to `path`.
    ///
    /// Blocks until the dump program exits. On error no file is left at `path`.
    fn dump_to_file(&self, path: &Path) -> Result<(), DumpFailedError>;
}

/// Settings shared by all dump backends.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DumpConfig {
    /// Directory containing the dump programs.
    ///
    /// If unset the programs are looked up in `PATH`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_path: Option<PathBuf>,
}

impl DumpConfig {
    fn command(&self, program: &str) -> Command {
        match &self.binary_path {
            Some(dir) => Command::new(dir.join(program)),
            None => Command::new(program),
        }
    }
}

impl Driver {
    /// Creates the dumper handling databases of this driver.
    pub fn dumper(self, config: &DumpConfig) -> Box<dyn Dumper> {
        match self {
            Self::MySql | Self::MariaDb => Box::new(MySql::new(config.clone())),
            Self::PostgreSql => Box::new(PostgreSql::new(config.clone())),
            Self::Sqlite => Box::new(Sqlite::new(config.clone())),
        }
    }
}

/// Creates a configured dumper for the `connection`.
pub fn dumper_for(connection: &ConnectionConfig, config: &DumpConfig) -> Box<dyn Dumper> {
    let mut dumper = connection.driver.dumper(config);
    dumper.configure(connection);
    log::debug!(target: "backup::dump", "Selected {} for {} connection", dumper.program(), connection.driver);

    dumper
}

/// Runs `command` and writes its stdout to `path`.
///
/// A partially written file is removed if the command fails.
pub(crate) fn run_dump(mut command: Command, path: &Path) -> Result<(), DumpFailedError> {
    let result = spawn_dump(&mut command, path);

    if result.is_err() && path.exists() {
        if let Err(e) = fs::remove_file(path) {
            log::warn!(target: "backup::dump", "Removing partial dump {} failed: {e}", path.display());
        }
    }

    result
}

fn spawn_dump(command: &mut Command, path: &Path) -> Result<(), DumpFailedError> {
    let program = command.get_program().to_string_lossy().into_owned();

    let dump_file = File::create(path).map_err(|source| DumpFailedError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    log::trace!(target: "backup::dump", "Running: {command:?}");
    let dump_process = command
        .stdin(Stdio::null())
        .stdout(Stdio::from(dump_file))
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| DumpFailedError::NotRun {
            program: program.clone(),
            source,
        })?;
    log::trace!(target: "backup::dump", "Started {program} process.");

    let output = dump_process
        .wait_with_output()
        .map_err(|source| DumpFailedError::NotRun {
            program: program.clone(),
            source,
        })?;
    let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();

    if !output.status.success() {
        return Err(DumpFailedError::CommandFailed {
            program,
            status: output.status,
            stderr,
        });
    }

    // relay stderr
    if !stderr.is_empty() {
        log::warn!(target: "backup::dump", "{stderr}");
    }
    log::info!(target: "backup::dump", "Finished database dump.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(driver: Driver) -> ConnectionConfig {
        ConnectionConfig {
            driver,
            host: "db.local".into(),
            database: "app".into(),
            username: "backup".into(),
            password: "secret".into(),
            port: driver.default_port(),
        }
    }

    #[test]
    fn test_dumper_selection() {
        for (driver, program) in [
            (Driver::MySql, "mysqldump"),
            (Driver::MariaDb, "mysqldump"),
            (Driver::PostgreSql, "pg_dump"),
            (Driver::Sqlite, "sqlite3"),
        ] {
            let dumper = dumper_for(&connection(driver), &DumpConfig::default());
            assert_eq!(dumper.program(), program, "{driver}");
        }
    }

    #[test]
    fn test_binary_path() {
        let config = DumpConfig {
            binary_path: Some("/opt/db/bin".into()),
        };
        let command = config.command("pg_dump");
        assert_eq!(command.get_program(), "/opt/db/bin/pg_dump");
    }

    #[test]
    fn test_missing_program() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("database.sql");

        let err = run_dump(Command::new("surely-not-an-installed-dump-program"), &path).unwrap_err();
        assert!(matches!(err, DumpFailedError::NotRun { .. }), "{err}");
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_program_leaves_no_dump() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("database.sql");

        let mut command = Command::new("sh");
        command.arg("-c").arg("echo partial; echo access denied >&2; exit 2");
        let err = run_dump(command, &path).unwrap_err();

        match err {
            DumpFailedError::CommandFailed { status, stderr, .. } => {
                assert_eq!(status.code(), Some(2));
                assert_eq!(stderr, "access denied");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_stdout_is_written_to_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("database.sql");

        let mut command = Command::new("sh");
        command.arg("-c").arg("echo 'CREATE TABLE notes (id INTEGER);'");
        run_dump(command, &path).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "CREATE TABLE notes (id INTEGER);\n"
        );
    }
}
