use std::path::Path;
use std::process::Command;

use super::{run_dump, DumpConfig, DumpFailedError, Dumper};
use crate::database::ConnectionConfig;

/// Dumps SQLite database files using the `.dump` command of `sqlite3`.
///
/// Host, port and credentials have no meaning for SQLite and are ignored.
#[derive(Debug, Default)]
pub struct Sqlite {
    config: DumpConfig,
    db_name: String,
}

impl Sqlite {
    pub fn new(config: DumpConfig) -> Self {
        Self {
            config,
            db_name: String::new(),
        }
    }

    fn command(&self) -> Command {
        let mut command = self.config.command(self.program());
        command.arg("-bail").arg(&self.db_name).arg(".dump");

        command
    }
}

impl Dumper for Sqlite {
    fn program(&self) -> &'static str {
        "sqlite3"
    }

    fn configure(&mut self, connection: &ConnectionConfig) {
        self.db_name = connection.database.clone();
    }

    fn dump_to_file(&self, path: &Path) -> Result<(), DumpFailedError> {
        log::info!(target: "backup::dump", "Create database dump of the SQLite database: {}", self.db_name);

        // sqlite3 happily dumps an empty database for a missing file
        let db_path = Path::new(&self.db_name);
        if !db_path.is_file() {
            return Err(DumpFailedError::MissingDatabase {
                path: db_path.to_path_buf(),
            });
        }

        run_dump(self.command(), path)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::database::Driver;

    fn configured(database: &Path) -> Sqlite {
        let mut dumper = Sqlite::new(DumpConfig::default());
        dumper.configure(&ConnectionConfig {
            driver: Driver::Sqlite,
            host: String::new(),
            database: database.to_string_lossy().into_owned(),
            username: String::new(),
            password: String::new(),
            port: 0,
        });
        dumper
    }

    fn sqlite3_available() -> bool {
        Command::new("sqlite3").arg("-version").output().is_ok()
    }

    #[test]
    fn test_host_and_port_are_ignored() {
        let mut dumper = Sqlite::new(DumpConfig::default());
        dumper.configure(&ConnectionConfig {
            driver: Driver::Sqlite,
            host: "db.local".into(),
            database: "/data/app.sqlite".into(),
            username: "user".into(),
            password: "secret".into(),
            port: 1234,
        });

        let args: Vec<_> = dumper
            .command()
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, vec!["-bail", "/data/app.sqlite", ".dump"]);
    }

    #[test]
    fn test_missing_database_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("database.sql");

        let err = configured(&tmp.path().join("missing.sqlite"))
            .dump_to_file(&path)
            .unwrap_err();
        assert!(matches!(err, DumpFailedError::MissingDatabase { .. }), "{err}");
        assert!(!path.exists());
    }

    #[test]
    fn test_dump_of_database_file() {
        if !sqlite3_available() {
            eprintln!("sqlite3 not installed, skipping");
            return;
        }

        let tmp = TempDir::new().unwrap();
        let database = tmp.path().join("app.sqlite");
        let status = Command::new("sqlite3")
            .arg(&database)
            .arg("CREATE TABLE notes (id INTEGER, body TEXT); INSERT INTO notes VALUES (1, 'hello');")
            .status()
            .unwrap();
        assert!(status.success());

        let path = tmp.path().join("database.sql");
        configured(&database).dump_to_file(&path).unwrap();

        let dump = fs::read_to_string(&path).unwrap();
        assert!(dump.contains("CREATE TABLE notes"), "{dump}");
        assert!(dump.contains("INSERT INTO notes VALUES(1,'hello');"), "{dump}");
    }
}
