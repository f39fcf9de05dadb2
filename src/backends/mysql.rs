use std::io::Write;
use std::path::Path;
use std::process::Command;

use tempfile::NamedTempFile;

use super::{run_dump, DumpConfig, DumpFailedError, Dumper};
use crate::database::ConnectionConfig;

/// Dumps MySQL and MariaDB databases using `mysqldump`.
///
/// Credentials are handed over in a private option file so that they never
/// show up in the process list.
#[derive(Debug, Default)]
pub struct MySql {
    config: DumpConfig,
    host: String,
    db_name: String,
    user_name: String,
    password: String,
    port: u16,
}

impl MySql {
    pub fn new(config: DumpConfig) -> Self {
        Self {
            config,
            port: 3306,
            ..Default::default()
        }
    }

    /// Content of the option file passed with `--defaults-extra-file`.
    fn credentials(&self) -> String {
        let quote = |value: &str| format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""));

        let mut credentials = String::from("[client]\n");
        credentials.push_str(&format!("user = {}\n", quote(&self.user_name)));
        credentials.push_str(&format!("password = {}\n", quote(&self.password)));
        credentials.push_str(&format!("port = {}\n", self.port));
        if !self.host.is_empty() {
            credentials.push_str(&format!("host = {}\n", quote(&self.host)));
        }

        credentials
    }

    fn command(&self, credentials_file: &Path) -> Command {
        let mut command = self.config.command(self.program());
        command
            .arg(format!("--defaults-extra-file={}", credentials_file.display()))
            .arg("--skip-comments")
            .arg("--extended-insert")
            .arg("--single-transaction")
            .arg(&self.db_name);

        command
    }
}

impl Dumper for MySql {
    fn program(&self) -> &'static str {
        "mysqldump"
    }

    fn configure(&mut self, connection: &ConnectionConfig) {
        self.host = connection.host.clone();
        self.db_name = connection.database.clone();
        self.user_name = connection.username.clone();
        self.password = connection.password.clone();
        self.port = connection.port;
    }

    fn dump_to_file(&self, path: &Path) -> Result<(), DumpFailedError> {
        log::info!(target: "backup::dump", "Create database dump of the MySQL database: {}", self.db_name);
        log::trace!(target: "backup::dump", "Using user '{}' for backup", self.user_name);

        let credentials_dir = path.parent().unwrap_or(Path::new("."));
        let write_credentials = || -> std::io::Result<NamedTempFile> {
            let mut credentials_file = tempfile::Builder::new()
                .prefix("mysql-credentials")
                .suffix(".cnf")
                .tempfile_in(credentials_dir)?;
            credentials_file.write_all(self.credentials().as_bytes())?;
            credentials_file.flush()?;
            Ok(credentials_file)
        };
        let credentials_file = write_credentials().map_err(|source| DumpFailedError::Io {
            path: credentials_dir.to_path_buf(),
            source,
        })?;

        run_dump(self.command(credentials_file.path()), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Driver;

    fn configured() -> MySql {
        let mut dumper = MySql::new(DumpConfig::default());
        dumper.configure(&ConnectionConfig {
            driver: Driver::MariaDb,
            host: "db.local".into(),
            database: "app".into(),
            username: "backup".into(),
            password: "se\"cret".into(),
            port: 3307,
        });
        dumper
    }

    #[test]
    fn test_credentials() {
        assert_eq!(
            configured().credentials(),
            "[client]\nuser = \"backup\"\npassword = \"se\\\"cret\"\nport = 3307\nhost = \"db.local\"\n"
        );
    }

    #[test]
    fn test_password_not_on_command_line() {
        let command = configured().command(Path::new("/tmp/credentials.cnf"));
        let args: Vec<_> = command
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            args,
            vec![
                "--defaults-extra-file=/tmp/credentials.cnf",
                "--skip-comments",
                "--extended-insert",
                "--single-transaction",
                "app",
            ]
        );
        assert_eq!(command.get_program(), "mysqldump");
    }

    /// Installs a fake `mysqldump` printing its option file and arguments.
    #[cfg(unix)]
    fn fake_mysqldump(dir: &Path) -> DumpConfig {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("mysqldump");
        fs::write(
            &script,
            r#"#!/bin/sh
for arg in "$@"; do
    case "$arg" in
        --defaults-extra-file=*) cat "${arg#--defaults-extra-file=}" ;;
    esac
done
echo "-- args: $*"
"#,
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        DumpConfig {
            binary_path: Some(dir.to_path_buf()),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_credentials_file_only_exists_during_dump() {
        use std::fs;

        let bin = tempfile::TempDir::new().unwrap();
        let scratch = tempfile::TempDir::new().unwrap();
        let mut dumper = configured();
        dumper.config = fake_mysqldump(bin.path());

        let path = scratch.path().join("database.sql");
        dumper.dump_to_file(&path).unwrap();

        let dump = fs::read_to_string(&path).unwrap();
        assert!(dump.starts_with("[client]\nuser = \"backup\"\n"), "{dump}");
        assert!(dump.contains("password = \"se\\\"cret\"\n"), "{dump}");
        let args = dump.lines().find(|line| line.starts_with("-- args:")).unwrap();
        assert!(args.ends_with("--single-transaction app"), "{args}");
        assert!(!args.contains("cret"), "{args}");

        let leftovers: Vec<_> = fs::read_dir(scratch.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(leftovers, vec!["database.sql"]);
    }
}
