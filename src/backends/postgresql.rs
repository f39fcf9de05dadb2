use std::path::Path;
use std::process::Command;

use super::{run_dump, DumpConfig, DumpFailedError, Dumper};
use crate::database::ConnectionConfig;

/// Dumps PostgreSQL databases in plain SQL format using `pg_dump`.
#[derive(Debug, Default)]
pub struct PostgreSql {
    config: DumpConfig,
    host: String,
    db_name: String,
    user_name: String,
    password: String,
    port: u16,
}

impl PostgreSql {
    pub fn new(config: DumpConfig) -> Self {
        Self {
            config,
            port: 5432,
            ..Default::default()
        }
    }

    fn command(&self) -> Command {
        let mut command = self.config.command(self.program());
        if !self.user_name.is_empty() {
            command.arg("-U").arg(&self.user_name);
        }
        if !self.host.is_empty() {
            command.arg("-h").arg(&self.host);
        }
        command.arg("-p").arg(self.port.to_string());
        command.arg("--no-password").arg(&self.db_name);

        // password is passed via environment, never as argument
        command.env("PGPASSWORD", &self.password);

        command
    }
}

impl Dumper for PostgreSql {
    fn program(&self) -> &'static str {
        "pg_dump"
    }

    fn configure(&mut self, connection: &ConnectionConfig) {
        self.host = connection.host.clone();
        self.db_name = connection.database.clone();
        self.user_name = connection.username.clone();
        self.password = connection.password.clone();
        self.port = connection.port;
    }

    fn dump_to_file(&self, path: &Path) -> Result<(), DumpFailedError> {
        log::info!(target: "backup::dump", "Create database dump of the PostgreSQL database: {}", self.db_name);
        log::trace!(target: "backup::dump", "Using user '{}' for backup", self.user_name);

        run_dump(self.command(), path)
    }
}
