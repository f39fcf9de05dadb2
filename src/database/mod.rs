//! Resolution of the active database connection.
//!
//! Connections are configured either with structured fields or with a single
//! connection url. Both forms are normalized into a [ConnectionConfig].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use derive_more::{Display, Error};

mod connection_url;

/// Database engines a dump can be created for.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq)]
pub enum Driver {
    #[display("mysql")]
    MySql,
    #[display("mariadb")]
    MariaDb,
    #[display("pgsql")]
    PostgreSql,
    #[display("sqlite")]
    Sqlite,
}

impl Driver {
    /// Port used when the connection doesn't name one.
    ///
    /// SQLite has no notion of a port, `0` is used as placeholder.
    pub fn default_port(self) -> u16 {
        match self {
            Self::MySql | Self::MariaDb => 3306,
            Self::PostgreSql => 5432,
            Self::Sqlite => 0,
        }
    }
}

/// Driver name doesn't match any supported database engine.
#[derive(Debug, Display, Error)]
#[display("Driver is unknown: {_0}")]
pub struct UnknownDriver(#[error(ignore)] String);

impl FromStr for Driver {
    type Err = UnknownDriver;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(Self::MySql),
            "mariadb" => Ok(Self::MariaDb),
            "pgsql" | "postgresql" => Ok(Self::PostgreSql),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(UnknownDriver(other.to_string())),
        }
    }
}

/// The configured connection can't be turned into a [ConnectionConfig].
#[derive(Debug, Display, Error)]
pub enum UnsupportedDriverError {
    /// No settings exist for the named connection.
    #[display("Database connection '{_0}' is not configured")]
    UnknownConnection(#[error(ignore)] String),
    /// Neither the settings nor the url name a driver.
    #[display("Database connection '{connection}' has no driver")]
    MissingDriver { connection: String },
    /// The driver isn't one of the supported engines.
    #[display("Unsupported driver for {connection}: {source}")]
    Unsupported {
        connection: String,
        source: UnknownDriver,
    },
    /// The connection url isn't parseable.
    #[display("Unsupported driver for {connection}: invalid url: {source}")]
    InvalidUrl {
        connection: String,
        source: ::url::ParseError,
    },
    /// No database name (or SQLite file) configured.
    #[display("Database connection '{connection}' names no database")]
    MissingDatabase { connection: String },
}

/// Hosts may be configured as a list (e.g. read replicas); only the first one is dumped from.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Hosts {
    One(String),
    Many(Vec<String>),
}

impl Hosts {
    fn first(&self) -> Option<&str> {
        match self {
            Self::One(host) => Some(host.as_str()),
            Self::Many(hosts) => hosts.first().map(String::as_str),
        }
    }
}

/// Raw settings of a single connection as found in the configuration file.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConnectionSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    /// Connection url, its components take precedence over the other fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<Hosts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Database section of the configuration.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DatabaseConfig {
    /// Name of the active connection.
    pub default: String,
    pub connections: BTreeMap<String, ConnectionSettings>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let sqlite = ConnectionSettings {
            driver: Some("sqlite".into()),
            database: Some("database/database.sqlite".into()),
            ..Default::default()
        };

        Self {
            default: "sqlite".into(),
            connections: BTreeMap::from([("sqlite".to_string(), sqlite)]),
        }
    }
}

impl DatabaseConfig {
    /// Resolves the active connection.
    pub fn active_connection(&self) -> Result<ConnectionConfig, UnsupportedDriverError> {
        let settings = self
            .connections
            .get(&self.default)
            .ok_or_else(|| UnsupportedDriverError::UnknownConnection(self.default.clone()))?;

        ConnectionConfig::resolve(&self.default, settings)
    }
}

/// Normalized connection a dumper is configured with.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub driver: Driver,
    pub host: String,
    pub database: String,
    pub username: String,
    pub password: String,
    pub port: u16,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .field("port", &self.port)
            .finish()
    }
}

impl ConnectionConfig {
    /// Normalizes the `settings` of the connection named `connection`.
    pub fn resolve(
        connection: &str,
        settings: &ConnectionSettings,
    ) -> Result<Self, UnsupportedDriverError> {
        let settings = match &settings.url {
            Some(url) => connection_url::merge(settings, url).map_err(|source| {
                UnsupportedDriverError::InvalidUrl {
                    connection: connection.to_string(),
                    source,
                }
            })?,
            None => settings.clone(),
        };

        let driver: Driver = settings
            .driver
            .as_deref()
            .ok_or_else(|| UnsupportedDriverError::MissingDriver {
                connection: connection.to_string(),
            })?
            .parse()
            .map_err(|source| UnsupportedDriverError::Unsupported {
                connection: connection.to_string(),
                source,
            })?;

        let database = settings
            .database
            .filter(|db| !db.is_empty())
            .ok_or_else(|| UnsupportedDriverError::MissingDatabase {
                connection: connection.to_string(),
            })?;

        let host = settings
            .host
            .as_ref()
            .and_then(Hosts::first)
            .unwrap_or_default()
            .to_string();

        let config = Self {
            driver,
            host,
            database,
            username: settings.username.unwrap_or_default(),
            password: settings.password.unwrap_or_default(),
            port: settings.port.unwrap_or_else(|| driver.default_port()),
        };
        log::debug!(target: "database", "Resolved connection '{connection}': {config:?}");

        Ok(config)
    }
}
