use std::borrow::Cow;

use percent_encoding::percent_decode_str;
use url::{ParseError, Url};

use super::{ConnectionSettings, Hosts};

/// Scheme aliases commonly found in connection urls.
fn driver_from_scheme(scheme: &str) -> &str {
    match scheme {
        "mysql2" => "mysql",
        "postgres" | "postgresql" => "pgsql",
        "sqlite3" => "sqlite",
        other => other,
    }
}

fn decode(component: &str) -> String {
    percent_decode_str(component)
        .decode_utf8()
        .unwrap_or(Cow::Borrowed(component))
        .into_owned()
}

/// Merges the components of the connection `url` over the structured `settings`.
pub(super) fn merge(
    settings: &ConnectionSettings,
    url: &str,
) -> Result<ConnectionSettings, ParseError> {
    let url = Url::parse(url)?;
    let mut merged = settings.clone();

    merged.driver = Some(driver_from_scheme(url.scheme()).to_string());

    if let Some(host) = url.host_str().filter(|host| !host.is_empty()) {
        merged.host = Some(Hosts::One(decode(host)));
    }
    if let Some(port) = url.port() {
        merged.port = Some(port);
    }
    if !url.username().is_empty() {
        merged.username = Some(decode(url.username()));
    }
    if let Some(password) = url.password() {
        merged.password = Some(decode(password));
    }

    // only the leading slash separates the authority from the database
    let path = url.path();
    if path.len() > 1 {
        merged.database = Some(decode(&path[1..]));
    }

    Ok(merged)
}
