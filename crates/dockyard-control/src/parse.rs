//! Parsing of environment and port strings from run requests.
//!
//! Both parsers are all-or-nothing: one malformed entry rejects the whole
//! batch.

use std::collections::BTreeMap;

use dockyard_core::PortBinding;
use thiserror::Error;

/// Errors produced while parsing request strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// An environment entry is not exactly one `key=value` pair.
    #[error("invalid environment entry {0:?}: expected key=value")]
    Environment(String),

    /// A port entry is not of the form `<proto>/<host>:<container>`.
    #[error("invalid port entry {0:?}: expected <proto>/<host>:<container>")]
    PortFormat(String),

    /// A port number is not an integer in `0..=65535`.
    #[error("invalid port number {value:?} in {entry:?}")]
    PortNumber {
        /// The whole entry.
        entry: String,
        /// The offending port text.
        value: String,
    },
}

/// Parse `key=value` entries into an environment map.
///
/// Each entry must contain exactly one `=`; values containing `=` are
/// rejected. Empty keys and values are accepted. A repeated key keeps the
/// last value.
///
/// # Errors
///
/// Returns `ParseError::Environment` for the first malformed entry.
pub fn parse_environment<I>(entries: I) -> Result<BTreeMap<String, String>, ParseError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut environment = BTreeMap::new();
    for entry in entries {
        let entry = entry.as_ref();
        let parts: Vec<&str> = entry.split('=').collect();
        let [key, value] = parts.as_slice() else {
            return Err(ParseError::Environment(entry.to_string()));
        };
        environment.insert((*key).to_string(), (*value).to_string());
    }
    Ok(environment)
}

/// Parse `<proto>/<host>:<container>` entries into port bindings.
///
/// An empty host or container side maps to port 0.
///
/// # Errors
///
/// Returns an error for the first entry that is malformed or carries a
/// non-numeric or out-of-range port.
pub fn parse_ports<I>(entries: I) -> Result<Vec<PortBinding>, ParseError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    entries
        .into_iter()
        .map(|entry| parse_port(entry.as_ref()))
        .collect()
}

fn parse_port(entry: &str) -> Result<PortBinding, ParseError> {
    let format_error = || ParseError::PortFormat(entry.to_string());

    let parts: Vec<&str> = entry.split('/').collect();
    let [proto, mapping] = parts.as_slice() else {
        return Err(format_error());
    };

    let sides: Vec<&str> = mapping.split(':').collect();
    let [host, container] = sides.as_slice() else {
        return Err(format_error());
    };

    Ok(PortBinding {
        proto: (*proto).to_string(),
        host_port: port_number(entry, host)?,
        container_port: port_number(entry, container)?,
    })
}

fn port_number(entry: &str, value: &str) -> Result<u16, ParseError> {
    if value.is_empty() {
        return Ok(0);
    }
    value.parse().map_err(|_| ParseError::PortNumber {
        entry: entry.to_string(),
        value: value.to_string(),
    })
}
