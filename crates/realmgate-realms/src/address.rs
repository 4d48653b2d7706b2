//! Address shapes returned by realm directories, and their
//! normalization into [`ResolvedAddress`].
//!
//! Directories disagree on how to return an address: some send a
//! structured `{ "host": ..., "port": ... }` object, others a single
//! `"host:port"` string. Both must produce the same
//! [`ResolvedAddress`].
//!
//! # Parsing `"host:port"` strings
//!
//! The string is split on its **last** colon. The part before it is the
//! host:
//!
//! | Input                | Result                          |
//! |----------------------|---------------------------------|
//! | `203.0.113.5:19132`  | `203.0.113.5`, `19132`          |
//! | `realm.example:1`    | `realm.example`, `1`            |
//! | `[2001:db8::1]:19132`| `2001:db8::1`, `19132`          |
//! | `2001:db8::1:19132`  | error: unbracketed IPv6 host    |
//! | `[realm.example]:1`  | error: brackets on a non-IPv6 host |
//! | `realm.example:+1`   | error: port must be digits only |
//! | `nohostnoport`       | error: no port                  |
//!
//! An unbracketed host containing colons can't be told apart from a
//! host plus extra port-like segments, so it is rejected rather than
//! guessed. Directories that return IPv6 hosts must bracket them or use
//! the structured form.

use realmgate_protocol::ResolvedAddress;
use serde::{Deserialize, Serialize};

use crate::RealmError;

/// An address exactly as the realm directory returned it.
///
/// `#[serde(untagged)]` lets either JSON shape decode into this enum:
/// an object becomes `Structured`, a string becomes `Text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAddress {
    /// `{ "host": "...", "port": 19132 }`. The port is wider than `u16`
    /// so out-of-range values surface as a format error, not a decode
    /// failure.
    Structured { host: String, port: u32 },
    /// `"host:port"`.
    Text(String),
}

impl RawAddress {
    /// Shorthand for the structured form.
    pub fn structured(host: impl Into<String>, port: u32) -> Self {
        Self::Structured {
            host: host.into(),
            port,
        }
    }

    /// Shorthand for the string form.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }
}

impl std::fmt::Display for RawAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Structured { host, port } => {
                write!(f, "{{host: {host:?}, port: {port}}}")
            }
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

/// Normalizes a directory address into a [`ResolvedAddress`].
///
/// Pure function: the same input always yields the same output.
///
/// # Errors
/// Returns [`RealmError::AddressFormat`] if the address can't be parsed
/// or fails validation (empty host, port outside `1..=65535`).
pub fn normalize_address(raw: &RawAddress) -> Result<ResolvedAddress, RealmError> {
    let format_error = |reason: String| RealmError::AddressFormat {
        raw: raw.to_string(),
        reason,
    };

    let (host, port) = match raw {
        RawAddress::Structured { host, port } => {
            let port = u16::try_from(*port).map_err(|_| {
                format_error(format!("port {port} is outside 1..=65535"))
            })?;
            (host.as_str(), port)
        }
        RawAddress::Text(s) => split_host_port(s).map_err(format_error)?,
    };

    ResolvedAddress::new(host, port).map_err(|e| format_error(e.to_string()))
}

/// Splits `"host:port"` on the last colon.
fn split_host_port(s: &str) -> Result<(&str, u16), String> {
    let s = s.trim();
    let Some((host, port)) = s.rsplit_once(':') else {
        return Err("expected \"<host>:<port>\"".into());
    };

    let bracketed = host.starts_with('[') && host.ends_with(']');
    if bracketed && !host.contains(':') {
        return Err("only IPv6 hosts may be bracketed".into());
    }
    if !bracketed && host.contains(':') {
        return Err(
            "host contains ':' but is not a bracketed IPv6 literal".into(),
        );
    }

    // `u16::from_str` also takes a leading '+'.
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("port {port:?} is not a number in 1..=65535"));
    }
    let port: u16 = port
        .parse()
        .map_err(|_| format!("port {port:?} is not a number in 1..=65535"))?;

    Ok((host, port))
}
