//! Core types shared across Realmgate.
//!
//! This module holds the identity newtypes, the normalized network
//! address, and the packets the reference transport exchanges with a
//! realm host.

use std::fmt;
use std::net::Ipv6Addr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// The login protocol version the reference transport speaks.
/// Realm hosts reject logins that carry any other version.
pub const PROTOCOL_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The account a set of credentials belongs to (usually an email).
///
/// Newtype over `String` so it can't be confused with a [`RealmId`] or
/// with a secret. `#[serde(transparent)]` keeps the JSON form a plain
/// string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Wraps an account identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A realm's identifier as assigned by the realm directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RealmId(String);

impl RealmId {
    /// Wraps a realm identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RealmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ResolvedAddress
// ---------------------------------------------------------------------------

/// A normalized, connectable `{host, port}` pair.
///
/// The fields are private: the only way to build one is
/// [`ResolvedAddress::new`], which enforces
///
/// - a non-empty host without whitespace,
/// - a host containing `:` must be a valid IPv6 literal (surrounding
///   brackets are stripped),
/// - a port in `1..=65535`.
///
/// Whatever shape the realm directory returned, once it's a
/// `ResolvedAddress` it looks the same.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedAddress {
    host: String,
    port: u16,
}

impl ResolvedAddress {
    /// Validates and builds an address.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidAddress`] if the host is empty,
    /// contains whitespace, is a malformed IPv6 literal, or the port is 0.
    pub fn new(host: &str, port: u16) -> Result<Self, ProtocolError> {
        let host = host.trim();
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        if host.is_empty() {
            return Err(ProtocolError::InvalidAddress("empty host".into()));
        }
        if host.chars().any(char::is_whitespace) {
            return Err(ProtocolError::InvalidAddress(format!(
                "host {host:?} contains whitespace"
            )));
        }
        if host.contains(':') && host.parse::<Ipv6Addr>().is_err() {
            return Err(ProtocolError::InvalidAddress(format!(
                "host {host:?} contains ':' but is not an IPv6 literal"
            )));
        }
        if port == 0 {
            return Err(ProtocolError::InvalidAddress(
                "port must be in 1..=65535".into(),
            ));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    /// The host name or IP literal (IPv6 without brackets).
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The port, always non-zero.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns `true` if the host is an IPv6 literal.
    pub fn is_ipv6(&self) -> bool {
        self.host.contains(':')
    }
}

/// Formats as `host:port`, bracketing IPv6 hosts (`[::1]:19132`) so the
/// output is unambiguous.
impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ipv6() {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

// ---------------------------------------------------------------------------
// DisconnectReason
// ---------------------------------------------------------------------------

/// Why a session ended.
///
/// Carried by the realm host's `Disconnect` packet and by the
/// transport's `Disconnected` lifecycle event. Internally tagged so the
/// JSON looks like `{ "kind": "Kicked", "message": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum DisconnectReason {
    /// Either side closed the session on purpose.
    Normal,

    /// The realm host removed the player.
    Kicked { message: String },

    /// No response within the allowed time (handshake or keep-alive).
    Timeout,

    /// The peer sent something the protocol doesn't allow.
    Protocol { detail: String },

    /// The realm host refused the login before the session went live.
    HandshakeRejected { message: String },
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal close"),
            Self::Kicked { message } => write!(f, "kicked: {message}"),
            Self::Timeout => write!(f, "timed out"),
            Self::Protocol { detail } => write!(f, "protocol error: {detail}"),
            Self::HandshakeRejected { message } => {
                write!(f, "handshake rejected: {message}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Packets
// ---------------------------------------------------------------------------

/// Client → realm host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientPacket {
    /// First packet on a new connection. `token` is a service token
    /// minted from the authentication context for the realm host.
    Login {
        protocol_version: u32,
        account: AccountId,
        token: String,
    },

    /// The client is leaving.
    Disconnect { reason: DisconnectReason },
}

/// Realm host → client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerPacket {
    /// Login accepted; the session is live.
    Joined { session_id: String },

    /// The realm host is ending (or refusing) the session.
    Disconnect { reason: DisconnectReason },
}
