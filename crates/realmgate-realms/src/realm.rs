//! Realm listing entries and their state.

use std::fmt;

use realmgate_protocol::RealmId;
use serde::{Deserialize, Serialize};

/// A realm as listed by the directory.
///
/// A read-only snapshot: only used to pick a realm and look up its
/// address, never kept afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmDescriptor {
    pub id: RealmId,
    pub name: String,
    pub state: RealmState,
}

impl RealmDescriptor {
    /// Shorthand constructor.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        state: RealmState,
    ) -> Self {
        Self {
            id: RealmId::new(id),
            name: name.into(),
            state,
        }
    }
}

/// What the directory says about a realm's availability.
///
/// Directories use upper-case names on the wire (`"OPEN"`,
/// `"CLOSED"`). States this build doesn't know about decode as
/// [`RealmState::Unknown`] instead of failing the whole listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RealmState {
    /// Accepting players.
    Open,
    /// Closed by its owner.
    Closed,
    /// Subscription lapsed.
    Expired,
    /// Anything else.
    #[serde(other)]
    Unknown,
}

impl RealmState {
    /// Returns `true` if the directory reports the realm as joinable.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for RealmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Expired => write!(f, "expired"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}
