//! Token types: what the identity provider issues and what the cache
//! stores.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use realmgate_protocol::AccountId;
use serde::{Deserialize, Serialize};

/// An opaque token blob issued by the identity provider.
///
/// Realmgate never looks inside. `Debug` prints only the length so
/// tokens don't leak into logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityToken(String);

impl IdentityToken {
    /// Wraps a raw token.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw token, for handing to a collaborator.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for IdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityToken(<{} bytes>)", self.0.len())
    }
}

/// A freshly issued token and (if the provider said) when it expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: IdentityToken,
    pub expires_at: Option<DateTime<Utc>>,
}

impl IssuedToken {
    /// Converts into the cache's representation for `account`.
    pub fn into_entry(self, account: AccountId) -> TokenCacheEntry {
        TokenCacheEntry {
            account,
            token: self.token,
            expires_at: self.expires_at,
        }
    }
}

/// One persisted token.
///
/// At most one entry exists per account; saving a new entry replaces
/// the old one (last write wins).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCacheEntry {
    pub account: AccountId,
    pub token: IdentityToken,
    /// `None` means the provider didn't say. Such entries are treated as
    /// valid until the provider rejects them.
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenCacheEntry {
    /// Returns `true` if the token is still usable at `now`, treating
    /// anything that expires within `skew` as already expired.
    pub fn is_valid_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        let Some(expires_at) = self.expires_at else {
            return true;
        };
        let skew = chrono::Duration::from_std(skew)
            .unwrap_or_else(|_| chrono::Duration::zero());
        expires_at > now + skew
    }
}
