//! The realm resolver: list, select, resolve.

use realmgate_auth::{AuthContext, IdentityProvider};
use realmgate_protocol::ResolvedAddress;
use realmgate_retry::{retry, RetryConfig};
use std::time::Duration;

use crate::{
    normalize_address, RealmDescriptor, RealmDirectory, RealmError,
};

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// How to pick one realm out of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Exact, case-sensitive match on the realm's name. No trimming, no
    /// fuzzy matching.
    ExactName(String),
}

impl SelectionPolicy {
    /// Shorthand for [`SelectionPolicy::ExactName`].
    pub fn exact_name(name: impl Into<String>) -> Self {
        Self::ExactName(name.into())
    }

    /// The name the policy is looking for.
    pub fn target(&self) -> &str {
        match self {
            Self::ExactName(name) => name,
        }
    }
}

/// The result of [`select_realm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealmSelection {
    /// Exactly one realm matched.
    Found(RealmDescriptor),

    /// No realm matched. `available` lists the names that were there,
    /// for error messages.
    NotFound {
        target: String,
        available: Vec<String>,
    },

    /// More than one realm has the target name. The caller must
    /// disambiguate; picking one silently could join the wrong world.
    Ambiguous {
        target: String,
        matches: Vec<RealmDescriptor>,
    },
}

impl RealmSelection {
    /// The selected realm, if exactly one matched.
    pub fn found(self) -> Option<RealmDescriptor> {
        match self {
            Self::Found(realm) => Some(realm),
            _ => None,
        }
    }
}

/// Applies `policy` to `realms`.
///
/// Consumes the listing: the snapshot isn't needed after selection.
pub fn select_realm(
    realms: Vec<RealmDescriptor>,
    policy: &SelectionPolicy,
) -> RealmSelection {
    let target = policy.target();
    let available: Vec<String> = realms.iter().map(|r| r.name.clone()).collect();

    let mut matches: Vec<RealmDescriptor> = match policy {
        SelectionPolicy::ExactName(name) => {
            realms.into_iter().filter(|r| &r.name == name).collect()
        }
    };

    match matches.len() {
        0 => RealmSelection::NotFound {
            target: target.to_string(),
            available,
        },
        1 => RealmSelection::Found(matches.remove(0)),
        _ => RealmSelection::Ambiguous {
            target: target.to_string(),
            matches,
        },
    }
}

// ---------------------------------------------------------------------------
// RealmResolver
// ---------------------------------------------------------------------------

/// Default retry settings for directory calls: two attempts, 15s each.
pub fn default_directory_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 2,
        initial_delay: Duration::from_millis(250),
        attempt_timeout: Duration::from_secs(15),
        ..RetryConfig::default()
    }
}

/// Turns an [`AuthContext`] into a [`ResolvedAddress`] for one realm,
/// using a [`RealmDirectory`].
///
/// Every directory call runs under a bounded retry (default: 2
/// attempts, 15s per attempt). Only [`DirectoryError`]s that report
/// themselves transient are retried.
///
/// [`DirectoryError`]: crate::DirectoryError
pub struct RealmResolver<D> {
    directory: D,
    retry: RetryConfig,
}

impl<D: RealmDirectory> RealmResolver<D> {
    /// Creates a resolver with default retry settings.
    pub fn new(directory: D) -> Self {
        Self::with_retry(directory, default_directory_retry())
    }

    /// Creates a resolver with explicit retry settings.
    pub fn with_retry(directory: D, retry: RetryConfig) -> Self {
        Self { directory, retry }
    }

    /// The underlying directory.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Lists the account's realms.
    ///
    /// # Errors
    /// [`RealmError::Directory`] or [`RealmError::DirectoryTimedOut`].
    pub async fn list_realms<P: IdentityProvider>(
        &self,
        auth: &AuthContext<P>,
    ) -> Result<Vec<RealmDescriptor>, RealmError> {
        let realms = retry(&self.retry, "realm listing", |_| {
            self.directory.list_realms(auth)
        })
        .await
        .map_err(|e| RealmError::from_retry("listing", e))?;

        tracing::info!(
            account = %auth.account(),
            count = realms.len(),
            names = ?realms.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            "realms listed"
        );
        Ok(realms)
    }

    /// Picks a realm from `realms`. See [`select_realm`].
    pub fn select_realm(
        &self,
        realms: Vec<RealmDescriptor>,
        policy: &SelectionPolicy,
    ) -> RealmSelection {
        select_realm(realms, policy)
    }

    /// Looks up and normalizes `realm`'s address.
    ///
    /// # Errors
    /// - [`RealmError::Directory`] / [`RealmError::DirectoryTimedOut`]:
    ///   the lookup failed
    /// - [`RealmError::AddressFormat`]: the directory's answer can't be
    ///   parsed (not retried)
    pub async fn resolve_address<P: IdentityProvider>(
        &self,
        auth: &AuthContext<P>,
        realm: &RealmDescriptor,
    ) -> Result<ResolvedAddress, RealmError> {
        let raw = retry(&self.retry, "realm address lookup", |_| {
            self.directory.get_address(auth, &realm.id)
        })
        .await
        .map_err(|e| RealmError::from_retry("address lookup", e))?;

        tracing::debug!(realm = %realm.id, raw = %raw, "raw realm address");

        let address = normalize_address(&raw)?;
        tracing::info!(realm = %realm.id, name = %realm.name, %address, "realm address resolved");
        Ok(address)
    }
}
