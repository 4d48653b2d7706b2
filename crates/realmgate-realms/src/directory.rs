//! The realm directory seam.
//!
//! The directory is the external service that knows which realms an
//! account can see and where each one is hosted. Realmgate only calls
//! it; implementations live outside this crate (an HTTP client in
//! production, a fixed table in tests).

use std::future::Future;

use realmgate_auth::{AuthContext, AuthError, IdentityProvider};
use realmgate_protocol::RealmId;
use realmgate_retry::Transient;

use crate::{RawAddress, RealmDescriptor};

/// Errors reported by a [`RealmDirectory`].
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// Network failure or an overloaded directory. Retried.
    #[error("realm directory unavailable: {0}")]
    Unavailable(String),

    /// The realm host is still starting up and has no address yet.
    /// Retried.
    #[error("realm {0} is not ready yet")]
    NotReady(RealmId),

    /// The directory refused the account's token. Fatal.
    #[error("realm directory rejected the request: {0}")]
    Rejected(String),

    /// The realm vanished between listing and address lookup. Fatal.
    #[error("realm {0} is unknown to the directory")]
    UnknownRealm(RealmId),

    /// Minting the directory's service token failed. Fatal.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl Transient for DirectoryError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::NotReady(_))
    }
}

/// An external service that lists realms and resolves their addresses.
///
/// Both operations receive the caller's [`AuthContext`]; implementations
/// typically call [`AuthContext::service_token`] to get a token scoped to
/// the directory.
pub trait RealmDirectory: Send + Sync + 'static {
    /// Lists every realm visible to the authenticated account. An empty
    /// list is a valid answer.
    fn list_realms<P: IdentityProvider>(
        &self,
        auth: &AuthContext<P>,
    ) -> impl Future<Output = Result<Vec<RealmDescriptor>, DirectoryError>> + Send;

    /// Looks up where `realm` is currently hosted, in whatever shape the
    /// directory uses.
    fn get_address<P: IdentityProvider>(
        &self,
        auth: &AuthContext<P>,
        realm: &RealmId,
    ) -> impl Future<Output = Result<RawAddress, DirectoryError>> + Send;
}
