//! The identity provider seam.
//!
//! Realmgate doesn't implement the credential-to-token exchange itself.
//! However many hops the provider needs (user token, title token,
//! service token...), from here it looks like one opaque operation.
//! The provider may retry internally too; the authenticator adds its
//! own bounded retry on top for failures the provider reports as
//! [`ProviderError::Transient`].

use std::future::Future;

use crate::{Credentials, IdentityToken, IssuedToken, ProviderError};

/// Outcome of [`IdentityProvider::refresh_token`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refresh {
    /// The provider issued a replacement token.
    Renewed(IssuedToken),
    /// The cached token can no longer be refreshed; a full exchange is
    /// required.
    Expired,
}

/// An external service that exchanges credentials for tokens.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` because the provider is shared (behind an
/// `Arc`) between the authenticator and every [`AuthContext`] it hands
/// out, and those contexts live as long as the session.
///
/// [`AuthContext`]: crate::AuthContext
pub trait IdentityProvider: Send + Sync + 'static {
    /// Performs the full multi-step exchange for `credentials`.
    ///
    /// # Returns
    /// - `Ok(IssuedToken)`: the account's identity token
    /// - `Err(ProviderError::Rejected)`: wrong credentials
    /// - `Err(ProviderError::Transient)`: try again later
    fn exchange_token(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<IssuedToken, ProviderError>> + Send;

    /// Trades a previously issued token for a fresh one without the
    /// secret.
    fn refresh_token(
        &self,
        token: &IdentityToken,
    ) -> impl Future<Output = Result<Refresh, ProviderError>> + Send;

    /// Derives a token scoped to one relying party (the realm directory,
    /// a realm host) from the account's identity token.
    fn service_token(
        &self,
        token: &IdentityToken,
        audience: &str,
    ) -> impl Future<Output = Result<IdentityToken, ProviderError>> + Send;
}
