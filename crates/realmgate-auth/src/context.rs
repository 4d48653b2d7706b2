//! The authentication context handed to downstream collaborators.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use realmgate_protocol::AccountId;
use tokio::sync::Mutex;

use crate::{AuthError, IdentityProvider, IdentityToken};

/// Where a context's identity token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// Loaded from the token cache; no provider round-trip.
    Cache,
    /// Issued by a full exchange.
    Exchange,
    /// Issued by refreshing an earlier token.
    Refresh,
}

/// Proof of identity for one account.
///
/// Produced by the [`Authenticator`](crate::Authenticator), then shared
/// read-only (usually behind an `Arc`) by the realm resolver and the
/// session transport for as long as the session lives.
///
/// Besides the account's identity token, the context can mint
/// relying-party tokens on demand with [`service_token`](Self::service_token).
/// Minted tokens are memoized per audience and can be dropped with
/// [`forget_service_token`](Self::forget_service_token) so the next call
/// derives a new one.
pub struct AuthContext<P> {
    account: AccountId,
    token: IdentityToken,
    expires_at: Option<DateTime<Utc>>,
    source: TokenSource,
    provider: Arc<P>,
    minted: Mutex<HashMap<String, IdentityToken>>,
}

impl<P: IdentityProvider> AuthContext<P> {
    pub(crate) fn new(
        account: AccountId,
        token: IdentityToken,
        expires_at: Option<DateTime<Utc>>,
        source: TokenSource,
        provider: Arc<P>,
    ) -> Self {
        Self {
            account,
            token,
            expires_at,
            source,
            provider,
            minted: Mutex::new(HashMap::new()),
        }
    }

    /// The authenticated account.
    pub fn account(&self) -> &AccountId {
        &self.account
    }

    /// The account's identity token.
    pub fn token(&self) -> &IdentityToken {
        &self.token
    }

    /// When the identity token expires, if known.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the token came from the cache, an exchange, or a refresh.
    pub fn source(&self) -> TokenSource {
        self.source
    }

    /// Returns a token for `audience`, minting it through the identity
    /// provider on first use.
    ///
    /// # Errors
    /// Returns [`AuthError::ServiceToken`] if the provider fails. Nothing
    /// is memoized in that case.
    pub async fn service_token(
        &self,
        audience: &str,
    ) -> Result<IdentityToken, AuthError> {
        let mut minted = self.minted.lock().await;
        if let Some(token) = minted.get(audience) {
            return Ok(token.clone());
        }

        let token = self
            .provider
            .service_token(&self.token, audience)
            .await
            .map_err(|source| AuthError::ServiceToken {
                audience: audience.to_string(),
                source,
            })?;

        tracing::debug!(account = %self.account, audience, "minted service token");
        minted.insert(audience.to_string(), token.clone());
        Ok(token)
    }

    /// Drops the memoized token for `audience`. Returns `true` if there
    /// was one.
    pub async fn forget_service_token(&self, audience: &str) -> bool {
        self.minted.lock().await.remove(audience).is_some()
    }
}

impl<P> fmt::Debug for AuthContext<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("account", &self.account)
            .field("token", &self.token)
            .field("expires_at", &self.expires_at)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
