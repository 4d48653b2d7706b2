//! The authenticator: credentials in, [`AuthContext`] out, with as few
//! identity provider round-trips as possible.
//!
//! ```text
//! authenticate(credentials)
//!     │
//!     ├─ cache.load(account) ── valid entry ──→ AuthContext (Cache)
//!     │        │
//!     │        └─ missing / expired / cache error
//!     ▼
//! retry(exchange_token) ── ok ──→ cache.save() ──→ AuthContext (Exchange)
//!     │
//!     └─ rejected / budget spent ──→ AuthError
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use realmgate_retry::{retry, RetryConfig};

use crate::{
    AuthContext, AuthError, Credentials, IdentityProvider, IssuedToken,
    Refresh, TokenCache, TokenSource,
};

/// Authenticator settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthConfig {
    /// Retry budget and per-attempt timeout for the token exchange.
    pub retry: RetryConfig,
    /// Cached tokens expiring within this window are treated as expired,
    /// so a session doesn't start on a token about to lapse. Zero by
    /// default: any unexpired cached token is used.
    pub expiry_skew: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig {
                max_attempts: 3,
                initial_delay: Duration::from_millis(500),
                attempt_timeout: Duration::from_secs(20),
                ..RetryConfig::default()
            },
            expiry_skew: Duration::ZERO,
        }
    }
}

/// Produces [`AuthContext`]s for credentials, backed by a token cache.
pub struct Authenticator<P, C> {
    provider: Arc<P>,
    cache: C,
    config: AuthConfig,
}

impl<P, C> Authenticator<P, C>
where
    P: IdentityProvider,
    C: TokenCache,
{
    /// Creates an authenticator with default settings.
    pub fn new(provider: P, cache: C) -> Self {
        Self::with_config(provider, cache, AuthConfig::default())
    }

    /// Creates an authenticator with explicit settings.
    pub fn with_config(provider: P, cache: C, config: AuthConfig) -> Self {
        Self {
            provider: Arc::new(provider),
            cache,
            config,
        }
    }

    /// The shared identity provider.
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// The token cache.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// The active settings.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Produces a context for `credentials`.
    ///
    /// A valid cached token short-circuits the identity provider
    /// entirely. Otherwise exactly one successful exchange happens
    /// (possibly after transient retries) and its token is written to
    /// the cache before returning.
    ///
    /// Cache failures are logged and treated as a miss (on load) or
    /// ignored (on save); they never fail authentication.
    ///
    /// # Errors
    /// - [`AuthError::Rejected`]: the provider refused the credentials
    /// - [`AuthError::Unavailable`] / [`AuthError::TimedOut`]: the retry
    ///   budget ran out
    /// - [`AuthError::Provider`]: the provider broke its contract
    pub async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthContext<P>, AuthError> {
        let account = credentials.account();

        match self.cache.load(account).await {
            Ok(Some(entry))
                if entry.is_valid_at(Utc::now(), self.config.expiry_skew) =>
            {
                tracing::info!(%account, "using cached identity token");
                return Ok(AuthContext::new(
                    entry.account,
                    entry.token,
                    entry.expires_at,
                    TokenSource::Cache,
                    Arc::clone(&self.provider),
                ));
            }
            Ok(Some(entry)) => {
                tracing::debug!(
                    %account,
                    expires_at = ?entry.expires_at,
                    "cached token expired"
                );
            }
            Ok(None) => tracing::debug!(%account, "no cached token"),
            Err(e) => tracing::warn!(
                %account,
                error = %e,
                "token cache unreadable, falling back to full exchange"
            ),
        }

        self.exchange(credentials).await
    }

    /// Replaces `context`'s token with a fresh one.
    ///
    /// Asks the provider to refresh the existing token first; if the
    /// provider says it's expired, falls back to a full exchange with
    /// `credentials`. The new token is cached either way.
    ///
    /// # Errors
    /// Same as [`authenticate`](Self::authenticate).
    pub async fn refresh(
        &self,
        credentials: &Credentials,
        context: &AuthContext<P>,
    ) -> Result<AuthContext<P>, AuthError> {
        let account = credentials.account();
        if account != context.account() {
            return Err(AuthError::Configuration(format!(
                "credentials for {account} can't refresh a context for {}",
                context.account()
            )));
        }

        let refreshed = retry(&self.config.retry, "token refresh", |_| {
            self.provider.refresh_token(context.token())
        })
        .await?;

        match refreshed {
            Refresh::Renewed(issued) => {
                tracing::info!(%account, "identity token refreshed");
                Ok(self.remember(credentials, issued, TokenSource::Refresh).await)
            }
            Refresh::Expired => {
                tracing::info!(%account, "token not refreshable, re-authenticating");
                self.exchange(credentials).await
            }
        }
    }

    async fn exchange(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthContext<P>, AuthError> {
        let account = credentials.account();
        tracing::info!(%account, "exchanging credentials with identity provider");

        let issued = retry(&self.config.retry, "token exchange", |attempt| {
            tracing::debug!(%account, attempt, "token exchange attempt");
            self.provider.exchange_token(credentials)
        })
        .await
        .map_err(AuthError::from)?;

        tracing::info!(%account, expires_at = ?issued.expires_at, "identity token issued");
        Ok(self.remember(credentials, issued, TokenSource::Exchange).await)
    }

    /// Writes `issued` to the cache and wraps it in a context.
    async fn remember(
        &self,
        credentials: &Credentials,
        issued: IssuedToken,
        source: TokenSource,
    ) -> AuthContext<P> {
        let entry = issued.into_entry(credentials.account().clone());
        if let Err(e) = self.cache.save(&entry).await {
            tracing::warn!(
                account = %entry.account,
                error = %e,
                "could not cache identity token, next run will re-authenticate"
            );
        }
        AuthContext::new(
            entry.account,
            entry.token,
            entry.expires_at,
            source,
            Arc::clone(&self.provider),
        )
    }
}
