//! Pipeline settings and the builder that assembles a [`Pipeline`].

use realmgate_auth::{AuthConfig, Authenticator, IdentityProvider, TokenCache};
use realmgate_realms::{
    default_directory_retry, RealmDirectory, RealmResolver, SelectionPolicy,
};
use realmgate_retry::RetryConfig;
use realmgate_transport::SessionTransport;

use crate::{AbortHandle, Pipeline, PipelineError};

/// Settings for one [`Pipeline`].
///
/// Transport settings (handshake timeout, login audience) belong to the
/// transport itself, e.g.
/// [`WebSocketTransport::with_connect_timeout`](realmgate_transport::WebSocketTransport::with_connect_timeout).
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Exact, case-sensitive name of the realm to join.
    pub target_realm: String,
    /// Token exchange retry budget and cache expiry skew.
    pub auth: AuthConfig,
    /// Retry budget for realm directory calls.
    pub directory_retry: RetryConfig,
}

impl PipelineConfig {
    pub fn new(target_realm: impl Into<String>) -> Self {
        Self {
            target_realm: target_realm.into(),
            auth: AuthConfig::default(),
            directory_retry: default_directory_retry(),
        }
    }

    /// Checks the settings before any network activity.
    ///
    /// # Errors
    /// [`PipelineError::Configuration`] if the target realm name is empty.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.target_realm.is_empty() {
            return Err(PipelineError::Configuration(
                "target realm name is missing".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for a [`Pipeline`].
///
/// The four collaborators are required up front; everything else has a
/// default.
///
/// # Example
///
/// ```rust,ignore
/// use realmgate::prelude::*;
///
/// let pipeline = PipelineBuilder::new(provider, cache, directory, WebSocketTransport::new())
///     .target_realm("Main realm")
///     .build()?;
/// let outcome = pipeline.run(&credentials).await?;
/// ```
pub struct PipelineBuilder<P, C, D, T> {
    provider: P,
    cache: C,
    directory: D,
    transport: T,
    config: PipelineConfig,
    abort: AbortHandle,
}

impl<P, C, D, T> PipelineBuilder<P, C, D, T>
where
    P: IdentityProvider,
    C: TokenCache,
    D: RealmDirectory,
    T: SessionTransport,
{
    pub fn new(provider: P, cache: C, directory: D, transport: T) -> Self {
        Self {
            provider,
            cache,
            directory,
            transport,
            config: PipelineConfig::new(""),
            abort: AbortHandle::new(),
        }
    }

    /// Sets the realm to join.
    pub fn target_realm(mut self, name: impl Into<String>) -> Self {
        self.config.target_realm = name.into();
        self
    }

    /// Replaces every setting at once.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the token exchange retry budget.
    pub fn auth_retry(mut self, retry: RetryConfig) -> Self {
        self.config.auth.retry = retry;
        self
    }

    /// Sets the window before expiry in which a cached token is no
    /// longer used.
    pub fn expiry_skew(mut self, skew: std::time::Duration) -> Self {
        self.config.auth.expiry_skew = skew;
        self
    }

    /// Sets the directory retry budget.
    pub fn directory_retry(mut self, retry: RetryConfig) -> Self {
        self.config.directory_retry = retry;
        self
    }

    /// Shares an existing abort flag with the pipeline.
    pub fn abort_handle(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    /// Validates the settings and assembles the pipeline.
    ///
    /// # Errors
    /// [`PipelineError::Configuration`] if validation fails.
    pub fn build(self) -> Result<Pipeline<P, C, D, T>, PipelineError> {
        self.config.validate()?;

        let PipelineConfig {
            target_realm,
            auth,
            directory_retry,
        } = self.config;

        tracing::debug!(target_realm = %target_realm, "pipeline configured");

        Ok(Pipeline {
            authenticator: Authenticator::with_config(self.provider, self.cache, auth),
            resolver: RealmResolver::with_retry(
                self.directory,
                directory_retry.validated(),
            ),
            transport: self.transport,
            policy: SelectionPolicy::exact_name(target_realm),
            abort: self.abort,
        })
    }
}
