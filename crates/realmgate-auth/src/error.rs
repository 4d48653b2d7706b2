//! Error types for the auth layer.

use std::path::PathBuf;
use std::time::Duration;

use realmgate_protocol::ProtocolError;
use realmgate_retry::{RetryError, Transient};

/// Errors reported by an [`IdentityProvider`](crate::IdentityProvider).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The provider refused the credentials or token. Retrying with the
    /// same input will fail the same way.
    #[error("rejected by identity provider: {0}")]
    Rejected(String),

    /// A network hiccup or an overloaded provider. Worth another try.
    #[error("identity provider unavailable: {0}")]
    Transient(String),

    /// The provider answered with something that doesn't follow its own
    /// contract (missing fields, unreadable token).
    #[error("malformed identity provider response: {0}")]
    Malformed(String),
}

impl Transient for ProviderError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Errors from a [`TokenCache`](crate::TokenCache).
///
/// Always recoverable from the authenticator's point of view: a cache
/// that can't be read means a full exchange, a cache that can't be
/// written means the next run exchanges again.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Reading or writing the backing store failed.
    #[error("token cache I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The stored entry can't be decoded.
    #[error("token cache entry at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: ProtocolError,
    },

    /// An entry or key couldn't be encoded.
    #[error("token cache encode failed: {0}")]
    Encode(#[source] ProtocolError),
}

/// Errors that stop the authenticator from producing an
/// [`AuthContext`](crate::AuthContext).
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing or malformed credentials. Fatal, never retried.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The identity provider rejected the credentials. Fatal.
    #[error("authentication rejected: {0}")]
    Rejected(String),

    /// The identity provider kept failing transiently until the retry
    /// budget ran out.
    #[error("identity provider unavailable after {attempts} attempts: {source}")]
    Unavailable {
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    /// Every exchange attempt hit the per-attempt timeout.
    #[error("token exchange timed out after {attempts} attempts ({timeout:?} each)")]
    TimedOut { attempts: u32, timeout: Duration },

    /// The provider broke its contract. Fatal.
    #[error(transparent)]
    Provider(ProviderError),

    /// Minting a service token for `audience` failed.
    #[error("could not mint service token for {audience}: {source}")]
    ServiceToken {
        audience: String,
        #[source]
        source: ProviderError,
    },
}

impl From<RetryError<ProviderError>> for AuthError {
    fn from(err: RetryError<ProviderError>) -> Self {
        match err {
            RetryError::Permanent {
                source: ProviderError::Rejected(reason),
                ..
            } => Self::Rejected(reason),
            RetryError::Permanent { source, .. } => Self::Provider(source),
            RetryError::Exhausted { attempts, source } => {
                Self::Unavailable { attempts, source }
            }
            RetryError::TimedOut { attempts, timeout } => {
                Self::TimedOut { attempts, timeout }
            }
        }
    }
}
