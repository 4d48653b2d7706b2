//! Error types for the realms layer.

use std::time::Duration;

use realmgate_retry::RetryError;

use crate::DirectoryError;

/// Errors that stop the resolver from producing an address.
///
/// A missing target realm is *not* here: that's an expected outcome,
/// reported as [`RealmSelection::NotFound`](crate::RealmSelection).
#[derive(Debug, thiserror::Error)]
pub enum RealmError {
    /// A directory call failed fatally or ran out of retries.
    #[error("realm directory {operation} failed after {attempts} attempt(s): {source}")]
    Directory {
        operation: &'static str,
        attempts: u32,
        #[source]
        source: DirectoryError,
    },

    /// Every attempt of a directory call hit the per-attempt timeout.
    #[error("realm directory {operation} timed out after {attempts} attempt(s) ({timeout:?} each)")]
    DirectoryTimedOut {
        operation: &'static str,
        attempts: u32,
        timeout: Duration,
    },

    /// The directory returned an address that can't be connected to.
    /// Never retried: the directory broke its contract.
    #[error("unusable realm address {raw}: {reason}")]
    AddressFormat { raw: String, reason: String },
}

impl RealmError {
    pub(crate) fn from_retry(
        operation: &'static str,
        err: RetryError<DirectoryError>,
    ) -> Self {
        match err {
            RetryError::Permanent { attempt, source } => Self::Directory {
                operation,
                attempts: attempt,
                source,
            },
            RetryError::Exhausted { attempts, source } => Self::Directory {
                operation,
                attempts,
                source,
            },
            RetryError::TimedOut { attempts, timeout } => {
                Self::DirectoryTimedOut {
                    operation,
                    attempts,
                    timeout,
                }
            }
        }
    }
}
