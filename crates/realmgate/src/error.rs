//! Unified error type for the Realmgate pipeline.

use std::fmt;

use realmgate_auth::AuthError;
use realmgate_realms::RealmError;
use realmgate_transport::TransportError;

/// The pipeline stage an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Configuration,
    Authentication,
    RealmListing,
    RealmSelection,
    AddressResolution,
    SessionHandoff,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "configuration",
            Self::Authentication => "authentication",
            Self::RealmListing => "realm listing",
            Self::RealmSelection => "realm selection",
            Self::AddressResolution => "address resolution",
            Self::SessionHandoff => "session handoff",
        };
        f.write_str(name)
    }
}

/// The single terminal failure of a pipeline run.
///
/// Each variant belongs to one [`Stage`] (see [`stage`](Self::stage)) and
/// keeps the lower layer's error as its `source()`, so the full cause
/// chain survives.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Bad or missing input. Fix the input; retrying won't help.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The account could not be authenticated.
    #[error("authentication failed: {0}")]
    Authentication(#[source] AuthError),

    /// The realm directory could not list realms.
    #[error("realm listing failed: {0}")]
    RealmListing(#[source] RealmError),

    /// No realm has the target name.
    #[error("realm {target:?} not found (available: {available:?})")]
    RealmNotFound {
        target: String,
        available: Vec<String>,
    },

    /// More than one realm has the target name.
    #[error("realm name {target:?} is ambiguous ({count} realms match)")]
    AmbiguousRealm { target: String, count: usize },

    /// The chosen realm's address could not be looked up or parsed.
    #[error("address resolution failed: {0}")]
    AddressResolution(#[source] RealmError),

    /// The transport refused to start the session.
    #[error("session handoff failed: {0}")]
    Handoff(#[source] TransportError),

    /// The run was aborted through its [`AbortHandle`](crate::AbortHandle).
    #[error("pipeline aborted before {before}")]
    Aborted { before: Stage },
}

impl PipelineError {
    /// The stage that failed.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Configuration(_) => Stage::Configuration,
            Self::Authentication(_) => Stage::Authentication,
            Self::RealmListing(_) => Stage::RealmListing,
            Self::RealmNotFound { .. } | Self::AmbiguousRealm { .. } => {
                Stage::RealmSelection
            }
            Self::AddressResolution(_) => Stage::AddressResolution,
            Self::Handoff(_) => Stage::SessionHandoff,
            Self::Aborted { before } => *before,
        }
    }

    /// Returns `true` if the directory handed out an unparseable
    /// address.
    pub fn is_address_format(&self) -> bool {
        matches!(
            self,
            Self::AddressResolution(RealmError::AddressFormat { .. })
        )
    }
}

/// Credential problems surface as configuration errors, everything else
/// as authentication errors.
impl From<AuthError> for PipelineError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Configuration(msg) => Self::Configuration(msg),
            other => Self::Authentication(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_from_auth_configuration_maps_to_configuration() {
        let err: PipelineError =
            AuthError::Configuration("account secret is missing".into()).into();
        assert!(matches!(err, PipelineError::Configuration(_)));
        assert_eq!(err.stage(), Stage::Configuration);
        assert!(err.to_string().contains("secret is missing"));
    }

    #[test]
    fn test_from_auth_rejected_keeps_source() {
        let err: PipelineError = AuthError::Rejected("bad password".into()).into();
        assert_eq!(err.stage(), Stage::Authentication);
        let source = err.source().expect("source should be chained");
        assert!(source.to_string().contains("bad password"));
    }

    #[test]
    fn test_stage_for_selection_failures() {
        let not_found = PipelineError::RealmNotFound {
            target: "Main realm".into(),
            available: vec!["Other".into()],
        };
        let ambiguous = PipelineError::AmbiguousRealm {
            target: "Main realm".into(),
            count: 2,
        };
        assert_eq!(not_found.stage(), Stage::RealmSelection);
        assert_eq!(ambiguous.stage(), Stage::RealmSelection);
        assert!(not_found.to_string().contains("Other"));
    }

    #[test]
    fn test_is_address_format_only_for_parse_failures() {
        let bad = PipelineError::AddressResolution(RealmError::AddressFormat {
            raw: "nohostnoport".into(),
            reason: "missing port".into(),
        });
        assert!(bad.is_address_format());
        assert_eq!(bad.stage(), Stage::AddressResolution);

        let handoff = PipelineError::Handoff(TransportError::NoRuntime);
        assert!(!handoff.is_address_format());
        assert_eq!(handoff.stage(), Stage::SessionHandoff);
    }

    #[test]
    fn test_aborted_reports_next_stage() {
        let err = PipelineError::Aborted {
            before: Stage::AddressResolution,
        };
        assert_eq!(err.stage(), Stage::AddressResolution);
        assert_eq!(err.to_string(), "pipeline aborted before address resolution");
    }
}
