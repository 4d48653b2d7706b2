//! Error types for the protocol layer.
//!
//! Each crate in Realmgate defines its own error enum. A `ProtocolError`
//! always means the problem is in turning values into bytes (or back),
//! or in a value that breaks one of the protocol's shape rules.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, or a
    /// packet type this build doesn't know about.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A host/port pair that can't be connected to: empty host,
    /// port 0, and so on.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}
