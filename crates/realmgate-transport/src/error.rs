use realmgate_auth::AuthError;
use realmgate_protocol::ProtocolError;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Opening the connection to the realm host failed.
    #[error("connect to {url} failed: {source}")]
    ConnectFailed {
        url: String,
        #[source]
        source: std::io::Error,
    },

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// A packet couldn't be encoded or decoded.
    #[error("packet codec failed: {0}")]
    Codec(#[source] ProtocolError),

    /// Minting the realm host's service token failed.
    #[error("could not obtain a session token: {0}")]
    Auth(#[from] AuthError),

    /// `connect` was called outside a Tokio runtime.
    #[error("no async runtime available to drive the session")]
    NoRuntime,

    /// The task driving the session went away without a final event.
    #[error("session driver stopped unexpectedly")]
    DriverGone,
}
