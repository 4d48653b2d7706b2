//! Session handoff for Realmgate.
//!
//! Once the pipeline has an [`AuthContext`] and a [`ResolvedAddress`], it
//! packs them into a [`ConnectionRequest`] and hands that to a
//! [`SessionTransport`]. The transport starts the handshake in the
//! background and returns a [`SessionHandle`] immediately; everything
//! after that arrives as [`SessionEvent`]s.
//!
//! # Feature Flags
//!
//! - `websocket` (default): reference transport over WebSocket via
//!   `tokio-tungstenite`

mod error;
mod event;
mod handle;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use event::{SessionEvent, SessionState};
pub use handle::{session_channel, SessionDriver, SessionHandle, EVENT_BUFFER};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketTransport, DEFAULT_CONNECT_TIMEOUT, DEFAULT_SESSION_AUDIENCE};

use std::fmt;
use std::sync::Arc;

use realmgate_auth::{AuthContext, IdentityProvider};
use realmgate_protocol::ResolvedAddress;

/// Everything a transport needs to open a session.
///
/// Built once per pipeline run and consumed by
/// [`SessionTransport::connect`]. The auth context is shared, not moved:
/// the caller keeps its own `Arc` for the life of the session.
pub struct ConnectionRequest<P> {
    address: ResolvedAddress,
    auth: Arc<AuthContext<P>>,
}

impl<P: IdentityProvider> ConnectionRequest<P> {
    pub fn new(address: ResolvedAddress, auth: Arc<AuthContext<P>>) -> Self {
        Self { address, auth }
    }

    pub fn address(&self) -> &ResolvedAddress {
        &self.address
    }

    pub fn auth(&self) -> &Arc<AuthContext<P>> {
        &self.auth
    }

    pub fn into_parts(self) -> (ResolvedAddress, Arc<AuthContext<P>>) {
        (self.address, self.auth)
    }
}

impl<P> fmt::Debug for ConnectionRequest<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRequest")
            .field("address", &self.address)
            .field("auth", &self.auth)
            .finish()
    }
}

/// Opens protocol sessions to realm hosts.
///
/// `connect` must not wait for the handshake: it starts the work (usually
/// by spawning a task that owns a [`SessionDriver`]) and returns the
/// matching [`SessionHandle`] right away.
pub trait SessionTransport: Send + Sync + 'static {
    /// Starts a session for `request`.
    ///
    /// # Errors
    /// Only for failures that prevent the attempt from starting at all.
    /// Anything that goes wrong later is reported as a [`SessionEvent`].
    fn connect<P: IdentityProvider>(
        &self,
        request: ConnectionRequest<P>,
    ) -> Result<SessionHandle, TransportError>;
}
