//! Session lifecycle events and the state machine they drive.

use realmgate_protocol::DisconnectReason;

use crate::TransportError;

/// Something that happened to a session.
///
/// Delivered in order, once each, through
/// [`SessionHandle::next_event`](crate::SessionHandle::next_event).
#[derive(Debug)]
pub enum SessionEvent {
    /// The handshake completed; the session is live.
    Joined { session_id: String },

    /// The session ended. Terminal.
    Disconnected { reason: DisconnectReason },

    /// A fatal transport-level failure. Terminal.
    Errored { error: TransportError },
}

impl SessionEvent {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Joined { .. } => "joined",
            Self::Disconnected { .. } => "disconnected",
            Self::Errored { .. } => "errored",
        }
    }
}

/// Where a session is in its lifecycle.
///
/// ```text
/// Connecting ──► Joined ──► Disconnected
///     │             │
///     │             └─────► Errored
///     ├───────────────────► Disconnected   (rejected before join)
///     └───────────────────► Errored
/// ```
///
/// `Disconnected` and `Errored` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Joined,
    Disconnected,
    Errored,
}

impl SessionState {
    /// Returns `true` for `Disconnected` and `Errored`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Errored)
    }

    /// The state `event` moves this state to, or `None` if the event is
    /// not allowed here (a second `Joined`, anything after a terminal
    /// state).
    pub fn transition(&self, event: &SessionEvent) -> Option<SessionState> {
        match (self, event) {
            (Self::Connecting, SessionEvent::Joined { .. }) => Some(Self::Joined),
            (Self::Connecting | Self::Joined, SessionEvent::Disconnected { .. }) => {
                Some(Self::Disconnected)
            }
            (Self::Connecting | Self::Joined, SessionEvent::Errored { .. }) => {
                Some(Self::Errored)
            }
            _ => None,
        }
    }
}
