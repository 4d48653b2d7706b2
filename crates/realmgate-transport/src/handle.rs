//! The caller's side of a live session, and the transport's side that
//! feeds it.
//!
//! [`session_channel`] creates a connected pair:
//!
//! ```text
//! transport task                         caller
//! ┌───────────────┐   SessionEvent    ┌───────────────┐
//! │ SessionDriver │ ────────────────► │ SessionHandle │
//! │               │ ◄──────────────── │               │
//! └───────────────┘   close request   └───────────────┘
//! ```
//!
//! The handle applies the [`SessionState`] machine to everything it
//! receives, so callers never see a second `Joined` or anything after a
//! terminal event, whatever the transport does.

use realmgate_protocol::ResolvedAddress;
use tokio::sync::{mpsc, oneshot};

use crate::{SessionEvent, SessionState, TransportError};

/// How many undelivered events a session buffers before the transport
/// task waits for the caller.
pub const EVENT_BUFFER: usize = 16;

/// Creates a connected [`SessionDriver`] / [`SessionHandle`] pair for a
/// session to `address`.
pub fn session_channel(
    address: ResolvedAddress,
) -> (SessionDriver, SessionHandle) {
    let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
    let (close_tx, close_rx) = oneshot::channel();

    let driver = SessionDriver {
        events: event_tx,
        close: Some(close_rx),
    };
    let handle = SessionHandle {
        address,
        state: SessionState::Connecting,
        events: event_rx,
        close: Some(close_tx),
    };
    (driver, handle)
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// A session handed off to a transport.
///
/// Events are pulled with [`next_event`](Self::next_event). Once it has
/// returned a `Disconnected` or `Errored` event the handle is spent:
/// every later call returns `None`. Reconnecting means running the
/// pipeline again, since realm addresses rotate.
///
/// Dropping the handle asks the transport to close the session.
#[derive(Debug)]
pub struct SessionHandle {
    address: ResolvedAddress,
    state: SessionState,
    events: mpsc::Receiver<SessionEvent>,
    close: Option<oneshot::Sender<()>>,
}

impl SessionHandle {
    /// The address this session connected to.
    pub fn address(&self) -> &ResolvedAddress {
        &self.address
    }

    /// The state after the last delivered event.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns `true` once a terminal event has been delivered.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Waits for the next lifecycle event.
    ///
    /// Events the state machine doesn't allow are dropped with a debug
    /// log. If the transport stops without reporting a terminal event,
    /// a synthetic `Errored { DriverGone }` is delivered instead, so
    /// every session ends with exactly one terminal event.
    ///
    /// Returns `None` after the terminal event.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        if self.state.is_terminal() {
            return None;
        }

        while let Some(event) = self.events.recv().await {
            match self.state.transition(&event) {
                Some(next) => {
                    tracing::debug!(
                        address = %self.address,
                        from = ?self.state,
                        to = ?next,
                        event = event.kind(),
                        "session event"
                    );
                    self.state = next;
                    return Some(event);
                }
                None => {
                    tracing::debug!(
                        address = %self.address,
                        state = ?self.state,
                        event = event.kind(),
                        "dropping event not allowed in current state"
                    );
                }
            }
        }

        tracing::warn!(address = %self.address, "session driver vanished without a final event");
        self.state = SessionState::Errored;
        Some(SessionEvent::Errored {
            error: TransportError::DriverGone,
        })
    }

    /// Asks the transport to close the session gracefully. The transport
    /// answers with `Disconnected { reason: Normal }` unless the session
    /// already ended.
    ///
    /// Returns `false` if a close was already requested or the
    /// transport is gone.
    pub fn close(&mut self) -> bool {
        match self.close.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionDriver
// ---------------------------------------------------------------------------

/// The transport's end of a session: emits events, watches for close
/// requests.
#[derive(Debug)]
pub struct SessionDriver {
    events: mpsc::Sender<SessionEvent>,
    close: Option<oneshot::Receiver<()>>,
}

impl SessionDriver {
    /// Delivers `event` to the handle. Returns `false` if the handle has
    /// been dropped.
    pub async fn emit(&self, event: SessionEvent) -> bool {
        self.events.send(event).await.is_ok()
    }

    /// Resolves once the handle asks for a close or is dropped.
    ///
    /// Cancel-safe, so it can sit in a `select!` loop. After it has
    /// resolved once, later calls resolve immediately.
    pub async fn close_requested(&mut self) {
        if let Some(rx) = self.close.as_mut() {
            let _ = rx.await;
            self.close = None;
        }
    }

    /// Returns `true` if the handle has been dropped.
    pub fn is_detached(&self) -> bool {
        self.events.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use realmgate_protocol::DisconnectReason;

    fn address() -> ResolvedAddress {
        ResolvedAddress::new("203.0.113.5", 19132).unwrap()
    }

    #[tokio::test]
    async fn test_next_event_delivers_in_order() {
        let (driver, mut handle) = session_channel(address());
        driver
            .emit(SessionEvent::Joined {
                session_id: "s-1".into(),
            })
            .await;
        driver
            .emit(SessionEvent::Disconnected {
                reason: DisconnectReason::Timeout,
            })
            .await;

        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Joined { .. })
        ));
        assert_eq!(handle.state(), SessionState::Joined);
        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Disconnected {
                reason: DisconnectReason::Timeout
            })
        ));
        assert!(handle.is_terminal());
    }

    #[tokio::test]
    async fn test_next_event_after_terminal_returns_none() {
        let (driver, mut handle) = session_channel(address());
        driver
            .emit(SessionEvent::Disconnected {
                reason: DisconnectReason::Normal,
            })
            .await;
        driver
            .emit(SessionEvent::Joined {
                session_id: "late".into(),
            })
            .await;

        assert!(handle.next_event().await.is_some());
        assert!(handle.next_event().await.is_none());
        assert!(handle.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_next_event_duplicate_join_dropped() {
        let (driver, mut handle) = session_channel(address());
        for id in ["a", "b"] {
            driver
                .emit(SessionEvent::Joined {
                    session_id: id.into(),
                })
                .await;
        }
        driver
            .emit(SessionEvent::Disconnected {
                reason: DisconnectReason::Normal,
            })
            .await;

        match handle.next_event().await {
            Some(SessionEvent::Joined { session_id }) => assert_eq!(session_id, "a"),
            other => panic!("expected Joined, got {other:?}"),
        }
        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Disconnected { .. })
        ));
    }

    #[tokio::test]
    async fn test_next_event_driver_dropped_yields_errored_once() {
        let (driver, mut handle) = session_channel(address());
        drop(driver);

        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Errored {
                error: TransportError::DriverGone
            })
        ));
        assert_eq!(handle.state(), SessionState::Errored);
        assert!(handle.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_close_signals_driver_once() {
        let (mut driver, mut handle) = session_channel(address());

        assert!(handle.close());
        assert!(!handle.close());
        // Resolves immediately since the request is already there.
        driver.close_requested().await;
        driver.close_requested().await;
    }

    #[tokio::test]
    async fn test_close_requested_on_handle_drop() {
        let (mut driver, handle) = session_channel(address());
        drop(handle);

        driver.close_requested().await;
        assert!(driver.is_detached());
        assert!(
            !driver
                .emit(SessionEvent::Joined {
                    session_id: "x".into()
                })
                .await
        );
    }

    #[test]
    fn test_session_channel_starts_connecting() {
        let (_driver, handle) = session_channel(address());
        assert_eq!(handle.state(), SessionState::Connecting);
        assert_eq!(handle.address(), &address());
        assert!(!handle.is_terminal());
    }
}
