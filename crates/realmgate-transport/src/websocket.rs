//! WebSocket reference transport using `tokio-tungstenite`.
//!
//! One task per session. The task mints a service token from the auth
//! context, connects, sends [`ClientPacket::Login`] and waits for the
//! realm host's answer. After `Joined` it relays packets until the
//! host disconnects, the socket fails, or the caller closes.
//!
//! Packets are JSON, one per binary frame (text frames are accepted
//! too).

use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use realmgate_auth::{AuthContext, IdentityProvider};
use realmgate_protocol::{
    ClientPacket, Codec, DisconnectReason, JsonCodec, ResolvedAddress,
    ServerPacket, PROTOCOL_VERSION,
};
use tokio_tungstenite::tungstenite::{self, Message};

use crate::{
    session_channel, ConnectionRequest, SessionDriver, SessionEvent,
    SessionHandle, SessionTransport, TransportError,
};

/// Upper bound on connect + login + first answer.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Audience of the service token presented in the login packet.
pub const DEFAULT_SESSION_AUDIENCE: &str = "realm-host";

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// A [`SessionTransport`] that talks to realm hosts over `ws://`.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    connect_timeout: Duration,
    audience: String,
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            audience: DEFAULT_SESSION_AUDIENCE.to_string(),
        }
    }
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds the handshake. Hitting it ends the session with
    /// `Disconnected { reason: Timeout }`.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the audience used to mint the login token.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// The URL a session to `address` connects to. IPv6 hosts are
    /// bracketed.
    pub fn url_for(address: &ResolvedAddress) -> String {
        format!("ws://{address}")
    }
}

impl SessionTransport for WebSocketTransport {
    fn connect<P: IdentityProvider>(
        &self,
        request: ConnectionRequest<P>,
    ) -> Result<SessionHandle, TransportError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| TransportError::NoRuntime)?;

        let (address, auth) = request.into_parts();
        let (driver, handle) = session_channel(address.clone());
        let session = Session {
            url: Self::url_for(&address),
            auth,
            audience: self.audience.clone(),
            connect_timeout: self.connect_timeout,
            codec: JsonCodec,
        };

        tracing::info!(url = %session.url, account = %session.auth.account(), "starting realm session");
        runtime.spawn(session.run(driver));
        Ok(handle)
    }
}

// ---------------------------------------------------------------------------
// Session task
// ---------------------------------------------------------------------------

struct Session<P> {
    url: String,
    auth: Arc<AuthContext<P>>,
    audience: String,
    connect_timeout: Duration,
    codec: JsonCodec,
}

enum Handshake {
    Joined { ws: WsStream, session_id: String },
    Refused(DisconnectReason),
}

enum Step<T> {
    Ready(T),
    CloseRequested,
}

impl<P: IdentityProvider> Session<P> {
    async fn run(self, mut driver: SessionDriver) {
        let step = tokio::select! {
            result = tokio::time::timeout(self.connect_timeout, self.handshake()) => {
                Step::Ready(result)
            }
            () = driver.close_requested() => Step::CloseRequested,
        };

        let (mut ws, session_id) = match step {
            Step::CloseRequested => {
                tracing::info!(url = %self.url, "session closed before join");
                driver
                    .emit(SessionEvent::Disconnected {
                        reason: DisconnectReason::Normal,
                    })
                    .await;
                return;
            }
            Step::Ready(Err(_elapsed)) => {
                tracing::warn!(url = %self.url, timeout = ?self.connect_timeout, "handshake timed out");
                driver
                    .emit(SessionEvent::Disconnected {
                        reason: DisconnectReason::Timeout,
                    })
                    .await;
                return;
            }
            Step::Ready(Ok(Err(error))) => {
                tracing::warn!(url = %self.url, %error, "handshake failed");
                driver.emit(SessionEvent::Errored { error }).await;
                return;
            }
            Step::Ready(Ok(Ok(Handshake::Refused(reason)))) => {
                tracing::warn!(url = %self.url, %reason, "realm host refused the session");
                driver.emit(SessionEvent::Disconnected { reason }).await;
                return;
            }
            Step::Ready(Ok(Ok(Handshake::Joined { ws, session_id }))) => {
                (ws, session_id)
            }
        };

        tracing::info!(url = %self.url, %session_id, "session joined");
        if !driver.emit(SessionEvent::Joined { session_id }).await {
            self.close(&mut ws).await;
            return;
        }

        loop {
            let step = tokio::select! {
                packet = recv_packet(&mut ws, &self.codec) => Step::Ready(packet),
                () = driver.close_requested() => Step::CloseRequested,
            };

            let event = match step {
                Step::CloseRequested => {
                    self.close(&mut ws).await;
                    SessionEvent::Disconnected {
                        reason: DisconnectReason::Normal,
                    }
                }
                Step::Ready(Ok(Some(ServerPacket::Disconnect { reason }))) => {
                    tracing::info!(url = %self.url, %reason, "realm host ended the session");
                    SessionEvent::Disconnected { reason }
                }
                Step::Ready(Ok(Some(ServerPacket::Joined { .. }))) => {
                    tracing::debug!(url = %self.url, "ignoring repeated Joined");
                    continue;
                }
                Step::Ready(Ok(None)) => {
                    tracing::info!(url = %self.url, "realm host closed the connection");
                    SessionEvent::Disconnected {
                        reason: DisconnectReason::Normal,
                    }
                }
                Step::Ready(Err(error)) => {
                    tracing::warn!(url = %self.url, %error, "session failed");
                    SessionEvent::Errored { error }
                }
            };

            driver.emit(event).await;
            return;
        }
    }

    async fn handshake(&self) -> Result<Handshake, TransportError> {
        // Mint before dialing so an auth failure never opens a socket.
        let token = self.auth.service_token(&self.audience).await?;

        let (mut ws, _response) =
            tokio_tungstenite::connect_async(self.url.as_str())
                .await
                .map_err(|e| TransportError::ConnectFailed {
                    url: self.url.clone(),
                    source: io_error(ErrorKind::ConnectionRefused, e),
                })?;

        let login = ClientPacket::Login {
            protocol_version: PROTOCOL_VERSION,
            account: self.auth.account().clone(),
            token: token.as_str().to_string(),
        };
        send_packet(&mut ws, &self.codec, &login).await?;
        tracing::debug!(url = %self.url, "login sent");

        match recv_packet(&mut ws, &self.codec).await? {
            Some(ServerPacket::Joined { session_id }) => {
                Ok(Handshake::Joined { ws, session_id })
            }
            Some(ServerPacket::Disconnect { reason }) => {
                Ok(Handshake::Refused(reason))
            }
            None => Ok(Handshake::Refused(DisconnectReason::HandshakeRejected {
                message: "connection closed before join".into(),
            })),
        }
    }

    /// Best-effort goodbye; the session is over either way.
    async fn close(&self, ws: &mut WsStream) {
        let goodbye = ClientPacket::Disconnect {
            reason: DisconnectReason::Normal,
        };
        if let Err(error) = send_packet(ws, &self.codec, &goodbye).await {
            tracing::debug!(url = %self.url, %error, "goodbye not delivered");
        }
        if let Err(error) = ws.close(None).await {
            tracing::debug!(url = %self.url, %error, "close frame not delivered");
        }
        tracing::info!(url = %self.url, "session closed by client");
    }
}

async fn send_packet(
    ws: &mut WsStream,
    codec: &JsonCodec,
    packet: &ClientPacket,
) -> Result<(), TransportError> {
    let bytes = codec.encode(packet).map_err(TransportError::Codec)?;
    ws.send(Message::Binary(bytes.into()))
        .await
        .map_err(|e| TransportError::SendFailed(io_error(ErrorKind::BrokenPipe, e)))
}

/// Next packet from the host, or `None` on close. Cancel-safe.
async fn recv_packet(
    ws: &mut WsStream,
    codec: &JsonCodec,
) -> Result<Option<ServerPacket>, TransportError> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Binary(data))) => {
                return codec.decode(&data).map(Some).map_err(TransportError::Codec);
            }
            Some(Ok(Message::Text(text))) => {
                return codec
                    .decode(text.as_bytes())
                    .map(Some)
                    .map_err(TransportError::Codec);
            }
            Some(Ok(Message::Close(_))) | None => return Ok(None),
            Some(Ok(_)) => continue, // ping/pong/frame
            Some(Err(e)) => {
                return Err(TransportError::ReceiveFailed(io_error(
                    ErrorKind::ConnectionReset,
                    e,
                )));
            }
        }
    }
}

fn io_error(kind: ErrorKind, e: tungstenite::Error) -> std::io::Error {
    std::io::Error::new(kind, e)
}
