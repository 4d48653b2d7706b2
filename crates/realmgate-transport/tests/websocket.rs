//! Integration tests for the WebSocket reference transport.
//!
//! Each test runs a scripted realm host on a loopback port and drives a
//! real session against it.

#[cfg(feature = "websocket")]
mod websocket {
    use std::future::Future;
    use std::sync::Arc;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use realmgate_auth::{
        AuthContext, Authenticator, Credentials, IdentityProvider,
        IdentityToken, IssuedToken, MemoryTokenCache, ProviderError, Refresh,
    };
    use realmgate_protocol::{
        ClientPacket, Codec, DisconnectReason, JsonCodec, ResolvedAddress,
        ServerPacket, PROTOCOL_VERSION,
    };
    use realmgate_transport::{
        ConnectionRequest, SessionEvent, SessionState, SessionTransport,
        TransportError, WebSocketTransport,
    };
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::WebSocketStream;

    type HostWs = WebSocketStream<TcpStream>;

    // =====================================================================
    // Helpers
    // =====================================================================

    struct TestProvider {
        fail_service_token: bool,
    }

    impl IdentityProvider for TestProvider {
        async fn exchange_token(
            &self,
            _credentials: &Credentials,
        ) -> Result<IssuedToken, ProviderError> {
            Ok(IssuedToken {
                token: IdentityToken::new("identity"),
                expires_at: None,
            })
        }

        async fn refresh_token(
            &self,
            _token: &IdentityToken,
        ) -> Result<Refresh, ProviderError> {
            Ok(Refresh::Expired)
        }

        async fn service_token(
            &self,
            _token: &IdentityToken,
            audience: &str,
        ) -> Result<IdentityToken, ProviderError> {
            if self.fail_service_token {
                return Err(ProviderError::Rejected("no title access".into()));
            }
            Ok(IdentityToken::new(format!("svc:{audience}")))
        }
    }

    async fn auth_context(fail_service_token: bool) -> Arc<AuthContext<TestProvider>> {
        let creds = Credentials::new("steve@example.com", "hunter2").unwrap();
        let ctx = Authenticator::new(
            TestProvider { fail_service_token },
            MemoryTokenCache::new(),
        )
        .authenticate(&creds)
        .await
        .expect("authentication should succeed");
        Arc::new(ctx)
    }

    /// Spawns a realm host that accepts one connection and runs `script`
    /// on it.
    async fn realm_host<F, Fut>(script: F) -> (ResolvedAddress, JoinHandle<()>)
    where
        F: FnOnce(HostWs) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let task = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            script(ws).await;
        });
        (ResolvedAddress::new("127.0.0.1", port).unwrap(), task)
    }

    async fn read_packet(ws: &mut HostWs) -> ClientPacket {
        loop {
            let msg = ws
                .next()
                .await
                .expect("client should keep the stream open")
                .expect("frame should be valid");
            match msg {
                Message::Binary(data) => return JsonCodec.decode(&data).unwrap(),
                Message::Text(text) => return JsonCodec.decode(text.as_bytes()).unwrap(),
                _ => continue,
            }
        }
    }

    async fn send_packet(ws: &mut HostWs, packet: ServerPacket) {
        let bytes = JsonCodec.encode(&packet).unwrap();
        ws.send(Message::Binary(bytes.into())).await.unwrap();
    }

    async fn expect_login(ws: &mut HostWs) {
        match read_packet(ws).await {
            ClientPacket::Login {
                protocol_version,
                account,
                token,
            } => {
                assert_eq!(protocol_version, PROTOCOL_VERSION);
                assert_eq!(account.as_str(), "steve@example.com");
                assert_eq!(token, "svc:realm-host");
            }
            other => panic!("expected Login, got {other:?}"),
        }
    }

    fn joined(id: &str) -> ServerPacket {
        ServerPacket::Joined {
            session_id: id.to_string(),
        }
    }

    // =====================================================================
    // Success path
    // =====================================================================

    #[tokio::test]
    async fn test_connect_joined_then_kicked() {
        let (address, host) = realm_host(|mut ws| async move {
            expect_login(&mut ws).await;
            send_packet(&mut ws, joined("s-1")).await;
            send_packet(
                &mut ws,
                ServerPacket::Disconnect {
                    reason: DisconnectReason::Kicked {
                        message: "afk".into(),
                    },
                },
            )
            .await;
        })
        .await;

        let request = ConnectionRequest::new(address, auth_context(false).await);
        let mut handle = WebSocketTransport::new().connect(request).unwrap();
        assert_eq!(handle.state(), SessionState::Connecting);

        match handle.next_event().await {
            Some(SessionEvent::Joined { session_id }) => assert_eq!(session_id, "s-1"),
            other => panic!("expected Joined, got {other:?}"),
        }
        match handle.next_event().await {
            Some(SessionEvent::Disconnected { reason }) => assert_eq!(
                reason,
                DisconnectReason::Kicked {
                    message: "afk".into()
                }
            ),
            other => panic!("expected Disconnected, got {other:?}"),
        }
        assert!(handle.next_event().await.is_none());
        host.await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_host_close_after_join_is_normal_disconnect() {
        let (address, host) = realm_host(|mut ws| async move {
            expect_login(&mut ws).await;
            send_packet(&mut ws, joined("s-2")).await;
            ws.close(None).await.unwrap();
        })
        .await;

        let request = ConnectionRequest::new(address, auth_context(false).await);
        let mut handle = WebSocketTransport::new().connect(request).unwrap();

        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Joined { .. })
        ));
        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Disconnected {
                reason: DisconnectReason::Normal
            })
        ));
        host.await.unwrap();
    }

    #[tokio::test]
    async fn test_close_after_join_sends_goodbye_and_disconnects() {
        let (address, host) = realm_host(|mut ws| async move {
            expect_login(&mut ws).await;
            send_packet(&mut ws, joined("s-3")).await;
            assert_eq!(
                read_packet(&mut ws).await,
                ClientPacket::Disconnect {
                    reason: DisconnectReason::Normal
                }
            );
        })
        .await;

        let request = ConnectionRequest::new(address, auth_context(false).await);
        let mut handle = WebSocketTransport::new().connect(request).unwrap();

        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Joined { .. })
        ));
        assert!(handle.close());
        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Disconnected {
                reason: DisconnectReason::Normal
            })
        ));
        assert_eq!(handle.state(), SessionState::Disconnected);
        host.await.unwrap();
    }

    // =====================================================================
    // Failure paths
    // =====================================================================

    #[tokio::test]
    async fn test_connect_handshake_rejected_disconnects_without_join() {
        let (address, host) = realm_host(|mut ws| async move {
            expect_login(&mut ws).await;
            send_packet(
                &mut ws,
                ServerPacket::Disconnect {
                    reason: DisconnectReason::HandshakeRejected {
                        message: "outdated client".into(),
                    },
                },
            )
            .await;
        })
        .await;

        let request = ConnectionRequest::new(address, auth_context(false).await);
        let mut handle = WebSocketTransport::new().connect(request).unwrap();

        match handle.next_event().await {
            Some(SessionEvent::Disconnected {
                reason: DisconnectReason::HandshakeRejected { message },
            }) => assert_eq!(message, "outdated client"),
            other => panic!("expected HandshakeRejected, got {other:?}"),
        }
        assert!(handle.is_terminal());
        assert!(handle.next_event().await.is_none());
        host.await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_refused_is_errored() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let address = ResolvedAddress::new("127.0.0.1", port).unwrap();
        let request = ConnectionRequest::new(address, auth_context(false).await);
        let mut handle = WebSocketTransport::new().connect(request).unwrap();

        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Errored {
                error: TransportError::ConnectFailed { .. }
            })
        ));
        assert_eq!(handle.state(), SessionState::Errored);
    }

    #[tokio::test]
    async fn test_connect_silent_host_times_out() {
        let (address, _host) = realm_host(|mut ws| async move {
            expect_login(&mut ws).await;
            tokio::time::sleep(Duration::from_secs(30)).await;
        })
        .await;

        let request = ConnectionRequest::new(address, auth_context(false).await);
        let mut handle = WebSocketTransport::new()
            .with_connect_timeout(Duration::from_millis(200))
            .connect(request)
            .unwrap();

        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Disconnected {
                reason: DisconnectReason::Timeout
            })
        ));
    }

    #[tokio::test]
    async fn test_connect_garbage_packet_is_errored() {
        let (address, host) = realm_host(|mut ws| async move {
            expect_login(&mut ws).await;
            send_packet(&mut ws, joined("s-4")).await;
            ws.send(Message::Text("definitely not json".into()))
                .await
                .unwrap();
        })
        .await;

        let request = ConnectionRequest::new(address, auth_context(false).await);
        let mut handle = WebSocketTransport::new().connect(request).unwrap();

        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Joined { .. })
        ));
        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Errored {
                error: TransportError::Codec(_)
            })
        ));
        host.await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_service_token_failure_is_errored() {
        // Nothing listens here; the token is minted before dialing.
        let address = ResolvedAddress::new("127.0.0.1", 9).unwrap();
        let request = ConnectionRequest::new(address, auth_context(true).await);
        let mut handle = WebSocketTransport::new().connect(request).unwrap();

        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Errored {
                error: TransportError::Auth(_)
            })
        ));
    }

    #[test]
    fn test_connect_outside_runtime_fails_fast() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let auth = runtime.block_on(auth_context(false));

        let address = ResolvedAddress::new("127.0.0.1", 19132).unwrap();
        let result = WebSocketTransport::new().connect(ConnectionRequest::new(address, auth));
        assert!(matches!(result, Err(TransportError::NoRuntime)));
    }
}
