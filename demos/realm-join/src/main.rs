//! Joins a realm end to end against in-process collaborators.
//!
//! A scripted identity provider and realm directory stand in for the
//! real services, and a loopback WebSocket server plays the realm host.
//! Tokens are cached on disk, so a second run skips the exchange.
//!
//! ```text
//! RUST_LOG=debug cargo run -p realm-join
//! ```

use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use realmgate::prelude::*;
use realmgate::protocol::{ClientPacket, Codec, JsonCodec, ServerPacket};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

const TARGET_REALM: &str = "Main realm";

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

struct DemoProvider;

impl IdentityProvider for DemoProvider {
    async fn exchange_token(
        &self,
        credentials: &Credentials,
    ) -> Result<IssuedToken, ProviderError> {
        tracing::info!(account = %credentials.account(), "demo provider: full exchange");
        Ok(IssuedToken {
            token: IdentityToken::new(format!("xbl3.0:{}", credentials.account())),
            expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
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
        token: &IdentityToken,
        audience: &str,
    ) -> Result<IdentityToken, ProviderError> {
        Ok(IdentityToken::new(format!("{audience}|{}", token.as_str())))
    }
}

/// Lists two realms; the target lives on the loopback host.
struct DemoDirectory {
    host_address: String,
}

impl RealmDirectory for DemoDirectory {
    async fn list_realms<P: IdentityProvider>(
        &self,
        auth: &AuthContext<P>,
    ) -> Result<Vec<RealmDescriptor>, DirectoryError> {
        auth.service_token("realms").await?;
        Ok(vec![
            RealmDescriptor::new("1001", TARGET_REALM, RealmState::Open),
            RealmDescriptor::new("1002", "Creative test", RealmState::Closed),
        ])
    }

    async fn get_address<P: IdentityProvider>(
        &self,
        _auth: &AuthContext<P>,
        _realm: &RealmId,
    ) -> Result<RawAddress, DirectoryError> {
        Ok(RawAddress::text(self.host_address.clone()))
    }
}

// ---------------------------------------------------------------------------
// Realm host
// ---------------------------------------------------------------------------

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Binds a loopback realm host and returns its `host:port`.
async fn spawn_realm_host(play_time: Duration) -> Result<String, BoxError> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?.to_string();

    tokio::spawn(async move {
        if let Err(e) = serve_one_player(listener, play_time).await {
            tracing::warn!(error = %e, "realm host stopped");
        }
    });

    Ok(addr)
}

/// Accepts one player, lets them in, and kicks them after `play_time`.
async fn serve_one_player(
    listener: TcpListener,
    play_time: Duration,
) -> Result<(), BoxError> {
    let (stream, peer) = listener.accept().await?;
    let mut ws = tokio_tungstenite::accept_async(stream).await?;
    let codec = JsonCodec;

    let Some(Ok(Message::Binary(data))) = ws.next().await else {
        return Err("expected a login packet".into());
    };
    if let ClientPacket::Login { account, .. } = codec.decode(&data)? {
        tracing::info!(%peer, %account, "realm host: player logged in");
    }

    let joined = ServerPacket::Joined {
        session_id: "demo-session".into(),
    };
    ws.send(Message::Binary(codec.encode(&joined)?.into())).await?;

    tokio::time::sleep(play_time).await;
    let kick = ServerPacket::Disconnect {
        reason: DisconnectReason::Kicked {
            message: "demo over".into(),
        },
    };
    ws.send(Message::Binary(codec.encode(&kick)?.into())).await?;
    ws.close(None).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    realmgate::init_tracing();

    let host_address = spawn_realm_host(Duration::from_secs(1)).await?;
    let cache_dir = std::env::temp_dir().join("realmgate-demo");
    eprintln!("realm host on {host_address}, token cache in {}", cache_dir.display());

    let credentials = Credentials::new("steve@example.com", "correct horse")?;
    let pipeline = Pipeline::builder(
        DemoProvider,
        FileTokenCache::new(cache_dir),
        DemoDirectory { host_address },
        WebSocketTransport::new().with_connect_timeout(Duration::from_secs(5)),
    )
    .target_realm(TARGET_REALM)
    .build()?;

    let mut outcome = pipeline.run(&credentials).await?;
    eprintln!(
        "handed off to realm {} ({}) at {}",
        outcome.realm.name, outcome.realm.id, outcome.address
    );

    while let Some(event) = outcome.session.next_event().await {
        match event {
            SessionEvent::Joined { session_id } => eprintln!("joined: {session_id}"),
            SessionEvent::Disconnected { reason } => eprintln!("disconnected: {reason}"),
            SessionEvent::Errored { error } => eprintln!("errored: {error}"),
        }
    }

    Ok(())
}
