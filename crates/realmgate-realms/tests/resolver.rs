//! Integration tests for `RealmResolver` against a scripted directory.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use realmgate_auth::{
    AuthContext, Authenticator, Credentials, IdentityProvider, IdentityToken,
    IssuedToken, MemoryTokenCache, ProviderError, Refresh,
};
use realmgate_protocol::{RealmId, ResolvedAddress};
use realmgate_realms::{
    DirectoryError, RawAddress, RealmDescriptor, RealmDirectory, RealmError,
    RealmResolver, RealmSelection, RealmState, SelectionPolicy,
};
use realmgate_retry::RetryConfig;

// =========================================================================
// Test doubles
// =========================================================================

/// Issues a fixed token; service tokens echo the audience.
struct StaticProvider;

impl IdentityProvider for StaticProvider {
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
        Ok(IdentityToken::new(format!("svc:{audience}")))
    }
}

#[derive(Default)]
struct ScriptedDirectory {
    listings: Mutex<VecDeque<Result<Vec<RealmDescriptor>, DirectoryError>>>,
    addresses: Mutex<VecDeque<Result<RawAddress, DirectoryError>>>,
    list_calls: AtomicU32,
    address_calls: AtomicU32,
}

impl ScriptedDirectory {
    fn listing(
        results: impl IntoIterator<Item = Result<Vec<RealmDescriptor>, DirectoryError>>,
    ) -> Self {
        Self {
            listings: Mutex::new(results.into_iter().collect()),
            ..Default::default()
        }
    }

    fn addresses(
        results: impl IntoIterator<Item = Result<RawAddress, DirectoryError>>,
    ) -> Self {
        Self {
            addresses: Mutex::new(results.into_iter().collect()),
            ..Default::default()
        }
    }
}

impl RealmDirectory for ScriptedDirectory {
    async fn list_realms<P: IdentityProvider>(
        &self,
        auth: &AuthContext<P>,
    ) -> Result<Vec<RealmDescriptor>, DirectoryError> {
        // Real directories authenticate with a service token.
        auth.service_token("realms").await?;
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.listings
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn get_address<P: IdentityProvider>(
        &self,
        _auth: &AuthContext<P>,
        realm: &RealmId,
    ) -> Result<RawAddress, DirectoryError> {
        self.address_calls.fetch_add(1, Ordering::SeqCst);
        self.addresses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(DirectoryError::UnknownRealm(realm.clone())))
    }
}

// =========================================================================
// Helpers
// =========================================================================

async fn auth_context() -> AuthContext<StaticProvider> {
    let creds = Credentials::new("steve@example.com", "pw").unwrap();
    Authenticator::new(StaticProvider, MemoryTokenCache::new())
        .authenticate(&creds)
        .await
        .unwrap()
}

fn retry_config() -> RetryConfig {
    RetryConfig {
        max_attempts: 2,
        initial_delay: Duration::from_millis(100),
        multiplier: 2.0,
        max_delay: Duration::from_secs(1),
        max_jitter: Duration::ZERO,
        attempt_timeout: Duration::from_secs(5),
    }
}

fn main_realm() -> RealmDescriptor {
    RealmDescriptor::new("42", "Main realm", RealmState::Open)
}

// =========================================================================
// list_realms
// =========================================================================

#[tokio::test]
async fn test_list_realms_returns_directory_listing() {
    let ctx = auth_context().await;
    let resolver = RealmResolver::with_retry(
        ScriptedDirectory::listing([Ok(vec![
            main_realm(),
            RealmDescriptor::new("7", "Other", RealmState::Closed),
        ])]),
        retry_config(),
    );

    let realms = resolver.list_realms(&ctx).await.unwrap();
    assert_eq!(realms.len(), 2);
}

#[tokio::test]
async fn test_list_realms_empty_is_not_error_and_selects_not_found() {
    let ctx = auth_context().await;
    let resolver = RealmResolver::with_retry(
        ScriptedDirectory::listing([Ok(Vec::new())]),
        retry_config(),
    );

    let realms = resolver.list_realms(&ctx).await.unwrap();
    let selection =
        resolver.select_realm(realms, &SelectionPolicy::exact_name("Main realm"));
    assert!(matches!(selection, RealmSelection::NotFound { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_list_realms_transient_failure_retried_once() {
    let ctx = auth_context().await;
    let resolver = RealmResolver::with_retry(
        ScriptedDirectory::listing([
            Err(DirectoryError::Unavailable("503".into())),
            Ok(vec![main_realm()]),
        ]),
        retry_config(),
    );

    let realms = resolver.list_realms(&ctx).await.unwrap();
    assert_eq!(realms, vec![main_realm()]);
    assert_eq!(resolver.directory().list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_list_realms_bounded_retry_then_directory_error() {
    let ctx = auth_context().await;
    let resolver = RealmResolver::with_retry(
        ScriptedDirectory::listing([
            Err(DirectoryError::Unavailable("503".into())),
            Err(DirectoryError::Unavailable("503".into())),
            Ok(vec![main_realm()]),
        ]),
        retry_config(),
    );

    let err = resolver.list_realms(&ctx).await.unwrap_err();
    assert!(matches!(err, RealmError::Directory { attempts: 2, .. }));
    assert_eq!(resolver.directory().list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_list_realms_rejection_not_retried() {
    let ctx = auth_context().await;
    let resolver = RealmResolver::with_retry(
        ScriptedDirectory::listing([Err(DirectoryError::Rejected("401".into()))]),
        retry_config(),
    );

    let err = resolver.list_realms(&ctx).await.unwrap_err();
    assert!(matches!(
        err,
        RealmError::Directory {
            attempts: 1,
            source: DirectoryError::Rejected(_),
            ..
        }
    ));
}

// =========================================================================
// resolve_address
// =========================================================================

#[tokio::test]
async fn test_resolve_address_string_and_structured_agree() {
    let ctx = auth_context().await;
    let resolver = RealmResolver::with_retry(
        ScriptedDirectory::addresses([
            Ok(RawAddress::text("203.0.113.5:19132")),
            Ok(RawAddress::structured("203.0.113.5", 19132)),
        ]),
        retry_config(),
    );

    let a = resolver.resolve_address(&ctx, &main_realm()).await.unwrap();
    let b = resolver.resolve_address(&ctx, &main_realm()).await.unwrap();

    assert_eq!(a, ResolvedAddress::new("203.0.113.5", 19132).unwrap());
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_resolve_address_same_response_same_result() {
    let ctx = auth_context().await;
    let resolver = RealmResolver::with_retry(
        ScriptedDirectory::addresses([
            Ok(RawAddress::text("realm.example.net:19132")),
            Ok(RawAddress::text("realm.example.net:19132")),
        ]),
        retry_config(),
    );

    let a = resolver.resolve_address(&ctx, &main_realm()).await.unwrap();
    let b = resolver.resolve_address(&ctx, &main_realm()).await.unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_resolve_address_malformed_is_fatal_without_retry() {
    let ctx = auth_context().await;
    let resolver = RealmResolver::with_retry(
        ScriptedDirectory::addresses([
            Ok(RawAddress::text("nohostnoport")),
            Ok(RawAddress::text("203.0.113.5:19132")),
        ]),
        retry_config(),
    );

    let err = resolver.resolve_address(&ctx, &main_realm()).await.unwrap_err();
    assert!(matches!(err, RealmError::AddressFormat { .. }));
    assert_eq!(resolver.directory().address_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_resolve_address_realm_warming_up_is_retried() {
    let ctx = auth_context().await;
    let resolver = RealmResolver::with_retry(
        ScriptedDirectory::addresses([
            Err(DirectoryError::NotReady(RealmId::new("42"))),
            Ok(RawAddress::text("203.0.113.5:19132")),
        ]),
        retry_config(),
    );

    let addr = resolver.resolve_address(&ctx, &main_realm()).await.unwrap();
    assert_eq!(addr.port(), 19132);
}

#[tokio::test]
async fn test_resolve_address_unknown_realm_is_directory_error() {
    let ctx = auth_context().await;
    let resolver =
        RealmResolver::with_retry(ScriptedDirectory::default(), retry_config());

    let err = resolver.resolve_address(&ctx, &main_realm()).await.unwrap_err();
    assert!(matches!(
        err,
        RealmError::Directory {
            source: DirectoryError::UnknownRealm(_),
            ..
        }
    ));
}
