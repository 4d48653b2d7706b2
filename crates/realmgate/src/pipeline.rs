//! The session establishment pipeline.
//!
//! ```text
//! Credentials
//!     │
//!     ▼
//! authenticate ──► list realms ──► select realm ──► resolve address ──► connect
//!     │                 │               │                  │               │
//!     └─────────────────┴───────────────┴──────────────────┴───────────────┴──► PipelineError
//! ```
//!
//! Stages run one at a time. The first failure ends the run; nothing
//! from a failed run is handed to later stages.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use realmgate_auth::{
    AuthContext, Authenticator, Credentials, IdentityProvider, TokenCache,
};
use realmgate_protocol::ResolvedAddress;
use realmgate_realms::{
    RealmDescriptor, RealmDirectory, RealmResolver, RealmSelection,
    SelectionPolicy,
};
use realmgate_transport::{ConnectionRequest, SessionHandle, SessionTransport};

use crate::{PipelineBuilder, PipelineError, Stage};

/// Cooperative cancellation for a pipeline.
///
/// Checked before each stage. A stage that has started runs to
/// completion (or to its own timeout); the run then stops with
/// [`PipelineError::Aborted`]. Once set the flag stays set.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the pipeline stop at the next stage boundary.
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A successful run: the live session plus what it was built from.
pub struct PipelineOutcome<P> {
    /// Lifecycle events for the session.
    pub session: SessionHandle,
    /// The realm that was joined.
    pub realm: RealmDescriptor,
    /// Where the session connected.
    pub address: ResolvedAddress,
    /// The account's context. Keep it for as long as the session lives.
    pub auth: Arc<AuthContext<P>>,
}

impl<P> std::fmt::Debug for PipelineOutcome<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOutcome")
            .field("session", &self.session)
            .field("realm", &self.realm)
            .field("address", &self.address)
            .field("auth", &self.auth)
            .finish()
    }
}

/// Authenticates, picks a realm, resolves its address, and hands the
/// session to a transport.
///
/// Built with [`PipelineBuilder`]. A pipeline can be run more than once
/// (reconnecting is a fresh run, since realm addresses rotate); a warm
/// token cache makes later runs skip the identity provider.
pub struct Pipeline<P, C, D, T> {
    pub(crate) authenticator: Authenticator<P, C>,
    pub(crate) resolver: RealmResolver<D>,
    pub(crate) transport: T,
    pub(crate) policy: SelectionPolicy,
    pub(crate) abort: AbortHandle,
}

impl<P, C, D, T> Pipeline<P, C, D, T>
where
    P: IdentityProvider,
    C: TokenCache,
    D: RealmDirectory,
    T: SessionTransport,
{
    /// Shorthand for [`PipelineBuilder::new`].
    pub fn builder(
        provider: P,
        cache: C,
        directory: D,
        transport: T,
    ) -> PipelineBuilder<P, C, D, T> {
        PipelineBuilder::new(provider, cache, directory, transport)
    }

    /// A handle that stops this pipeline at the next stage boundary.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn authenticator(&self) -> &Authenticator<P, C> {
        &self.authenticator
    }

    pub fn resolver(&self) -> &RealmResolver<D> {
        &self.resolver
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The name the pipeline is looking for.
    pub fn target_realm(&self) -> &str {
        self.policy.target()
    }

    /// Runs every stage for `credentials`.
    ///
    /// Returns as soon as the transport has accepted the session; the
    /// handshake continues in the background and reports through
    /// [`PipelineOutcome::session`].
    ///
    /// # Errors
    /// The first stage failure, as a [`PipelineError`] naming the stage.
    pub async fn run(
        &self,
        credentials: &Credentials,
    ) -> Result<PipelineOutcome<P>, PipelineError> {
        let account = credentials.account();
        tracing::info!(%account, target_realm = self.policy.target(), "pipeline started");

        match self.run_stages(credentials).await {
            Ok(outcome) => {
                tracing::info!(
                    %account,
                    realm = %outcome.realm.id,
                    address = %outcome.address,
                    "session handed off"
                );
                Ok(outcome)
            }
            Err(error) => {
                tracing::error!(%account, stage = %error.stage(), %error, "pipeline failed");
                Err(error)
            }
        }
    }

    async fn run_stages(
        &self,
        credentials: &Credentials,
    ) -> Result<PipelineOutcome<P>, PipelineError> {
        self.checkpoint(Stage::Authentication)?;
        let auth = Arc::new(self.authenticator.authenticate(credentials).await?);

        self.checkpoint(Stage::RealmListing)?;
        let realms = self
            .resolver
            .list_realms(&auth)
            .await
            .map_err(PipelineError::RealmListing)?;

        self.checkpoint(Stage::RealmSelection)?;
        let realm = match self.resolver.select_realm(realms, &self.policy) {
            RealmSelection::Found(realm) => realm,
            RealmSelection::NotFound { target, available } => {
                return Err(PipelineError::RealmNotFound { target, available });
            }
            RealmSelection::Ambiguous { target, matches } => {
                return Err(PipelineError::AmbiguousRealm {
                    target,
                    count: matches.len(),
                });
            }
        };
        if !realm.state.is_joinable() {
            tracing::warn!(
                realm = %realm.id,
                name = %realm.name,
                state = %realm.state,
                "selected realm is not open; trying anyway"
            );
        }

        self.checkpoint(Stage::AddressResolution)?;
        let address = self
            .resolver
            .resolve_address(&auth, &realm)
            .await
            .map_err(PipelineError::AddressResolution)?;

        self.checkpoint(Stage::SessionHandoff)?;
        let request = ConnectionRequest::new(address.clone(), Arc::clone(&auth));
        let session = self
            .transport
            .connect(request)
            .map_err(PipelineError::Handoff)?;

        Ok(PipelineOutcome {
            session,
            realm,
            address,
            auth,
        })
    }

    fn checkpoint(&self, next: Stage) -> Result<(), PipelineError> {
        if self.abort.is_aborted() {
            return Err(PipelineError::Aborted { before: next });
        }
        tracing::debug!(stage = %next, "entering stage");
        Ok(())
    }
}
