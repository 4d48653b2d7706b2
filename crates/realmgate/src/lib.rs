//! # Realmgate
//!
//! Authenticated session establishment for hosted multiplayer realms.
//!
//! Realmgate takes an account's credentials and ends with a live
//! protocol session on one named realm:
//!
//! 1. **Authenticate** against an identity provider, reusing cached
//!    tokens when they are still valid ([`auth`]).
//! 2. **Discover** the account's realms through the realm directory and
//!    pick the target by exact name ([`realms`]).
//! 3. **Resolve** the realm's address, whatever shape the directory
//!    returns it in ([`realms`]).
//! 4. **Hand off** the address and auth context to a session transport
//!    and observe its lifecycle events ([`transport`]).
//!
//! The identity provider, the realm directory and the session transport
//! are traits; bring your own or use the WebSocket reference transport.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use realmgate::prelude::*;
//!
//! realmgate::init_tracing();
//!
//! let credentials = Credentials::new("steve@example.com", secret)?;
//! let pipeline = Pipeline::builder(
//!     my_provider,
//!     FileTokenCache::new(FileTokenCache::default_dir().unwrap_or_default()),
//!     my_directory,
//!     WebSocketTransport::new(),
//! )
//! .target_realm("Main realm")
//! .build()?;
//!
//! let mut outcome = pipeline.run(&credentials).await?;
//! while let Some(event) = outcome.session.next_event().await {
//!     println!("{event:?}");
//! }
//! ```

mod config;
mod error;
mod logging;
mod pipeline;

pub use config::{PipelineBuilder, PipelineConfig};
pub use error::{PipelineError, Stage};
pub use logging::init_tracing;
pub use pipeline::{AbortHandle, Pipeline, PipelineOutcome};

pub use realmgate_auth as auth;
pub use realmgate_protocol as protocol;
pub use realmgate_realms as realms;
pub use realmgate_retry as retry;
pub use realmgate_transport as transport;

/// Everything needed to assemble and run a pipeline.
pub mod prelude {
    pub use crate::{
        AbortHandle, Pipeline, PipelineBuilder, PipelineConfig, PipelineError,
        PipelineOutcome, Stage,
    };
    pub use realmgate_auth::{
        AuthConfig, AuthContext, AuthError, Credentials, FileTokenCache,
        IdentityProvider, IdentityToken, IssuedToken, MemoryTokenCache,
        ProviderError, Refresh, TokenCache, TokenCacheEntry,
    };
    pub use realmgate_protocol::{
        AccountId, DisconnectReason, RealmId, ResolvedAddress,
    };
    pub use realmgate_realms::{
        DirectoryError, RawAddress, RealmDescriptor, RealmDirectory,
        RealmState,
    };
    pub use realmgate_retry::RetryConfig;
    pub use realmgate_transport::{
        SessionEvent, SessionHandle, SessionState, SessionTransport,
        WebSocketTransport,
    };
}
