//! Credential authentication and token caching for Realmgate.
//!
//! This crate turns an account's [`Credentials`] into an
//! [`AuthContext`]: a long-lived proof of identity that the realm
//! directory and the session transport both draw on.
//!
//! 1. **Credentials**: validated for presence before any network
//!    activity ([`Credentials::new`]).
//! 2. **Token cache**: previously issued tokens, keyed by account
//!    ([`TokenCache`], [`MemoryTokenCache`], [`FileTokenCache`]).
//! 3. **Identity provider**: the external service that performs the
//!    multi-step token exchange ([`IdentityProvider`] trait).
//! 4. **Authenticator**: checks the cache first, falls back to a
//!    bounded-retry exchange, writes the result back
//!    ([`Authenticator`]).
//!
//! # How it fits in the stack
//!
//! ```text
//! Realms / Transport (above)  ← borrow the AuthContext
//!     ↕
//! Auth (this crate)  ← owns credentials, tokens, and the cache
//!     ↕
//! Protocol / Retry (below)  ← AccountId, digests, backoff
//! ```

mod authenticator;
mod cache;
mod context;
mod credentials;
mod error;
mod provider;
mod token;

pub use authenticator::{AuthConfig, Authenticator};
pub use cache::{FileTokenCache, MemoryTokenCache, TokenCache};
pub use context::{AuthContext, TokenSource};
pub use credentials::Credentials;
pub use error::{AuthError, CacheError, ProviderError};
pub use provider::{IdentityProvider, Refresh};
pub use token::{IdentityToken, IssuedToken, TokenCacheEntry};
