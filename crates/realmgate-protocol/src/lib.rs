//! Shared vocabulary for Realmgate.
//!
//! Every other crate in the workspace speaks in terms of the types
//! defined here:
//!
//! - **Identity types** ([`AccountId`], [`RealmId`]): newtypes so an
//!   account can never be passed where a realm is expected.
//! - **Addresses** ([`ResolvedAddress`]): the normalized `{host, port}`
//!   pair a session transport connects to.
//! - **Wire packets** ([`ClientPacket`], [`ServerPacket`],
//!   [`DisconnectReason`]): what the reference transport exchanges
//!   with a realm host during the login handshake.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how structured values
//!   become bytes.
//! - **Digest** ([`structured_digest`]): hashing of structured values,
//!   always going through a codec first.
//!
//! # Architecture
//!
//! ```text
//! Auth / Realms / Transport (above)  ← use these types and codecs
//!     ↕
//! Protocol (this crate)  ← no I/O, no async, just data
//! ```

mod codec;
mod digest;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use digest::{structured_digest, DIGEST_HEX_LEN};
pub use error::ProtocolError;
pub use types::{
    AccountId, ClientPacket, DisconnectReason, RealmId, ResolvedAddress,
    ServerPacket, PROTOCOL_VERSION,
};
