//! Hashing of structured values.
//!
//! Hash functions consume bytes. Callers that want to hash a structured
//! value (a cache key made of several fields, say) must first turn it
//! into bytes, and that conversion has to be explicit and stable:
//! the same value must always hash to the same digest, across runs and
//! across machines. [`structured_digest`] is the single place where that
//! conversion happens: it encodes the value with a [`Codec`] and hashes
//! the encoded bytes with SHA-256.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::{Codec, ProtocolError};

/// Length of the hex string returned by [`structured_digest`].
pub const DIGEST_HEX_LEN: usize = 64;

/// Encodes `value` with `codec`, then returns the lowercase hex SHA-256
/// of the encoded bytes.
///
/// # Errors
/// Returns `ProtocolError::Encode` if the value can't be serialized.
///
/// # Example
///
/// ```rust
/// use realmgate_protocol::{structured_digest, JsonCodec, DIGEST_HEX_LEN};
///
/// #[derive(serde::Serialize)]
/// struct Key<'a> {
///     account: &'a str,
///     scope: &'a str,
/// }
///
/// let digest = structured_digest(
///     &JsonCodec,
///     &Key { account: "steve@example.com", scope: "live" },
/// )
/// .unwrap();
/// assert_eq!(digest.len(), DIGEST_HEX_LEN);
/// ```
pub fn structured_digest<C, T>(
    codec: &C,
    value: &T,
) -> Result<String, ProtocolError>
where
    C: Codec,
    T: Serialize + ?Sized,
{
    let bytes = codec.encode(value)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
