//! Token cache: persists issued tokens so repeat runs skip the exchange.
//!
//! Two implementations:
//! - [`MemoryTokenCache`]: a map behind a mutex. For tests and for
//!   processes that don't want anything on disk.
//! - [`FileTokenCache`]: one JSON file per account in a directory.
//!
//! # Cache file names
//!
//! A file cache entry's name is derived from a structured key
//! `{account, scope}` with [`structured_digest`]: the key is encoded by
//! the codec first and the encoded bytes are hashed. Account
//! identifiers (emails) never appear in file names.

use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rand::Rng;
use realmgate_protocol::{structured_digest, AccountId, Codec, JsonCodec};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::{CacheError, TokenCacheEntry};

/// Durable storage for [`TokenCacheEntry`] values, keyed by account.
///
/// Implementations must tolerate a cold start: loading from an empty or
/// not-yet-created store returns `Ok(None)`, not an error.
pub trait TokenCache: Send + Sync + 'static {
    /// Returns the entry for `account`, if one was saved.
    fn load(
        &self,
        account: &AccountId,
    ) -> impl Future<Output = Result<Option<TokenCacheEntry>, CacheError>> + Send;

    /// Stores `entry` under `entry.account`, replacing any previous
    /// entry for that account.
    fn save(
        &self,
        entry: &TokenCacheEntry,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;
}

// ---------------------------------------------------------------------------
// MemoryTokenCache
// ---------------------------------------------------------------------------

/// In-process token cache. Lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryTokenCache {
    entries: Mutex<HashMap<AccountId, TokenCacheEntry>>,
}

impl MemoryTokenCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache pre-populated with `entries`.
    pub fn with_entries(
        entries: impl IntoIterator<Item = TokenCacheEntry>,
    ) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| (e.account.clone(), e))
            .collect();
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Number of accounts with a stored entry.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns `true` if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl TokenCache for MemoryTokenCache {
    async fn load(
        &self,
        account: &AccountId,
    ) -> Result<Option<TokenCacheEntry>, CacheError> {
        Ok(self.entries.lock().await.get(account).cloned())
    }

    async fn save(&self, entry: &TokenCacheEntry) -> Result<(), CacheError> {
        self.entries
            .lock()
            .await
            .insert(entry.account.clone(), entry.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileTokenCache
// ---------------------------------------------------------------------------

/// The structured key a cache file name is derived from.
#[derive(Serialize)]
struct CacheKey<'a> {
    account: &'a str,
    scope: &'a str,
}

/// Token cache backed by a directory, one file per account.
///
/// Writes go to a temporary file in the same directory which is then
/// renamed over the entry, so a reader sees either the old entry or the
/// new one, never a torn write. Concurrent saves for one account resolve
/// last-write-wins.
#[derive(Debug, Clone)]
pub struct FileTokenCache {
    dir: PathBuf,
    scope: String,
    codec: JsonCodec,
}

impl FileTokenCache {
    /// Scope used when none is given.
    pub const DEFAULT_SCOPE: &'static str = "default";

    /// Characters of the key digest kept in file names.
    const NAME_DIGEST_LEN: usize = 16;

    /// A cache storing entries under `dir`. The directory is created on
    /// first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            scope: Self::DEFAULT_SCOPE.to_string(),
            codec: JsonCodec,
        }
    }

    /// Separates entries for the same account issued for different
    /// purposes (different titles or token flows).
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// The per-user cache location: `<cache dir>/realmgate/auth-store`.
    ///
    /// Returns `None` on platforms without a cache directory.
    pub fn default_dir() -> Option<PathBuf> {
        Some(dirs::cache_dir()?.join("realmgate").join("auth-store"))
    }

    /// The directory entries are stored in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The file `account`'s entry lives in.
    ///
    /// # Errors
    /// Returns [`CacheError::Encode`] if the key can't be encoded.
    pub fn entry_path(&self, account: &AccountId) -> Result<PathBuf, CacheError> {
        let key = CacheKey {
            account: account.as_str(),
            scope: &self.scope,
        };
        let digest =
            structured_digest(&self.codec, &key).map_err(CacheError::Encode)?;
        let name = format!(
            "{}_{}-cache.json",
            &digest[..Self::NAME_DIGEST_LEN],
            file_label(&self.scope)
        );
        Ok(self.dir.join(name))
    }
}

/// The scope as it appears in a file name. Anything outside
/// `[A-Za-z0-9_-]` becomes `_`, so the name never leaves the cache
/// directory. The digest still covers the raw scope.
fn file_label(scope: &str) -> String {
    scope
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Writes `bytes` to `tmp`, then renames it over `path`. The temp file is
/// removed if either step fails.
async fn replace_file(tmp: &Path, path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let result = match tokio::fs::write(tmp, bytes).await {
        Ok(()) => tokio::fs::rename(tmp, path)
            .await
            .map_err(|source| CacheError::Io {
                path: path.to_path_buf(),
                source,
            }),
        Err(source) => Err(CacheError::Io {
            path: tmp.to_path_buf(),
            source,
        }),
    };
    if result.is_err() {
        let _ = tokio::fs::remove_file(tmp).await;
    }
    result
}

impl TokenCache for FileTokenCache {
    async fn load(
        &self,
        account: &AccountId,
    ) -> Result<Option<TokenCacheEntry>, CacheError> {
        let path = self.entry_path(account)?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(%account, path = %path.display(), "no cache file");
                return Ok(None);
            }
            Err(source) => return Err(CacheError::Io { path, source }),
        };

        let entry: TokenCacheEntry = self
            .codec
            .decode(&bytes)
            .map_err(|source| CacheError::Corrupt {
                path: path.clone(),
                source,
            })?;

        if &entry.account != account {
            // Only possible if the file was swapped by hand.
            tracing::warn!(
                %account,
                stored = %entry.account,
                path = %path.display(),
                "cache file belongs to another account, ignoring"
            );
            return Ok(None);
        }

        Ok(Some(entry))
    }

    async fn save(&self, entry: &TokenCacheEntry) -> Result<(), CacheError> {
        let path = self.entry_path(&entry.account)?;
        let bytes = self.codec.encode(entry).map_err(CacheError::Encode)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| CacheError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let suffix: u32 = rand::rng().random();
        let tmp = self.dir.join(format!(".{suffix:08x}.tmp"));

        replace_file(&tmp, &path, &bytes).await?;

        tracing::debug!(account = %entry.account, path = %path.display(), "token cached");
        Ok(())
    }
}
