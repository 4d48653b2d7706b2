//! Integration tests for `FileTokenCache` against a real directory.

use chrono::{TimeZone, Utc};
use realmgate_auth::{
    CacheError, FileTokenCache, IdentityToken, TokenCache, TokenCacheEntry,
};
use realmgate_protocol::AccountId;

fn entry(account: &str, token: &str) -> TokenCacheEntry {
    TokenCacheEntry {
        account: AccountId::new(account),
        token: IdentityToken::new(token),
        expires_at: Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()),
    }
}

#[tokio::test]
async fn test_load_missing_directory_is_cold_start() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = FileTokenCache::new(tmp.path().join("does-not-exist-yet"));

    let loaded = cache.load(&AccountId::new("a@example.com")).await.unwrap();
    assert!(loaded.is_none());
}

#[tokio::test]
async fn test_save_then_load_same_entry() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = FileTokenCache::new(tmp.path().join("store"));
    let e = entry("a@example.com", "tok");

    cache.save(&e).await.unwrap();
    let loaded = cache.load(&e.account).await.unwrap();

    assert_eq!(loaded, Some(e));
}

#[tokio::test]
async fn test_save_twice_last_write_wins_single_file() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = FileTokenCache::new(tmp.path());

    cache.save(&entry("a@example.com", "old")).await.unwrap();
    cache.save(&entry("a@example.com", "new")).await.unwrap();

    let loaded = cache
        .load(&AccountId::new("a@example.com"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.token, IdentityToken::new("new"));

    let files: Vec<_> = std::fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(files.len(), 1, "no temp files left behind: {files:?}");
}

#[tokio::test]
async fn test_save_failure_removes_temp_file() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = FileTokenCache::new(tmp.path());
    let e = entry("a@example.com", "tok");

    // A non-empty directory where the entry file belongs makes the final
    // rename fail after the temp file was written.
    let path = cache.entry_path(&e.account).unwrap();
    std::fs::create_dir(&path).unwrap();
    std::fs::write(path.join("occupied"), b"x").unwrap();

    let err = cache.save(&e).await.unwrap_err();
    assert!(matches!(err, CacheError::Io { .. }));

    let leftovers: Vec<_> = std::fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
}

#[tokio::test]
async fn test_scope_with_separators_saves_inside_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let store = tmp.path().join("store");
    let cache = FileTokenCache::new(&store).with_scope("x/../../escaped");
    let e = entry("a@example.com", "tok");

    cache.save(&e).await.unwrap();

    assert_eq!(std::fs::read_dir(&store).unwrap().count(), 1);
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    assert_eq!(cache.load(&e.account).await.unwrap(), Some(e));
}

#[tokio::test]
async fn test_accounts_do_not_share_entries() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = FileTokenCache::new(tmp.path());

    cache.save(&entry("a@example.com", "a")).await.unwrap();

    let other = cache.load(&AccountId::new("b@example.com")).await.unwrap();
    assert!(other.is_none());
}

#[tokio::test]
async fn test_scopes_do_not_share_entries() {
    let tmp = tempfile::tempdir().unwrap();
    let live = FileTokenCache::new(tmp.path()).with_scope("live");
    let other = FileTokenCache::new(tmp.path()).with_scope("other");

    live.save(&entry("a@example.com", "a")).await.unwrap();

    assert!(other
        .load(&AccountId::new("a@example.com"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_corrupt_file_reports_corrupt_error() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = FileTokenCache::new(tmp.path());
    let account = AccountId::new("a@example.com");
    let path = cache.entry_path(&account).unwrap();
    std::fs::write(&path, b"{ not json").unwrap();

    let err = cache.load(&account).await.unwrap_err();
    assert!(matches!(err, CacheError::Corrupt { .. }));
}

#[tokio::test]
async fn test_file_swapped_to_other_account_is_ignored() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = FileTokenCache::new(tmp.path());
    let a = AccountId::new("a@example.com");

    // Write b's entry into a's file.
    let b_entry = entry("b@example.com", "b");
    let json = serde_json::to_vec(&b_entry).unwrap();
    std::fs::write(cache.entry_path(&a).unwrap(), json).unwrap();

    assert!(cache.load(&a).await.unwrap().is_none());
}

#[test]
fn test_default_dir_ends_with_auth_store() {
    if let Some(dir) = FileTokenCache::default_dir() {
        assert!(dir.ends_with("realmgate/auth-store"));
    }
}
