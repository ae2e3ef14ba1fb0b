use anyhow::Result;
use async_trait::async_trait;

/// TTL'd key/value cache for serialized content payloads. Keys are
/// namespaced with `|`-separated prefixes (e.g. `content|articles`) so
/// revalidation can invalidate by prefix.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_cache(&self, key: &str, now: i64) -> Result<Option<String>>;
    async fn put_cache(&self, key: &str, payload: &str, expires_at: i64) -> Result<()>;
    /// Delete entries whose key starts with `prefix`; `None` clears everything.
    /// Returns the number of removed entries.
    async fn delete_prefix(&self, prefix: Option<&str>) -> Result<u64>;
}

/// Seconds since the UNIX epoch, for cache expiry stamps.
pub fn current_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}
