//! In-memory result cache with TTL and in-flight request coalescing.
//!
//! Keys are SHA-256 digests of (operation | subject | question). The subject
//! is either a video id or the digest of a transcript's text, so identical
//! transcripts with identical questions share one entry no matter how the
//! transcript was obtained.

use crate::video::VideoId;
use moka::future::Cache;
use moka::Expiry;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default lifetime of a cached result.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Default maximum number of cached results.
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Operation class a cached result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Summarize,
    Answer,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Summarize => "summarize",
            Operation::Answer => "answer",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Digest identifying one (operation, subject, question) request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Key for a request addressed by video id.
    pub fn for_video(operation: Operation, id: &VideoId, question: Option<&str>) -> Self {
        Self::compute(operation, "video", id.as_str(), question)
    }

    /// Key for a request addressed by transcript content.
    pub fn for_transcript(operation: Operation, transcript: &str, question: Option<&str>) -> Self {
        Self::compute(operation, "content", &content_hash(transcript), question)
    }

    fn compute(operation: Operation, subject_kind: &str, subject: &str, question: Option<&str>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(operation.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(subject_kind.as_bytes());
        hasher.update(b":");
        hasher.update(subject.as_bytes());
        hasher.update(b"|");
        hasher.update(question.unwrap_or_default().as_bytes());
        Self(hasher.finalize().into())
    }

    /// Hex form, for logs.
    pub fn to_hex(&self) -> String {
        hex(&self.0)
    }
}

/// SHA-256 of a transcript's text, hex encoded.
pub fn content_hash(text: &str) -> String {
    hex(&Sha256::digest(text.as_bytes()))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// A cached result.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Arc<str>,
    pub ttl: Duration,
}

impl CacheEntry {
    fn new(value: impl Into<Arc<str>>, ttl: Duration) -> Self {
        Self {
            value: value.into(),
            ttl,
        }
    }
}

/// Expires each entry after its own TTL, restarting on overwrite.
struct EntryTtl;

impl Expiry<CacheKey, CacheEntry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Thread-safe result cache.
///
/// Reads and writes on distinct keys never contend; writes to one key are
/// last-write-wins. Expired entries are dropped lazily on read or by moka's
/// capacity eviction.
#[derive(Clone)]
pub struct ResultCache {
    entries: Cache<CacheKey, CacheEntry>,
    ttl: Duration,
}

impl ResultCache {
    /// Create a cache with the default capacity and TTL.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_MAX_ENTRIES, DEFAULT_TTL)
    }

    /// Create a cache with a custom capacity and TTL.
    pub fn with_config(max_entries: u64, ttl: Duration) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_entries)
                .expire_after(EntryTtl)
                .build(),
            ttl,
        }
    }

    /// TTL applied by [`ResultCache::get_or_try_insert_with`].
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a result. `None` if never written or expired.
    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        self.entries.get(key).await.map(|entry| entry.value.to_string())
    }

    /// Store a result, replacing any existing entry for `key`.
    pub async fn put(&self, key: CacheKey, value: impl Into<Arc<str>>, ttl: Duration) {
        self.entries.insert(key, CacheEntry::new(value, ttl)).await;
    }

    /// Return the cached value for `key`, or run `init` and cache its `Ok`.
    ///
    /// Concurrent callers for the same key wait on a single `init`; all of
    /// them receive its result. Errors are shared but never cached. The
    /// boolean is `true` when the value came from the cache or another
    /// caller's computation rather than this call's `init`.
    pub async fn get_or_try_insert_with<F, E>(
        &self,
        key: CacheKey,
        init: F,
    ) -> std::result::Result<(String, bool), Arc<E>>
    where
        F: Future<Output = std::result::Result<String, E>>,
        E: Send + Sync + 'static,
    {
        let ttl = self.ttl;
        let entry = self
            .entries
            .entry(key)
            .or_try_insert_with(async move { init.await.map(|value| CacheEntry::new(value, ttl)) })
            .await?;
        let reused = !entry.is_fresh();
        Ok((entry.into_value().value.to_string(), reused))
    }

    /// Number of live entries (approximate, as reported by moka).
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn video(id: &str) -> VideoId {
        VideoId::new(id).unwrap()
    }

    #[test]
    fn test_keys_separate_operations_and_questions() {
        let id = video("abc123");
        let summary = CacheKey::for_video(Operation::Summarize, &id, None);
        let answer = CacheKey::for_video(Operation::Answer, &id, Some("why?"));
        let other_answer = CacheKey::for_video(Operation::Answer, &id, Some("how?"));

        assert_ne!(summary, answer);
        assert_ne!(answer, other_answer);
        assert_eq!(summary, CacheKey::for_video(Operation::Summarize, &id, None));
    }

    #[test]
    fn test_transcript_keys_depend_only_on_content() {
        let a = CacheKey::for_transcript(Operation::Answer, "line one\nline two", Some("what?"));
        let b = CacheKey::for_transcript(
            Operation::Answer,
            &["line one", "line two"].join("\n"),
            Some("what?"),
        );
        assert_eq!(a, b);
        assert_ne!(
            a,
            CacheKey::for_transcript(Operation::Answer, "line one\nline three", Some("what?"))
        );
    }

    #[test]
    fn test_video_and_content_keys_never_collide() {
        let id = video("abc123");
        assert_ne!(
            CacheKey::for_video(Operation::Summarize, &id, None),
            CacheKey::for_transcript(Operation::Summarize, "abc123", None)
        );
    }

    #[test]
    fn test_content_hash_is_hex_sha256() {
        assert_eq!(
            content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(CacheKey::for_transcript(Operation::Summarize, "x", None).to_hex().len(), 64);
    }

    #[tokio::test]
    async fn test_get_after_put_returns_value() {
        let cache = ResultCache::new();
        let key = CacheKey::for_video(Operation::Summarize, &video("abc123"), None);

        assert_eq!(cache.get(&key).await, None);
        cache.put(key, "a summary", DEFAULT_TTL).await;
        assert_eq!(cache.get(&key).await.as_deref(), Some("a summary"));
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let cache = ResultCache::new();
        let key = CacheKey::for_video(Operation::Summarize, &video("abc123"), None);

        cache.put(key, "first", DEFAULT_TTL).await;
        cache.put(key, "second", DEFAULT_TTL).await;
        assert_eq!(cache.get(&key).await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let cache = ResultCache::new();
        let key = CacheKey::for_video(Operation::Summarize, &video("abc123"), None);

        cache.put(key, "short lived", Duration::from_millis(50)).await;
        assert!(cache.get(&key).await.is_some());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(cache.get(&key).await, None);
    }

    #[tokio::test]
    async fn test_get_or_try_insert_with_caches_success_only() {
        let cache = ResultCache::new();
        let key = CacheKey::for_video(Operation::Summarize, &video("abc123"), None);

        let err = cache
            .get_or_try_insert_with(key, async { Err::<String, _>("boom".to_string()) })
            .await
            .unwrap_err();
        assert_eq!(err.as_str(), "boom");
        assert_eq!(cache.get(&key).await, None);

        let (value, reused) = cache
            .get_or_try_insert_with(key, async { Ok::<_, String>("computed".to_string()) })
            .await
            .unwrap();
        assert_eq!(value, "computed");
        assert!(!reused);

        let (value, reused) = cache
            .get_or_try_insert_with(key, async { Ok::<_, String>("recomputed".to_string()) })
            .await
            .unwrap();
        assert_eq!(value, "computed");
        assert!(reused);
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_coalesced() {
        let cache = ResultCache::new();
        let key = CacheKey::for_video(Operation::Answer, &video("abc123"), Some("q"));
        let calls = Arc::new(AtomicU32::new(0));

        let tasks = (0..8).map(|_| {
            let cache = cache.clone();
            let calls = calls.clone();
            async move {
                cache
                    .get_or_try_insert_with(key, async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, String>("shared".to_string())
                    })
                    .await
                    .unwrap()
                    .0
            }
        });
        let results = futures::future::join_all(tasks).await;

        assert!(results.iter().all(|r| r == "shared"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
