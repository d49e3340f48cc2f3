//! Transcript acquisition with verification, retry and failure classification.
//!
//! The engine never returns an error: every outcome, including exhausted
//! retries and cancellation, is a [`TranscriptResult`] value.

mod classify;
mod retry;

pub use classify::{classify, classify_error, FailureKind};
pub use retry::{RetryPolicy, RetryState, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_ATTEMPTS};

use crate::source::{join_segments, MetadataVerifier, TranscriptFetcher, Verification};
use crate::video::VideoId;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// A classified acquisition failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcquisitionFailure {
    pub kind: FailureKind,
    pub detail: String,
    /// Fetch attempts made before giving up.
    pub attempts: u32,
}

impl AcquisitionFailure {
    pub fn new(kind: FailureKind, detail: impl Into<String>, attempts: u32) -> Self {
        Self {
            kind,
            detail: detail.into(),
            attempts,
        }
    }
}

impl std::fmt::Display for AcquisitionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.detail)?;
        if self.attempts > 1 {
            write!(f, " (after {} attempts)", self.attempts)?;
        }
        Ok(())
    }
}

/// Outcome of acquiring a transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptResult {
    /// Newline-joined caption text.
    Ok(String),
    Failed(AcquisitionFailure),
}

impl TranscriptResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, TranscriptResult::Ok(_))
    }

    pub fn into_result(self) -> std::result::Result<String, AcquisitionFailure> {
        match self {
            TranscriptResult::Ok(text) => Ok(text),
            TranscriptResult::Failed(failure) => Err(failure),
        }
    }
}

/// Orchestrates verification and caption fetching for one video at a time.
pub struct AcquisitionEngine {
    fetcher: Arc<dyn TranscriptFetcher>,
    verifier: Arc<dyn MetadataVerifier>,
    policy: RetryPolicy,
}

impl AcquisitionEngine {
    pub fn new(
        fetcher: Arc<dyn TranscriptFetcher>,
        verifier: Arc<dyn MetadataVerifier>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            verifier,
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Acquire the transcript of a video.
    ///
    /// Verification is advisory: only a confirmed "not found" stops the fetch.
    /// `RateLimited` and `Unknown` failures are retried with exponential
    /// backoff; every other kind is returned immediately. Cancelling `cancel`
    /// stops the loop at the next suspension point.
    #[instrument(skip(self, cancel), fields(video_id = %id))]
    pub async fn acquire(&self, id: &VideoId, cancel: &CancellationToken) -> TranscriptResult {
        match self.verifier.verify(id).await {
            Ok(Verification::NotFound) => {
                info!("Video confirmed missing, skipping fetch");
                return TranscriptResult::Failed(AcquisitionFailure::new(
                    FailureKind::NotFound,
                    format!("Video {} not found", id),
                    0,
                ));
            }
            Ok(Verification::QuotaExceeded) => {
                warn!("Verification quota exceeded, fetching without verification");
            }
            Ok(outcome) => debug!("Verification: {}", outcome),
            Err(e) => warn!("Verification failed, fetching without verification: {}", e),
        }

        let mut state = self.policy.start();
        loop {
            let attempt = state.begin_attempt();

            let fetched = tokio::select! {
                result = self.fetcher.fetch(id) => result,
                () = cancel.cancelled() => return cancelled(&state),
            };

            let failure = match fetched {
                Ok(segments) if segments.is_empty() => {
                    AcquisitionFailure::new(
                        FailureKind::Unavailable,
                        format!("Transcript for video {} is empty", id),
                        attempt,
                    )
                }
                Ok(segments) => {
                    info!(attempt, segments = segments.len(), "Transcript fetched");
                    return TranscriptResult::Ok(join_segments(&segments));
                }
                Err(e) => AcquisitionFailure::new(classify_error(&e), e.to_string(), attempt),
            };

            warn!(
                attempt,
                kind = %failure.kind,
                error = %failure.detail,
                "Transcript fetch failed"
            );

            if !failure.kind.is_retryable() || !state.has_attempts_left() {
                return TranscriptResult::Failed(failure);
            }

            let delay = state.next_backoff();
            debug!("Retrying in {:?}", delay);
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = cancel.cancelled() => return cancelled(&state),
            }
        }
    }
}

fn cancelled(state: &RetryState) -> TranscriptResult {
    info!(attempts = state.attempts(), "Acquisition cancelled");
    TranscriptResult::Failed(AcquisitionFailure::new(
        FailureKind::Cancelled,
        "Request cancelled",
        state.attempts(),
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{Result, VidbriefError};
    use crate::source::{Segment, SkipVerification};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Fetcher that replays a script of outcomes, repeating the last one.
    pub(crate) struct ScriptedFetcher {
        script: Mutex<VecDeque<std::result::Result<Vec<&'static str>, &'static str>>>,
        pub(crate) calls: AtomicU32,
    }

    impl ScriptedFetcher {
        pub(crate) fn new(
            script: Vec<std::result::Result<Vec<&'static str>, &'static str>>,
        ) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
            }
        }

        pub(crate) fn ok(lines: Vec<&'static str>) -> Self {
            Self::new(vec![Ok(lines)])
        }

        pub(crate) fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TranscriptFetcher for ScriptedFetcher {
        async fn fetch(&self, _id: &VideoId) -> Result<Vec<Segment>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = {
                let mut script = self.script.lock().unwrap();
                if script.len() > 1 {
                    script.pop_front()
                } else {
                    script.front().cloned()
                }
            };
            match next {
                Some(Ok(lines)) => Ok(lines
                    .into_iter()
                    .enumerate()
                    .map(|(i, text)| Segment {
                        text: text.to_string(),
                        start: i as f64,
                        duration: 1.0,
                    })
                    .collect()),
                Some(Err(message)) => Err(VidbriefError::Transcript(message.to_string())),
                None => Err(VidbriefError::Transcript("empty script".to_string())),
            }
        }
    }

    struct FixedVerifier(std::result::Result<Verification, &'static str>);

    #[async_trait]
    impl MetadataVerifier for FixedVerifier {
        async fn verify(&self, _id: &VideoId) -> Result<Verification> {
            self.0
                .map_err(|message| VidbriefError::Verification(message.to_string()))
        }
    }

    fn engine(fetcher: Arc<ScriptedFetcher>, verifier: Arc<dyn MetadataVerifier>) -> AcquisitionEngine {
        AcquisitionEngine::new(fetcher, verifier, RetryPolicy::default())
    }

    fn video() -> VideoId {
        VideoId::new("abc123").unwrap()
    }

    fn failure(result: TranscriptResult) -> AcquisitionFailure {
        match result {
            TranscriptResult::Failed(failure) => failure,
            TranscriptResult::Ok(text) => panic!("expected failure, got transcript {:?}", text),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_joins_lines_in_order() {
        let fetcher = Arc::new(ScriptedFetcher::ok(vec!["hello", "there", "world"]));
        let engine = engine(fetcher.clone(), Arc::new(SkipVerification));

        let result = engine.acquire(&video(), &CancellationToken::new()).await;

        assert_eq!(result, TranscriptResult::Ok("hello\nthere\nworld".to_string()));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_not_retried() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Err("Video abc123 not found")]));
        let engine = engine(fetcher.clone(), Arc::new(SkipVerification));

        let failure = failure(engine.acquire(&video(), &CancellationToken::new()).await);

        assert_eq!(failure.kind, FailureKind::NotFound);
        assert_eq!(failure.attempts, 1);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_is_not_retried() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Err(
            "Transcripts are disabled for video abc123",
        )]));
        let engine = engine(fetcher.clone(), Arc::new(SkipVerification));

        let failure = failure(engine.acquire(&video(), &CancellationToken::new()).await);

        assert_eq!(failure.kind, FailureKind::Unavailable);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_from_fetch_is_not_retried() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Err("quota exhausted")]));
        let engine = engine(fetcher.clone(), Arc::new(SkipVerification));

        let failure = failure(engine.acquire(&video(), &CancellationToken::new()).await);

        assert_eq!(failure.kind, FailureKind::QuotaExceeded);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_exhausts_retries_with_doubling_backoff() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Err("Too Many Requests")]));
        let engine = engine(fetcher.clone(), Arc::new(SkipVerification));

        let started = tokio::time::Instant::now();
        let failure = failure(engine.acquire(&video(), &CancellationToken::new()).await);
        let elapsed = started.elapsed();

        assert_eq!(failure.kind, FailureKind::RateLimited);
        assert_eq!(failure.attempts, 3);
        assert_eq!(fetcher.calls(), 3);
        // 2s before the second attempt, 4s before the third, none after.
        assert!(elapsed >= Duration::from_secs(6), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(7), "elapsed {:?}", elapsed);
        assert!(failure.to_string().contains("after 3 attempts"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_failure_recovers_on_retry() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Err("connection reset by peer"),
            Ok(vec!["recovered"]),
        ]));
        let engine = engine(fetcher.clone(), Arc::new(SkipVerification));

        let started = tokio::time::Instant::now();
        let result = engine.acquire(&video(), &CancellationToken::new()).await;

        assert_eq!(result, TranscriptResult::Ok("recovered".to_string()));
        assert_eq!(fetcher.calls(), 2);
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_with_signed_url_is_retried() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Err("error sending request for url (https://www.youtube.com/api/timedtext?v=abc123&expire=1729404187&signature=8E43A0AB)"),
            Ok(vec!["recovered"]),
        ]));
        let engine = engine(fetcher.clone(), Arc::new(SkipVerification));

        let result = engine.acquire(&video(), &CancellationToken::new()).await;

        assert_eq!(result, TranscriptResult::Ok("recovered".to_string()));
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_video_id_digits_do_not_pick_the_kind() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Err("Playback of video x429a4041bc stalled"),
            Ok(vec!["recovered"]),
        ]));
        let engine = engine(fetcher.clone(), Arc::new(SkipVerification));

        let result = engine.acquire(&video(), &CancellationToken::new()).await;

        assert_eq!(result, TranscriptResult::Ok("recovered".to_string()));
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_verified_missing_video_skips_fetch() {
        let fetcher = Arc::new(ScriptedFetcher::ok(vec!["never"]));
        let engine = engine(fetcher.clone(), Arc::new(FixedVerifier(Ok(Verification::NotFound))));

        let failure = failure(engine.acquire(&video(), &CancellationToken::new()).await);

        assert_eq!(failure.kind, FailureKind::NotFound);
        assert_eq!(failure.attempts, 0);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_verification_is_advisory() {
        for verifier in [
            FixedVerifier(Ok(Verification::QuotaExceeded)),
            FixedVerifier(Ok(Verification::Exists)),
            FixedVerifier(Err("connection refused")),
        ] {
            let fetcher = Arc::new(ScriptedFetcher::ok(vec!["text"]));
            let engine = engine(fetcher.clone(), Arc::new(verifier));

            let result = engine.acquire(&video(), &CancellationToken::new()).await;

            assert!(result.is_ok());
            assert_eq!(fetcher.calls(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_transcript_is_unavailable() {
        let fetcher = Arc::new(ScriptedFetcher::ok(vec![]));
        let engine = engine(fetcher.clone(), Arc::new(SkipVerification));

        let failure = failure(engine.acquire(&video(), &CancellationToken::new()).await);

        assert_eq!(failure.kind, FailureKind::Unavailable);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_retrying() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Err("Too Many Requests")]));
        let engine = engine(fetcher.clone(), Arc::new(SkipVerification));
        let token = CancellationToken::new();
        let child = token.clone();

        let handle = tokio::spawn(async move { engine.acquire(&video(), &child).await });
        tokio::time::sleep(Duration::from_millis(500)).await;
        token.cancel();

        let failure = failure(handle.await.unwrap());
        assert_eq!(failure.kind, FailureKind::Cancelled);
        assert_eq!(failure.attempts, 1);
        assert_eq!(fetcher.calls(), 1);
    }

    #[test]
    fn test_into_result() {
        assert_eq!(
            TranscriptResult::Ok("text".to_string()).into_result(),
            Ok("text".to_string())
        );
        let failure = AcquisitionFailure::new(FailureKind::NotFound, "gone", 1);
        assert_eq!(
            TranscriptResult::Failed(failure.clone()).into_result(),
            Err(failure)
        );
    }
}
