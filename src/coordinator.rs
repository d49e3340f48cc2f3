//! Request coordinator for vidbrief.
//!
//! Composes rate limiting, validation, caching, transcript acquisition and
//! synthesis for each client request.

use crate::acquisition::{AcquisitionEngine, FailureKind};
use crate::cache::{CacheKey, Operation, ResultCache};
use crate::config::{Prompts, Settings};
use crate::error::{RequestError, Result};
use crate::ratelimit::RateLimiter;
use crate::source::{DataApiVerifier, MetadataVerifier, SkipVerification, YoutubeCaptionFetcher};
use crate::synthesis::{OpenAISynthesizer, Synthesizer};
use crate::video::{parse_video_url, VideoId};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

type RequestResult = std::result::Result<String, RequestError>;

/// The shared context every request runs against.
pub struct RequestCoordinator {
    engine: AcquisitionEngine,
    synthesizer: Arc<dyn Synthesizer>,
    cache: ResultCache,
    limiter: RateLimiter,
}

impl RequestCoordinator {
    /// Build the production components from settings.
    ///
    /// Fails if no OpenAI API key is configured.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.openai_api_key()?;

        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let synthesizer = Arc::new(
            OpenAISynthesizer::new(api_key, &settings.synthesis)?.with_prompts(prompts),
        );

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.transcript.request_timeout_secs))
            .build()?;

        let fetcher = Arc::new(YoutubeCaptionFetcher::new(
            http.clone(),
            settings.transcript.languages.clone(),
        ));

        let verifier: Arc<dyn MetadataVerifier> = match settings.youtube_api_key() {
            Some(key) => {
                info!("Video verification enabled via YouTube Data API");
                Arc::new(DataApiVerifier::new(http, key))
            }
            None => {
                info!("No YouTube API key configured, skipping video verification");
                Arc::new(SkipVerification)
            }
        };

        let engine =
            AcquisitionEngine::new(fetcher, verifier, settings.transcript.retry_policy());
        let cache =
            ResultCache::with_config(settings.cache.max_entries, settings.cache.ttl());
        let limiter = RateLimiter::new(settings.limits.summary(), settings.limits.question());

        Ok(Self::new(engine, synthesizer, cache, limiter))
    }

    /// Create a coordinator with custom components.
    pub fn new(
        engine: AcquisitionEngine,
        synthesizer: Arc<dyn Synthesizer>,
        cache: ResultCache,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            engine,
            synthesizer,
            cache,
            limiter,
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Summarize the video behind a YouTube URL.
    #[instrument(skip(self, cancel))]
    pub async fn summarize_by_url(
        &self,
        video_url: Option<&str>,
        cancel: &CancellationToken,
    ) -> RequestResult {
        self.admit(Operation::Summarize)?;
        let video_url = required(video_url, "No video URL provided")?;
        let id = parse_reference(video_url)?;

        let key = CacheKey::for_video(Operation::Summarize, &id, None);
        self.cached(key, cancel, || self.synthesize_from_video(&id, None, cancel))
            .await
    }

    /// Answer a question about the video behind a YouTube URL.
    #[instrument(skip(self, cancel))]
    pub async fn answer_by_url(
        &self,
        video_url: Option<&str>,
        question: Option<&str>,
        cancel: &CancellationToken,
    ) -> RequestResult {
        self.admit(Operation::Answer)?;
        let question = required(question, "No question provided")?;
        let video_url = required(video_url, "No video URL provided")?;
        let id = parse_reference(video_url)?;

        let key = CacheKey::for_video(Operation::Answer, &id, Some(question));
        self.cached(key, cancel, || {
            self.synthesize_from_video(&id, Some(question), cancel)
        })
        .await
    }

    /// Summarize a caller-supplied transcript.
    #[instrument(skip_all, fields(chars = transcript.map(str::len)))]
    pub async fn summarize_transcript(&self, transcript: Option<&str>) -> RequestResult {
        self.admit(Operation::Summarize)?;
        let transcript = required(transcript, "No transcript provided")?;

        let key = CacheKey::for_transcript(Operation::Summarize, transcript, None);
        self.cached(key, &CancellationToken::new(), || {
            self.synthesize(transcript, None)
        })
        .await
    }

    /// Answer a question about a caller-supplied transcript.
    #[instrument(skip_all, fields(chars = transcript.map(str::len)))]
    pub async fn answer_transcript(
        &self,
        transcript: Option<&str>,
        question: Option<&str>,
    ) -> RequestResult {
        self.admit(Operation::Answer)?;
        let transcript = required(transcript, "No transcript provided")?;
        let question = required(question, "No question provided")?;

        let key = CacheKey::for_transcript(Operation::Answer, transcript, Some(question));
        self.cached(key, &CancellationToken::new(), || {
            self.synthesize(transcript, Some(question))
        })
        .await
    }

    fn admit(&self, operation: Operation) -> std::result::Result<(), RequestError> {
        self.limiter.check(operation).map_err(|throttle| {
            info!(%operation, "Request throttled");
            RequestError::Throttled(throttle.to_string())
        })
    }

    /// Serve `key` from the cache, or compute it once for all concurrent callers.
    ///
    /// A caller that was coalesced onto another request's computation and
    /// received that request's cancellation recomputes on its own behalf.
    async fn cached<F, Fut>(
        &self,
        key: CacheKey,
        cancel: &CancellationToken,
        compute: F,
    ) -> RequestResult
    where
        F: Fn() -> Fut,
        Fut: Future<Output = RequestResult>,
    {
        loop {
            match self.cache.get_or_try_insert_with(key, compute()).await {
                Ok((value, reused)) => {
                    debug!(key = %key.to_hex(), reused, "Request served");
                    return Ok(value);
                }
                Err(e) if is_cancelled(&e) && !cancel.is_cancelled() => {
                    debug!(key = %key.to_hex(), "Shared computation was cancelled, recomputing");
                }
                Err(e) => return Err((*e).clone()),
            }
        }
    }

    /// Acquire a video's transcript, then summarize it or answer `question`.
    ///
    /// The result is also stored under the transcript's content key, and an
    /// existing content-key entry is reused instead of synthesizing again.
    async fn synthesize_from_video(
        &self,
        id: &VideoId,
        question: Option<&str>,
        cancel: &CancellationToken,
    ) -> RequestResult {
        let transcript = self
            .engine
            .acquire(id, cancel)
            .await
            .into_result()
            .map_err(RequestError::Transcript)?;

        let operation = operation_for(question);
        let content_key = CacheKey::for_transcript(operation, &transcript, question);
        if let Some(hit) = self.cache.get(&content_key).await {
            debug!(video_id = %id, "Transcript already synthesized");
            return Ok(hit);
        }

        let output = self.synthesize(&transcript, question).await?;
        self.cache
            .put(content_key, output.as_str(), self.cache.ttl())
            .await;
        Ok(output)
    }

    async fn synthesize(&self, transcript: &str, question: Option<&str>) -> RequestResult {
        let result = match question {
            Some(question) => self.synthesizer.answer(transcript, question).await,
            None => self.synthesizer.summarize(transcript).await,
        };
        result.map_err(|e| RequestError::Synthesis(e.to_string()))
    }
}

fn operation_for(question: Option<&str>) -> Operation {
    if question.is_some() {
        Operation::Answer
    } else {
        Operation::Summarize
    }
}

/// Reject missing and blank fields.
fn required<'a>(value: Option<&'a str>, message: &str) -> std::result::Result<&'a str, RequestError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| RequestError::BadRequest(message.to_string()))
}

fn parse_reference(video_url: &str) -> std::result::Result<VideoId, RequestError> {
    parse_video_url(video_url).map_err(|_| RequestError::InvalidReference(video_url.to_string()))
}

fn is_cancelled(error: &RequestError) -> bool {
    matches!(error, RequestError::Transcript(f) if f.kind == FailureKind::Cancelled)
}
