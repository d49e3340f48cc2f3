//! Transcript source abstraction for vidbrief.
//!
//! Provides trait-based interfaces for the two external backends the
//! acquisition engine talks to: a caption fetcher and an optional metadata
//! verifier.

mod data_api;
mod youtube;

pub use data_api::DataApiVerifier;
pub use youtube::YoutubeCaptionFetcher;

use crate::error::Result;
use crate::video::VideoId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single captioned segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// Outcome of asking the indexing API whether a video exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// The video exists.
    Exists,
    /// The indexing API confirms the video does not exist.
    NotFound,
    /// The indexing API refused the call because its quota is spent.
    QuotaExceeded,
    /// No verification backend is configured.
    Skipped,
}

impl std::fmt::Display for Verification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verification::Exists => write!(f, "exists"),
            Verification::NotFound => write!(f, "not found"),
            Verification::QuotaExceeded => write!(f, "quota exceeded"),
            Verification::Skipped => write!(f, "skipped"),
        }
    }
}

/// Trait for caption retrieval backends.
#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    /// Fetch the caption segments of a video, in temporal order.
    ///
    /// Errors carry the backend's message; the acquisition engine classifies
    /// them by content.
    async fn fetch(&self, id: &VideoId) -> Result<Vec<Segment>>;
}

/// Trait for video existence checks.
#[async_trait]
pub trait MetadataVerifier: Send + Sync {
    /// Check whether the video exists.
    async fn verify(&self, id: &VideoId) -> Result<Verification>;
}

/// Verifier used when no indexing API key is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkipVerification;

#[async_trait]
impl MetadataVerifier for SkipVerification {
    async fn verify(&self, _id: &VideoId) -> Result<Verification> {
        Ok(Verification::Skipped)
    }
}

/// Join segment texts with newlines, preserving their order.
pub fn join_segments(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
