//! Error types for vidbrief.

use crate::acquisition::AcquisitionFailure;
use thiserror::Error;

/// Library-level error type for vidbrief operations.
#[derive(Error, Debug)]
pub enum VidbriefError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid YouTube URL format: {0}")]
    InvalidReference(String),

    #[error("Transcript error: {0}")]
    Transcript(String),

    #[error("Verification error: {0}")]
    Verification(String),

    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),
}

// Request URLs carry signed query strings, so they are dropped from the error.
impl From<reqwest::Error> for VidbriefError {
    fn from(err: reqwest::Error) -> Self {
        VidbriefError::Http(err.without_url())
    }
}

/// Result type alias for vidbrief operations.
pub type Result<T> = std::result::Result<T, VidbriefError>;

/// Failure of a single client request, surfaced in the response `error` field.
///
/// Cloneable so that one failed computation can be fanned out to every
/// caller that was coalesced onto it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid YouTube URL format: {0}")]
    InvalidReference(String),

    #[error("Rate limit exceeded: {0}")]
    Throttled(String),

    #[error("Error fetching transcript: {0}")]
    Transcript(AcquisitionFailure),

    #[error("Error generating response: {0}")]
    Synthesis(String),
}
