//! Failure classification for transcript retrieval errors.

use crate::error::VidbriefError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Why a transcript could not be acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    RateLimited,
    Unavailable,
    QuotaExceeded,
    Unknown,
    /// The caller went away while the engine was waiting to retry.
    Cancelled,
}

impl FailureKind {
    /// Whether another attempt could succeed.
    pub fn is_retryable(self) -> bool {
        matches!(self, FailureKind::RateLimited | FailureKind::Unknown)
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::NotFound => write!(f, "not found"),
            FailureKind::RateLimited => write!(f, "rate limited"),
            FailureKind::Unavailable => write!(f, "unavailable"),
            FailureKind::QuotaExceeded => write!(f, "quota exceeded"),
            FailureKind::Unknown => write!(f, "unknown"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

struct Rule {
    phrases: &'static [&'static str],
    kind: FailureKind,
}

/// Checked in order; the first rule with a matching phrase wins.
const RULES: &[Rule] = &[
    Rule {
        phrases: &["too many requests", "rate limit", "ratelimit", "429"],
        kind: FailureKind::RateLimited,
    },
    Rule {
        phrases: &["quota"],
        kind: FailureKind::QuotaExceeded,
    },
    Rule {
        phrases: &["unavailable", "disabled", "private"],
        kind: FailureKind::Unavailable,
    },
    Rule {
        phrases: &["not found", "404", "does not exist", "no longer exists"],
        kind: FailureKind::NotFound,
    },
];

/// Classify a backend error message by the phrases it contains.
///
/// URLs are ignored, and status codes only match as standalone tokens, so
/// digits inside a video id or a signed query string never pick the kind.
pub fn classify(message: &str) -> FailureKind {
    let lower = strip_urls(&message.to_lowercase());
    RULES
        .iter()
        .find(|rule| rule.phrases.iter().any(|p| contains_phrase(&lower, p)))
        .map(|rule| rule.kind)
        .unwrap_or(FailureKind::Unknown)
}

/// Classify a retrieval error, using the HTTP status and transport state of
/// request errors before falling back to the message.
pub fn classify_error(err: &VidbriefError) -> FailureKind {
    match err {
        VidbriefError::Http(e) => match e.status() {
            Some(StatusCode::TOO_MANY_REQUESTS) => FailureKind::RateLimited,
            Some(StatusCode::NOT_FOUND | StatusCode::GONE) => FailureKind::NotFound,
            Some(_) => classify(&e.to_string()),
            None => FailureKind::Unknown,
        },
        other => classify(&other.to_string()),
    }
}

fn strip_urls(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut rest = message;
    while let Some(start) = [rest.find("http://"), rest.find("https://")]
        .into_iter()
        .flatten()
        .min()
    {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let end = tail
            .find(|c: char| c.is_whitespace() || c == ')')
            .unwrap_or(tail.len());
        rest = &tail[end..];
    }
    out.push_str(rest);
    out
}

fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    if !phrase.bytes().all(|b| b.is_ascii_digit()) {
        return haystack.contains(phrase);
    }
    let is_token_char = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    haystack.match_indices(phrase).any(|(i, _)| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + phrase.len()..].chars().next();
        !before.is_some_and(is_token_char) && !after.is_some_and(is_token_char)
    })
}
