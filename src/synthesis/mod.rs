//! Text generation for summaries and answers.

mod openai;

pub use openai::OpenAISynthesizer;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for generating text from a transcript.
///
/// Failures are terminal for the request; implementations own any retry policy.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Summarize a transcript into key points.
    async fn summarize(&self, transcript: &str) -> Result<String>;

    /// Answer a question using a transcript as context.
    async fn answer(&self, transcript: &str, question: &str) -> Result<String>;
}
