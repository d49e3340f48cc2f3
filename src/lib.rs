//! vidbrief - YouTube transcript summaries and answers
//!
//! A small HTTP service that fetches a YouTube video's captions and asks a
//! language model to summarize them or answer questions about them.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `video` - YouTube URL parsing into video ids
//! - `source` - Caption fetching and video verification backends
//! - `acquisition` - Transcript acquisition with retry and failure classification
//! - `cache` - TTL result cache with request coalescing
//! - `ratelimit` - Per-operation sliding-window rate limits
//! - `synthesis` - Summary and answer generation
//! - `coordinator` - Per-request composition of the above
//! - `config` - Configuration management
//!
//! # Example
//!
//! ```rust,no_run
//! use tokio_util::sync::CancellationToken;
//! use vidbrief::config::Settings;
//! use vidbrief::coordinator::RequestCoordinator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let coordinator = RequestCoordinator::from_settings(&settings)?;
//!
//!     let summary = coordinator
//!         .summarize_by_url(Some("https://youtu.be/dQw4w9WgXcQ"), &CancellationToken::new())
//!         .await?;
//!     println!("{}", summary);
//!
//!     Ok(())
//! }
//! ```

pub mod acquisition;
pub mod cache;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod openai;
pub mod ratelimit;
pub mod source;
pub mod synthesis;
pub mod video;

pub use error::{RequestError, Result, VidbriefError};
