//! Summarize command implementation.

use super::request::run_request;
use crate::config::Settings;
use anyhow::Result;

/// Run the summarize command.
pub async fn run_summarize(url: &str, settings: Settings) -> Result<()> {
    run_request(
        &settings,
        "Fetching transcript and summarizing...",
        "Summary",
        |coordinator, cancel| async move { coordinator.summarize_by_url(Some(url), &cancel).await },
    )
    .await
}
