//! Ask command implementation.

use super::request::run_request;
use crate::config::Settings;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(url: &str, question: &str, settings: Settings) -> Result<()> {
    run_request(
        &settings,
        "Fetching transcript and thinking...",
        "Answer",
        |coordinator, cancel| async move {
            coordinator
                .answer_by_url(Some(url), Some(question), &cancel)
                .await
        },
    )
    .await
}
