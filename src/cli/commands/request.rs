//! Shared runner for one-shot requests from the command line.

use crate::cli::Output;
use crate::config::Settings;
use crate::coordinator::RequestCoordinator;
use crate::error::RequestError;
use anyhow::Result;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Build a coordinator, run one request with a spinner, and print the result.
///
/// Ctrl+C cancels the request; the acquisition loop stops at its next wait.
pub(super) async fn run_request<F, Fut>(
    settings: &Settings,
    spinner_msg: &str,
    label: &str,
    request: F,
) -> Result<()>
where
    F: FnOnce(RequestCoordinator, CancellationToken) -> Fut,
    Fut: Future<Output = std::result::Result<String, RequestError>>,
{
    let coordinator = match RequestCoordinator::from_settings(settings) {
        Ok(coordinator) => coordinator,
        Err(e) => {
            Output::error(&e.to_string());
            Output::info("Run 'vidbrief doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let spinner = Output::spinner(spinner_msg);
    let result = request(coordinator, cancel).await;
    spinner.finish_and_clear();
    interrupt.abort();

    match result {
        Ok(text) => {
            Output::result(label, &text);
            Ok(())
        }
        Err(e) => {
            Output::error(&e.to_string());
            Err(e.into())
        }
    }
}
