//! CLI command implementations.

mod ask;
mod config;
mod doctor;
mod request;
mod serve;
mod summarize;

pub use ask::run_ask;
pub use config::run_config;
pub use doctor::run_doctor;
pub use serve::{cors_layer, router, run_serve, AppState};
pub use summarize::run_summarize;
