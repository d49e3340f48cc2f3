//! CLI module for vidbrief.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// vidbrief - YouTube transcript summaries and answers
///
/// Serves an HTTP API that summarizes YouTube videos and answers questions
/// about them from their transcripts, or runs the same requests one-shot.
#[derive(Parser, Debug)]
#[command(name = "vidbrief")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to the configured host)
        #[arg(long, env = "HOST")]
        host: Option<String>,

        /// Port to bind to (defaults to the configured port)
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,
    },

    /// Summarize a YouTube video
    Summarize {
        /// YouTube URL (youtube.com/watch?v=... or youtu.be/...)
        url: String,
    },

    /// Ask a question about a YouTube video
    Ask {
        /// YouTube URL (youtube.com/watch?v=... or youtu.be/...)
        url: String,

        /// The question to ask
        question: String,
    },

    /// Check credentials and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
