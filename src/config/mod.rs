//! Configuration module for vidbrief.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnswerPrompts, Prompts, SummarizePrompts};
pub use settings::{
    CacheSettings, GeneralSettings, LimitSettings, PromptSettings, ServerSettings, Settings,
    SynthesisSettings, TranscriptSettings, YoutubeSettings,
};
