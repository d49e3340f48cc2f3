//! OpenAI chat-completion synthesizer.

use super::Synthesizer;
use crate::config::{Prompts, SynthesisSettings};
use crate::error::{Result, VidbriefError};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// Synthesizer backed by the OpenAI chat completions API.
pub struct OpenAISynthesizer {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    prompts: Prompts,
}

impl OpenAISynthesizer {
    pub fn new(api_key: &str, settings: &SynthesisSettings) -> Result<Self> {
        Ok(Self {
            client: create_client(api_key, Duration::from_secs(settings.timeout_secs))?,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            prompts: Prompts::default(),
        })
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: String) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| VidbriefError::Synthesis(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user)
                .build()
                .map_err(|e| VidbriefError::Synthesis(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens)
            .build()
            .map_err(|e| VidbriefError::Synthesis(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            VidbriefError::OpenAI(format!("Failed to generate response: {}", e))
        })?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| VidbriefError::Synthesis("Empty response from model".to_string()))?;

        debug!(chars = content.len(), "Generated completion");
        Ok(content)
    }
}

#[async_trait]
impl Synthesizer for OpenAISynthesizer {
    #[instrument(skip_all, fields(model = %self.model, chars = transcript.len()))]
    async fn summarize(&self, transcript: &str) -> Result<String> {
        let mut vars = HashMap::new();
        vars.insert("transcript".to_string(), transcript.to_string());
        let user = self
            .prompts
            .render_with_custom(&self.prompts.summarize.user, &vars);

        self.complete(&self.prompts.summarize.system, user).await
    }

    #[instrument(skip_all, fields(model = %self.model, chars = transcript.len()))]
    async fn answer(&self, transcript: &str, question: &str) -> Result<String> {
        let mut vars = HashMap::new();
        vars.insert("transcript".to_string(), transcript.to_string());
        vars.insert("question".to_string(), question.to_string());
        let user = self.prompts.render_with_custom(&self.prompts.answer.user, &vars);

        self.complete(&self.prompts.answer.system, user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_from_settings() {
        let settings = SynthesisSettings {
            model: "gpt-4o-mini".to_string(),
            ..SynthesisSettings::default()
        };
        let synthesizer = OpenAISynthesizer::new("sk-test", &settings).unwrap();
        assert_eq!(synthesizer.model(), "gpt-4o-mini");
        assert_eq!(synthesizer.max_tokens, 500);
    }
}
