//! Prompt templates for vidbrief.
//!
//! Prompts can be customized by placing a `synthesis.toml` file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub summarize: SummarizePrompts,
    pub answer: AnswerPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for transcript summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizePrompts {
    pub system: String,
    pub user: String,
}

impl Default for SummarizePrompts {
    fn default() -> Self {
        Self {
            system: "Summarize the following YouTube video transcript into key points."
                .to_string(),
            user: "{{transcript}}".to_string(),
        }
    }
}

/// Prompts for answering questions about a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerPrompts {
    pub system: String,
    pub user: String,
}

impl Default for AnswerPrompts {
    fn default() -> Self {
        Self {
            system: "You are an AI assistant that answers questions about YouTube videos based on their transcript."
                .to_string(),
            user: "Transcript: {{transcript}}\n\nQuestion: {{question}}".to_string(),
        }
    }
}

/// Layout of `synthesis.toml`; missing tables keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PromptFile {
    summarize: Option<SummarizePrompts>,
    answer: Option<AnswerPrompts>,
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let path = PathBuf::from(shellexpand::tilde(dir).to_string()).join("synthesis.toml");
            if path.exists() {
                let content = std::fs::read_to_string(&path)?;
                let file: PromptFile = toml::from_str(&content)?;
                if let Some(summarize) = file.summarize {
                    prompts.summarize = summarize;
                }
                if let Some(answer) = file.answer {
                    prompts.answer = answer;
                }
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are substituted in one pass over the template, so text
    /// inserted for one variable is never scanned for further placeholders.
    /// Unknown placeholders are left as written.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(open) = rest.find("{{") {
            let Some(close) = rest[open + 2..].find("}}") else {
                break;
            };
            let key = &rest[open + 2..open + 2 + close];
            let end = open + 2 + close + 2;
            result.push_str(&rest[..open]);
            match vars.get(key) {
                Some(value) => result.push_str(value),
                None => result.push_str(&rest[open..end]),
            }
            rest = &rest[end..];
        }
        result.push_str(rest);
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inserted_text_is_not_rendered_again() {
        let template = "Transcript: {{transcript}}\n\nQuestion: {{question}}";
        // Each map gets its own hash seed, so iteration order varies.
        for _ in 0..8 {
            let vars = HashMap::from([
                (
                    "transcript".to_string(),
                    "the host writes {{question}} on the board".to_string(),
                ),
                ("question".to_string(), "What is on the board?".to_string()),
            ]);
            assert_eq!(
                Prompts::render(template, &vars),
                "Transcript: the host writes {{question}} on the board\n\nQuestion: What is on the board?"
            );
        }
    }

    #[test]
    fn test_unknown_placeholders_are_kept() {
        let vars = HashMap::from([("name".to_string(), "Ada".to_string())]);
        assert_eq!(
            Prompts::render("{{name}} {{missing}} {{ name", &vars),
            "Ada {{missing}} {{ name"
        );
    }

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.summarize.system.contains("key points"));
        assert!(prompts.answer.user.contains("{{question}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_provided_vars_override_custom() {
        let mut custom = HashMap::new();
        custom.insert("tone".to_string(), "formal".to_string());
        custom.insert("question".to_string(), "ignored".to_string());
        let prompts = Prompts::load(None, Some(&custom)).unwrap();

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "Why?".to_string());
        let result = prompts.render_with_custom("{{tone}}: {{question}}", &vars);
        assert_eq!(result, "formal: Why?");
    }

    #[test]
    fn test_load_custom_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("synthesis.toml"),
            "[summarize]\nsystem = \"Three bullet points only.\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.summarize.system, "Three bullet points only.");
        assert_eq!(prompts.summarize.user, "{{transcript}}");
        assert_eq!(prompts.answer.system, AnswerPrompts::default().system);
    }
}
