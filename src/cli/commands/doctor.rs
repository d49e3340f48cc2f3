//! Doctor command - verify credentials and configuration.

use super::serve::cors_layer;
use crate::cli::output::mask_secret;
use crate::cli::Output;
use crate::config::Settings;
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("vidbrief Doctor");
    println!();
    println!("Checking credentials and configuration...\n");

    let sections = [
        (
            "API Configuration",
            vec![check_openai_api_key(settings), check_youtube_api_key(settings)],
        ),
        (
            "Server",
            vec![check_listen_address(settings), check_allowed_origin(settings)],
        ),
        ("Limits", vec![check_limits(settings), check_retry(settings)]),
        (
            "Configuration",
            vec![check_config_file(), check_prompt_dir(settings)],
        ),
    ];

    let mut errors = 0;
    let mut warnings = 0;
    for (title, checks) in &sections {
        println!("{}", style(title).bold());
        for check in checks {
            check.print();
            match check.status {
                CheckStatus::Error => errors += 1,
                CheckStatus::Warning => warnings += 1,
                CheckStatus::Ok => {}
            }
        }
        println!();
    }

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before starting vidbrief.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! vidbrief is ready to serve.");
    }

    Ok(())
}

fn check_openai_api_key(settings: &Settings) -> CheckResult {
    match settings.openai_api_key() {
        Ok(key) if key.starts_with("sk-") => {
            CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", mask_secret(key)))
        }
        Ok(_) => CheckResult::warning(
            "OPENAI_API_KEY",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        Err(_) => CheckResult::error(
            "OPENAI_API_KEY",
            "not set",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
    }
}

fn check_youtube_api_key(settings: &Settings) -> CheckResult {
    match settings.youtube_api_key() {
        Some(key) => CheckResult::ok(
            "YOUTUBE_API_KEY",
            &format!("configured ({}), videos are verified before fetching", mask_secret(key)),
        ),
        None => CheckResult::warning(
            "YOUTUBE_API_KEY",
            "not set, video verification is skipped",
            "Set with: export YOUTUBE_API_KEY='...' (YouTube Data API v3)",
        ),
    }
}

fn check_listen_address(settings: &Settings) -> CheckResult {
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    if settings.server.port == 0 {
        CheckResult::warning("Listen address", &addr, "Port 0 binds a random port")
    } else {
        CheckResult::ok("Listen address", &addr)
    }
}

fn check_allowed_origin(settings: &Settings) -> CheckResult {
    let origin = &settings.server.allowed_origin;
    match cors_layer(origin) {
        Ok(_) if origin.trim() == "*" => CheckResult::warning(
            "Allowed origin",
            "any origin (*)",
            "Restrict with: export ALLOWED_ORIGIN='https://your.app'",
        ),
        Ok(_) => CheckResult::ok("Allowed origin", origin),
        Err(e) => CheckResult::error(
            "Allowed origin",
            &e.to_string(),
            "Use a single origin such as https://your.app, or *",
        ),
    }
}

fn check_limits(settings: &Settings) -> CheckResult {
    let limits = &settings.limits;
    let describe = |n: u32| {
        if n == 0 {
            "unlimited".to_string()
        } else {
            n.to_string()
        }
    };
    let message = format!(
        "{} summaries, {} questions per {}s",
        describe(limits.summary_per_window),
        describe(limits.question_per_window),
        limits.window_secs
    );

    if limits.window_secs == 0 {
        CheckResult::error(
            "Rate limits",
            &message,
            "Set RATE_LIMIT_WINDOW_SECS to a positive number",
        )
    } else {
        CheckResult::ok("Rate limits", &message)
    }
}

fn check_retry(settings: &Settings) -> CheckResult {
    let transcript = &settings.transcript;
    CheckResult::ok(
        "Transcript retries",
        &format!(
            "{} attempts, {}ms initial backoff, languages {}",
            transcript.max_attempts.max(1),
            transcript.initial_backoff_ms,
            transcript.languages.join(", ")
        ),
    )
}

fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            &format!("Create one at {}", config_path.display()),
        )
    }
}

fn check_prompt_dir(settings: &Settings) -> CheckResult {
    match settings.prompts.custom_dir.as_deref() {
        None => CheckResult::ok("Prompts", "built-in"),
        Some(dir) => {
            let path = Settings::expand_path(dir).join("synthesis.toml");
            if path.exists() {
                CheckResult::ok("Prompts", &format!("{}", path.display()))
            } else {
                CheckResult::warning(
                    "Prompts",
                    &format!("{} not found, using built-in", path.display()),
                    "Add [summarize] and/or [answer] tables to override prompts",
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_missing_openai_key_is_error() {
        let settings = Settings::default();
        assert_eq!(check_openai_api_key(&settings).status, CheckStatus::Error);
    }

    #[test]
    fn test_configured_keys() {
        let mut settings = Settings::default();
        settings.synthesis.api_key = Some("sk-abcdefghijklmnop1234".to_string());
        settings.youtube.api_key = Some("AIzaSyExampleKey0000".to_string());

        let openai = check_openai_api_key(&settings);
        assert_eq!(openai.status, CheckStatus::Ok);
        assert!(openai.message.contains("sk-abcd...1234"));
        assert_eq!(check_youtube_api_key(&settings).status, CheckStatus::Ok);
    }

    #[test]
    fn test_missing_youtube_key_is_warning() {
        let settings = Settings::default();
        assert_eq!(check_youtube_api_key(&settings).status, CheckStatus::Warning);
    }

    #[test]
    fn test_zero_window_is_error() {
        let mut settings = Settings::default();
        settings.limits.window_secs = 0;
        assert_eq!(check_limits(&settings).status, CheckStatus::Error);
    }
}
