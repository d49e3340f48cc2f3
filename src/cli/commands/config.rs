//! Config command implementation.

use crate::cli::ConfigAction;
use crate::config::Settings;
use anyhow::Result;

/// Run the config command.
///
/// `show` prints the effective settings with secrets redacted.
pub fn run_config(action: &ConfigAction, settings: Settings) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&redacted(settings))
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Path => {
            let config_path = Settings::default_config_path();
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

fn redacted(mut settings: Settings) -> Settings {
    let hide = |key: &mut Option<String>| {
        if key.is_some() {
            *key = Some("<redacted>".to_string());
        }
    };
    hide(&mut settings.synthesis.api_key);
    hide(&mut settings.youtube.api_key);
    settings
}
