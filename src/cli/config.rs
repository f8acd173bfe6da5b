//! Configuration CLI command handlers

use url::Url;

use crate::cli::commands::{ConfigCommand, ConfigKey};
use crate::core::config::Config;
use crate::core::credentials::mask_secret;
use crate::error::{HubviewError, Result};

/// Handle configuration commands
pub fn handle_config(command: ConfigCommand) -> Result<()> {
    let path = Config::config_path()?;

    match command {
        ConfigCommand::Set { key, value } => {
            // Edit the file's own values; environment overrides are not persisted
            let mut config = Config::load_from(&path)?;
            set_value(&mut config, key, &value)?;
            config.save_to(&path)?;
            println!("{} set to: {}", key_name(key), display_value(&config, key));
        }
        ConfigCommand::Get { key } => {
            let config = Config::load()?;
            println!("{}: {}", key_name(key), display_value(&config, key));
        }
        ConfigCommand::Unset { key } => {
            let mut config = Config::load_from(&path)?;
            reset_value(&mut config, key);
            config.save_to(&path)?;
            println!(
                "{} reset to default: {}",
                key_name(key),
                display_value(&config, key)
            );
        }
        ConfigCommand::Path => {
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn key_name(key: ConfigKey) -> &'static str {
    match key {
        ConfigKey::ClientId => "client-id",
        ConfigKey::ClientSecret => "client-secret",
        ConfigKey::RedirectUri => "redirect-uri",
        ConfigKey::Scope => "scope",
        ConfigKey::ApiUrl => "api-url",
        ConfigKey::OauthUrl => "oauth-url",
        ConfigKey::PerPage => "per-page",
    }
}

/// Validate and store one value
fn set_value(config: &mut Config, key: ConfigKey, value: &str) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(HubviewError::InvalidInput(format!(
            "Empty value for '{}'. Use 'hubview config unset {}' to restore the default.",
            key_name(key),
            key_name(key)
        )));
    }

    match key {
        ConfigKey::ClientId => config.client_id = value.to_string(),
        ConfigKey::ClientSecret => config.client_secret = value.to_string(),
        ConfigKey::Scope => config.scope = value.to_string(),
        ConfigKey::RedirectUri => config.redirect_uri = checked_url(key, value)?,
        ConfigKey::ApiUrl => config.api_url = checked_url(key, value)?,
        ConfigKey::OauthUrl => config.oauth_url = checked_url(key, value)?,
        ConfigKey::PerPage => {
            config.per_page = value
                .parse::<u32>()
                .ok()
                .filter(|n| (1..=100).contains(n))
                .ok_or_else(|| {
                    HubviewError::InvalidInput(format!(
                        "Invalid page size '{}'. Use a number from 1 to 100.",
                        value
                    ))
                })?;
        }
    }
    Ok(())
}

fn reset_value(config: &mut Config, key: ConfigKey) {
    let defaults = Config::default();
    match key {
        ConfigKey::ClientId => config.client_id = defaults.client_id,
        ConfigKey::ClientSecret => config.client_secret = defaults.client_secret,
        ConfigKey::RedirectUri => config.redirect_uri = defaults.redirect_uri,
        ConfigKey::Scope => config.scope = defaults.scope,
        ConfigKey::ApiUrl => config.api_url = defaults.api_url,
        ConfigKey::OauthUrl => config.oauth_url = defaults.oauth_url,
        ConfigKey::PerPage => config.per_page = defaults.per_page,
    }
}

fn display_value(config: &Config, key: ConfigKey) -> String {
    let value = match key {
        ConfigKey::ClientId => config.client_id.clone(),
        ConfigKey::ClientSecret => mask_secret(&config.client_secret),
        ConfigKey::RedirectUri => config.redirect_uri.clone(),
        ConfigKey::Scope => config.scope.clone(),
        ConfigKey::ApiUrl => config.api_url.clone(),
        ConfigKey::OauthUrl => config.oauth_url.clone(),
        ConfigKey::PerPage => config.per_page.to_string(),
    };

    if value.is_empty() {
        "Not configured".to_string()
    } else {
        value
    }
}

fn checked_url(key: ConfigKey, value: &str) -> Result<String> {
    Url::parse(value)
        .map(|_| value.to_string())
        .map_err(|e| {
            HubviewError::InvalidInput(format!(
                "Invalid URL for '{}': {} ({})",
                key_name(key),
                value,
                e
            ))
        })
}
