//! Application configuration management
//!
//! Handles loading and saving application settings including:
//! - OAuth App registration (client id and secret)
//! - Redirect URI and requested scopes
//! - API and identity provider endpoints
//! - Page size for list commands
//!
//! Values come from `config.toml`; `HUBVIEW_CLIENT_ID` and
//! `HUBVIEW_CLIENT_SECRET` override the file.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{HubviewError, Result};
use crate::github::oauth::{OAuthConfig, DEFAULT_OAUTH_URL, DEFAULT_SCOPE};
use crate::github::rest::DEFAULT_API_URL;

/// Overrides the config file location
pub const CONFIG_PATH_ENV: &str = "HUBVIEW_CONFIG";
pub const CLIENT_ID_ENV: &str = "HUBVIEW_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "HUBVIEW_CLIENT_SECRET";

pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8914/callback";
pub const DEFAULT_PER_PAGE: u32 = 30;

/// GitHub caps `per_page` at 100
const MAX_PER_PAGE: u32 = 100;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OAuth App client id
    pub client_id: String,

    /// OAuth App client secret
    pub client_secret: String,

    /// Callback URL registered with the OAuth App
    pub redirect_uri: String,

    /// Space-separated scopes to request at login
    pub scope: String,

    /// REST API root
    pub api_url: String,

    /// Identity provider root (authorize and token endpoints)
    pub oauth_url: String,

    /// Items per page for list requests
    pub per_page: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            oauth_url: DEFAULT_OAUTH_URL.to_string(),
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl Config {
    /// Load configuration from file, or defaults if not exists, then apply
    /// environment overrides
    pub fn load() -> Result<Self> {
        let config = Self::load_from(&Self::config_path()?)?;
        Ok(config.with_overrides(|name| std::env::var(name).ok()))
    }

    /// Load configuration from a specific file, without environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&contents)?;
            tracing::debug!(path = %path.display(), "loaded configuration");
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }

        let project_dirs = ProjectDirs::from("com", "hubview", "hubview")
            .ok_or_else(|| HubviewError::Config("Could not determine config directory".into()))?;

        Ok(project_dirs.config_dir().join("config.toml"))
    }

    /// Apply credential overrides; `lookup` reads an environment variable
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(id) = lookup(CLIENT_ID_ENV).filter(|v| !v.is_empty()) {
            self.client_id = id;
        }
        if let Some(secret) = lookup(CLIENT_SECRET_ENV).filter(|v| !v.is_empty()) {
            self.client_secret = secret;
        }
        self
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<()> {
        require("client_id", &self.client_id)?;
        require("client_secret", &self.client_secret)?;
        require("scope", &self.scope)?;

        parse_url("redirect_uri", &self.redirect_uri)?;
        parse_url("api_url", &self.api_url)?;
        parse_url("oauth_url", &self.oauth_url)?;

        if self.per_page == 0 || self.per_page > MAX_PER_PAGE {
            return Err(HubviewError::Config(format!(
                "per_page must be between 1 and {}, got {}",
                MAX_PER_PAGE, self.per_page
            )));
        }

        Ok(())
    }

    /// REST API root as a URL
    pub fn api_base(&self) -> Result<Url> {
        parse_url("api_url", &self.api_url)
    }

    /// OAuth settings for the login flow
    ///
    /// Only the URLs are checked here; call [`Config::validate`] before
    /// starting a login.
    pub fn oauth_config(&self) -> Result<OAuthConfig> {
        Ok(OAuthConfig {
            client_id: self.client_id.clone(),
            client_secret: SecretString::from(self.client_secret.clone()),
            redirect_uri: parse_url("redirect_uri", &self.redirect_uri)?,
            scope: self.scope.clone(),
            provider_url: parse_url("oauth_url", &self.oauth_url)?,
        })
    }
}

fn require(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(HubviewError::Config(format!(
            "{} is not set\n\n  → Run 'hubview config set {} <value>'.",
            key,
            key.replace('_', "-")
        )));
    }
    Ok(())
}

fn parse_url(key: &str, value: &str) -> Result<Url> {
    Url::parse(value)
        .map_err(|e| HubviewError::Config(format!("{} '{}' is not a valid URL: {}", key, value, e)))
}
