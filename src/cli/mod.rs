//! CLI module for hubview
//!
//! This module contains all CLI command definitions and handlers using clap.

pub mod auth;
pub mod commands;
pub mod config;
pub mod me;
pub mod users;

use std::process::Command;

pub use commands::{Cli, Commands};

use crate::core::config::Config;
use crate::core::credentials::{KeyringStore, MemoryStore, SecretStore};
use crate::core::session::SessionState;
use crate::error::Result;
use crate::github::api::GitHubApi;
use crate::github::oauth::OAuthFlow;

/// Build the session a command runs in
///
/// `ephemeral` keeps the token in process memory instead of the keychain.
pub fn build_session(config: &Config, ephemeral: bool) -> Result<SessionState> {
    let api = GitHubApi::new(&config.api_base()?);
    let oauth = OAuthFlow::new(config.oauth_config()?);
    let store: Box<dyn SecretStore> = if ephemeral {
        Box::new(MemoryStore::new())
    } else {
        Box::new(KeyringStore::new())
    };

    SessionState::new(api, oauth, store)
}

/// Try to open a URL in the default browser
pub fn open_browser(url: &str) -> bool {
    #[cfg(target_os = "macos")]
    {
        Command::new("open").arg(url).spawn().is_ok()
    }
    #[cfg(target_os = "linux")]
    {
        Command::new("xdg-open").arg(url).spawn().is_ok()
    }
    #[cfg(target_os = "windows")]
    {
        Command::new("cmd")
            .args(["/C", "start", "", url])
            .spawn()
            .is_ok()
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        let _ = url;
        false
    }
}
