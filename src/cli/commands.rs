//! CLI command definitions using clap
//!
//! Defines the command structure for the `hubview` CLI tool.

use clap::{Parser, Subcommand, ValueEnum};

/// hubview - browse GitHub users and repositories
///
/// Log in with your GitHub account through the browser, then list users,
/// inspect profiles and see their own (non-fork) repositories.
#[derive(Parser, Debug)]
#[command(name = "hubview", version, about, long_about = None)]
pub struct Cli {
    /// Keep the access token in memory only (nothing is written to the keychain)
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authenticate with GitHub
    Auth(AuthArgs),

    /// Browse GitHub users
    Users(UsersArgs),

    /// Show your own profile and repositories
    Me,

    /// Manage configuration
    Config(ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Authentication commands
#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Login to GitHub through the browser
    Login {
        /// Print the authorization URL without trying to open a browser
        #[arg(long)]
        no_browser: bool,
    },
    /// Logout and remove stored credentials
    Logout,
    /// Show current authentication status
    Status,
}

// ─────────────────────────────────────────────────────────────────────────────
// Users Commands
// ─────────────────────────────────────────────────────────────────────────────

/// User browsing commands
#[derive(Parser, Debug)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommand,
}

#[derive(Subcommand, Debug)]
pub enum UsersCommand {
    /// List GitHub users in sign-up order
    List {
        /// Start after this user id
        #[arg(long, default_value = "0")]
        since: u64,

        /// Users per page (defaults to the configured page size)
        #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..=100))]
        per_page: Option<u32>,

        /// Number of pages to fetch
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
        pages: u32,

        /// Only show logins containing this text (case-insensitive)
        #[arg(long)]
        filter: Option<String>,
    },

    /// Show a user's profile and their own repositories
    Show {
        /// Login of the user
        login: String,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration commands
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Set a configuration value
    Set {
        /// Configuration key
        key: ConfigKey,

        /// Configuration value
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key
        key: ConfigKey,
    },

    /// Reset a configuration value to its default
    Unset {
        /// Configuration key
        key: ConfigKey,
    },

    /// Print the configuration file location
    Path,
}

/// Available configuration keys
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConfigKey {
    /// OAuth App client id
    #[value(name = "client-id")]
    ClientId,

    /// OAuth App client secret
    #[value(name = "client-secret")]
    ClientSecret,

    /// Callback URL registered with the OAuth App
    #[value(name = "redirect-uri")]
    RedirectUri,

    /// Scopes requested at login
    #[value(name = "scope")]
    Scope,

    /// REST API root
    #[value(name = "api-url")]
    ApiUrl,

    /// Identity provider root
    #[value(name = "oauth-url")]
    OauthUrl,

    /// Items per page for list commands
    #[value(name = "per-page")]
    PerPage,
}
