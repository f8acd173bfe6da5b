//! Custom error types for hubview
//!
//! User-friendly error messages for all failure scenarios.

use thiserror::Error;

/// Main error type for the hubview application
#[derive(Error, Debug)]
pub enum HubviewError {
    /// A request or callback URL could not be built or parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Network request error (DNS, TLS, timeout, broken body)
    #[error("Network request failed: {0}\n\n  → Check your internet connection.")]
    Transport(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("Failed to parse response: {0}")]
    Decoding(#[from] serde_json::Error),

    /// The API rejected the token (HTTP 401)
    #[error("GitHub rejected the stored credentials.\n\n  → Run 'hubview auth login' to authenticate again.")]
    Unauthorized,

    /// HTTP 403 with an exhausted rate limit
    #[error("GitHub API rate limit exceeded.\n\n  → Wait a few minutes and try again, or log in to get a higher limit.")]
    RateLimitExceeded,

    /// Any other non-success HTTP status
    #[error("GitHub API request failed ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Raw response body
        message: String,
    },

    /// The user (or GitHub) denied the authorization request
    #[error("GitHub denied the authorization: {0}\n\n  → Run 'hubview auth login' to try again.")]
    AuthorizationDenied(String),

    /// Callback `state` did not match the pending login attempt
    #[error("The login callback does not belong to the current login attempt.\n\n  → Run 'hubview auth login' again and use the newest link.")]
    InvalidState,

    /// Code-for-token exchange failed
    #[error("Could not exchange the authorization code for a token: {0}\n\n  → Run 'hubview auth login' to try again.")]
    ExchangeFailed(String),

    /// A newer login attempt started while this one was exchanging its code
    #[error("This login was replaced by a newer login attempt.\n\n  → Finish the newest login in your browser.")]
    LoginSuperseded,

    /// The user dismissed the login without producing a callback
    #[error("Login cancelled.")]
    UserCancelled,

    /// Callback carried a valid state but no `code`
    #[error("The login callback did not contain an authorization code.\n\n  → Make sure you copied the full URL from the browser.")]
    MissingAuthorizationCode,

    /// User is not authenticated
    #[error("You are not logged in to GitHub.\n\n  → Run 'hubview auth login' to authenticate.")]
    NotAuthenticated,

    /// Credential storage error
    #[error("Cannot access secure storage: {0}\n\n  → On macOS: Make sure Keychain Access is available.\n  → On Linux: Ensure a secret service (like gnome-keyring) is running.\n  → Or pass --ephemeral to keep the token in memory only.")]
    Credential(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization/deserialization error
    #[error("Configuration file is invalid: {0}")]
    Toml(String),

    /// Invalid input from user
    #[error("{0}")]
    InvalidInput(String),
}

impl From<keyring::Error> for HubviewError {
    fn from(err: keyring::Error) -> Self {
        HubviewError::Credential(err.to_string())
    }
}

impl From<toml::de::Error> for HubviewError {
    fn from(err: toml::de::Error) -> Self {
        HubviewError::Toml(err.to_string())
    }
}

impl From<toml::ser::Error> for HubviewError {
    fn from(err: toml::ser::Error) -> Self {
        HubviewError::Toml(err.to_string())
    }
}

impl From<url::ParseError> for HubviewError {
    fn from(err: url::ParseError) -> Self {
        HubviewError::InvalidUrl(err.to_string())
    }
}

/// Result type alias using HubviewError
pub type Result<T> = std::result::Result<T, HubviewError>;
