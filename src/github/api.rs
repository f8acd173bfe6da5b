//! Typed GitHub endpoint catalogue
//!
//! Each method maps typed parameters onto one [`RestClient`] call. Errors
//! propagate unchanged; there is no endpoint-specific handling here.

use secrecy::SecretString;
use url::form_urlencoded;
use url::Url;

use crate::error::Result;
use crate::github::rest::RestClient;
use crate::github::types::{Repository, User, UserDetail};

/// GitHub REST API facade
#[derive(Debug)]
pub struct GitHubApi {
    rest: RestClient,
}

impl GitHubApi {
    /// Create an API facade over a fresh client for `base_url`
    pub fn new(base_url: &Url) -> Self {
        Self {
            rest: RestClient::new(base_url),
        }
    }

    /// Wrap an existing client
    pub fn with_client(rest: RestClient) -> Self {
        Self { rest }
    }

    /// Underlying REST client
    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// Point the API at a different base URL
    pub fn configure(&self, base_url: &Url) {
        self.rest.configure(base_url);
    }

    /// Authenticate subsequent calls with `token`
    pub fn set_token(&self, token: SecretString) {
        self.rest.set_token(token);
    }

    /// Make subsequent calls anonymously
    pub fn clear_token(&self) {
        self.rest.clear_token();
    }

    /// List all users, starting after the account id `since`
    pub async fn users(&self, since: u64, per_page: u32) -> Result<Vec<User>> {
        self.rest
            .get(
                "/users",
                &[("since", since.to_string()), ("per_page", per_page.to_string())],
            )
            .await
    }

    /// Get a user's public profile
    pub async fn user(&self, username: &str) -> Result<UserDetail> {
        self.rest
            .get(&format!("/users/{}", encode_segment(username)), &[])
            .await
    }

    /// List repositories owned by `username` (forks are not filtered here)
    pub async fn user_repositories(
        &self,
        username: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Repository>> {
        self.rest
            .get(
                &format!("/users/{}/repos", encode_segment(username)),
                &owner_repo_query(page, per_page),
            )
            .await
    }

    /// Get the authenticated user's profile
    pub async fn current_user(&self) -> Result<UserDetail> {
        self.rest.get("/user", &[]).await
    }

    /// List repositories owned by the authenticated user
    pub async fn current_user_repositories(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Repository>> {
        self.rest
            .get("/user/repos", &owner_repo_query(page, per_page))
            .await
    }
}

fn owner_repo_query(page: u32, per_page: u32) -> [(&'static str, String); 3] {
    [
        ("page", page.to_string()),
        ("per_page", per_page.to_string()),
        ("type", "owner".to_string()),
    ]
}

/// Percent-encode a single path segment
fn encode_segment(segment: &str) -> String {
    form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
