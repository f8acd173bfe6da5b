//! Authenticated REST request pipeline
//!
//! Turns a logical request (method, path, query, optional JSON body) into a
//! decoded value, applying one authentication policy and one status
//! classification to every endpoint. No retries happen here.

use std::sync::{PoisonError, RwLock};

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::{HubviewError, Result};

/// Default GitHub REST API URL
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Header carrying the remaining request budget
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// User agent sent with every request (GitHub rejects requests without one)
const CLIENT_USER_AGENT: &str = concat!("hubview/", env!("CARGO_PKG_VERSION"));

/// Mutable client-wide settings
struct RestConfig {
    base_url: String,
    token: Option<SecretString>,
}

/// Generic authenticated HTTP client
///
/// Configuration lives behind a lock so a single client can be shared by
/// reference while the session swaps tokens in and out.
pub struct RestClient {
    http: Client,
    config: RwLock<RestConfig>,
}

impl RestClient {
    /// Create a client for the given API base URL, without a token
    pub fn new(base_url: &Url) -> Self {
        Self {
            http: Client::new(),
            config: RwLock::new(RestConfig {
                base_url: normalize_base(base_url),
                token: None,
            }),
        }
    }

    /// Point the client at a different API base URL
    pub fn configure(&self, base_url: &Url) {
        self.write_config().base_url = normalize_base(base_url);
    }

    /// Use `token` for every subsequent request
    pub fn set_token(&self, token: SecretString) {
        self.write_config().token = Some(token);
    }

    /// Stop sending an Authorization header
    pub fn clear_token(&self) {
        self.write_config().token = None;
    }

    /// Whether a token is currently configured
    pub fn has_token(&self) -> bool {
        self.read_config().token.is_some()
    }

    /// Current API base URL (without trailing slash)
    pub fn base_url(&self) -> String {
        self.read_config().base_url.clone()
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        self.request::<T, ()>(Method::GET, path, query, None).await
    }

    /// Perform a request and decode the JSON response as `T`
    ///
    /// Query values are appended verbatim; callers pass URL-safe values.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let (url, token) = {
            let config = self.read_config();
            (build_url(&config.base_url, path, query)?, config.token.clone())
        };

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, CLIENT_USER_AGENT);

        if let Some(token) = &token {
            request = request.header(AUTHORIZATION, format!("token {}", token.expose_secret()));
        }

        if let Some(body) = body {
            let encoded = serde_json::to_vec(body).map_err(|e| {
                HubviewError::InvalidInput(format!("Cannot encode request body: {}", e))
            })?;
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(encoded);
        }

        let response = request.send().await?;
        tracing::debug!(%method, %url, status = response.status().as_u16(), "github request");

        handle_response(response).await
    }

    fn read_config(&self) -> std::sync::RwLockReadGuard<'_, RestConfig> {
        self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_config(&self) -> std::sync::RwLockWriteGuard<'_, RestConfig> {
        self.config.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let config = self.read_config();
        f.debug_struct("RestClient")
            .field("base_url", &config.base_url)
            .field("token", &config.token.as_ref().map(|_| "[redacted]"))
            .finish_non_exhaustive()
    }
}

fn normalize_base(base_url: &Url) -> String {
    base_url.as_str().trim_end_matches('/').to_string()
}

/// Join base URL, path and pre-encoded query items
fn build_url(base_url: &str, path: &str, query: &[(&str, String)]) -> Result<Url> {
    let mut raw = format!("{}{}", base_url, path);
    if !query.is_empty() {
        let pairs: Vec<String> = query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        raw.push('?');
        raw.push_str(&pairs.join("&"));
    }
    Url::parse(&raw).map_err(|e| HubviewError::InvalidUrl(format!("{}: {}", raw, e)))
}

/// Classify the response status and decode successful bodies
async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();

    if status.is_success() {
        let bytes = response.bytes().await?;
        return Ok(serde_json::from_slice(&bytes)?);
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(HubviewError::Unauthorized),
        StatusCode::FORBIDDEN
            if response
                .headers()
                .get(RATE_LIMIT_REMAINING)
                .is_some_and(|v| v == "0") =>
        {
            Err(HubviewError::RateLimitExceeded)
        }
        _ => {
            let message = response.text().await?;
            Err(HubviewError::Server {
                status: status.as_u16(),
                message,
            })
        }
    }
}
