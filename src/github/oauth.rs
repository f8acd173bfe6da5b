//! OAuth authorization-code flow for GitHub
//!
//! Drives one login attempt at a time through
//! `Idle → AwaitingCallback → ExchangingCode → Completed | Failed`.
//! See: https://docs.github.com/en/apps/oauth-apps/building-oauth-apps/authorizing-oauth-apps#web-application-flow
//!
//! Every attempt carries a fresh CSRF nonce (`state`). A callback is only
//! accepted when its `state` equals the newest unconsumed nonce; the nonce is
//! consumed by the first callback that reaches validation, whatever the outcome.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::distr::Alphanumeric;
use rand::Rng;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::{form_urlencoded, Url};

use crate::error::{HubviewError, Result};

/// Default identity provider
pub const DEFAULT_OAUTH_URL: &str = "https://github.com";

/// Default scopes: profile plus repository access
pub const DEFAULT_SCOPE: &str = "user repo";

/// Length of the CSRF nonce
const STATE_LEN: usize = 30;

/// Authorization endpoint, relative to the provider URL
const AUTHORIZE_PATH: &str = "/login/oauth/authorize";

/// Token endpoint, relative to the provider URL
const ACCESS_TOKEN_PATH: &str = "/login/oauth/access_token";

/// OAuth App registration and endpoints
///
/// GitHub's web flow requires the client secret in the code exchange, so it
/// ships with the client. Anyone holding the binary can read it; treat the
/// OAuth App as a public client.
#[derive(Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_uri: Url,
    /// Space-separated scopes to request
    pub scope: String,
    /// Provider root, e.g. `https://github.com`
    pub provider_url: Url,
}

impl OAuthConfig {
    /// Authorization endpoint URL
    pub fn authorize_url(&self) -> String {
        format!("{}{}", trim_base(&self.provider_url), AUTHORIZE_PATH)
    }

    /// Token exchange endpoint URL
    pub fn token_url(&self) -> String {
        format!("{}{}", trim_base(&self.provider_url), ACCESS_TOKEN_PATH)
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("redirect_uri", &self.redirect_uri.as_str())
            .field("scope", &self.scope)
            .field("provider_url", &self.provider_url.as_str())
            .finish()
    }
}

/// Observable phase of the login flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    Idle,
    AwaitingCallback,
    ExchangingCode,
    Completed,
    Failed,
}

/// Where to send the user, and the nonce the callback must echo back
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: Url,
    pub state: String,
}

/// Access token won by one login attempt
#[derive(Debug)]
pub struct AuthorizedToken {
    pub token: SecretString,
    /// Attempt that produced the token, see [`OAuthFlow::finish`]
    pub attempt: u64,
}

/// Token response from GitHub
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Error response from GitHub's token endpoint
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Code exchange request body
#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
    redirect_uri: &'a str,
}

struct FlowState {
    phase: FlowPhase,
    pending_state: Option<String>,
    /// Bumped on every `start_login`, so a slow exchange can tell it was superseded
    attempt: u64,
}

/// OAuth authorization-code flow handler
pub struct OAuthFlow {
    config: OAuthConfig,
    client: Client,
    state: Mutex<FlowState>,
}

impl OAuthFlow {
    /// Create an idle flow for the given app registration
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            client: Client::new(),
            state: Mutex::new(FlowState {
                phase: FlowPhase::Idle,
                pending_state: None,
                attempt: 0,
            }),
        }
    }

    /// App registration in use
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Current phase
    pub fn phase(&self) -> FlowPhase {
        self.lock().phase
    }

    /// Begin a login attempt
    ///
    /// Any unconsumed nonce from an earlier attempt is discarded, so a late
    /// callback for it will be rejected.
    pub fn start_login(&self) -> Result<AuthorizationRequest> {
        let state = generate_state();
        let url = self.authorization_url(&state)?;

        let mut flow = self.lock();
        if flow.pending_state.is_some() {
            tracing::debug!("superseding pending login attempt");
        }
        flow.pending_state = Some(state.clone());
        flow.phase = FlowPhase::AwaitingCallback;
        flow.attempt += 1;

        Ok(AuthorizationRequest { url, state })
    }

    /// Validate a callback URL and exchange its code for an access token
    ///
    /// If another login started while the code was being exchanged, the token
    /// is discarded and the newer attempt is left alone.
    pub async fn handle_callback(&self, callback: &str) -> Result<AuthorizedToken> {
        let (code, attempt) = self.accept_callback(callback)?;

        let result = self.exchange_code(&code).await;

        let mut flow = self.lock();
        if flow.attempt != attempt {
            tracing::warn!("dropping token from a superseded login attempt");
            return Err(HubviewError::LoginSuperseded);
        }
        flow.phase = if result.is_ok() {
            FlowPhase::Completed
        } else {
            FlowPhase::Failed
        };
        tracing::debug!(phase = ?flow.phase, "code exchange finished");

        result.map(|token| AuthorizedToken { token, attempt })
    }

    /// Re-arm the flow after `attempt` completed
    ///
    /// Returns false, touching nothing, when a newer attempt has started since.
    pub fn finish(&self, attempt: u64) -> bool {
        let mut flow = self.lock();
        if flow.attempt != attempt {
            return false;
        }
        flow.pending_state = None;
        flow.phase = FlowPhase::Idle;
        true
    }

    /// The user dismissed the browser without completing the login
    ///
    /// Discards the pending nonce, returns to `Idle` and yields the error to
    /// report.
    pub fn cancel(&self) -> HubviewError {
        let mut flow = self.lock();
        flow.pending_state = None;
        flow.phase = FlowPhase::Idle;
        HubviewError::UserCancelled
    }

    /// Check the callback against the pending attempt and extract the code
    fn accept_callback(&self, callback: &str) -> Result<(String, u64)> {
        let url = Url::parse(callback.trim())
            .map_err(|e| HubviewError::InvalidUrl(format!("{}: {}", callback.trim(), e)))?;

        if !self.matches_redirect(&url) {
            return Err(HubviewError::InvalidUrl(format!(
                "{} does not match the redirect URI {}",
                url, self.config.redirect_uri
            )));
        }

        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

        let mut flow = self.lock();
        let pending = flow.pending_state.take();

        if let Some(reason) = params
            .get("error_description")
            .or_else(|| params.get("error"))
        {
            flow.phase = FlowPhase::Failed;
            return Err(HubviewError::AuthorizationDenied(reason.clone()));
        }

        let state_matches = match (params.get("state"), pending.as_deref()) {
            (Some(returned), Some(expected)) => returned == expected,
            _ => false,
        };
        if !state_matches {
            tracing::warn!("rejecting OAuth callback with unknown state");
            flow.phase = FlowPhase::Failed;
            return Err(HubviewError::InvalidState);
        }

        match params.get("code").filter(|code| !code.is_empty()) {
            Some(code) => {
                flow.phase = FlowPhase::ExchangingCode;
                Ok((code.clone(), flow.attempt))
            }
            None => {
                flow.phase = FlowPhase::Failed;
                Err(HubviewError::MissingAuthorizationCode)
            }
        }
    }

    fn matches_redirect(&self, url: &Url) -> bool {
        let expected = &self.config.redirect_uri;
        url.scheme() == expected.scheme()
            && url.host_str() == expected.host_str()
            && url.port_or_known_default() == expected.port_or_known_default()
            && url.path().trim_end_matches('/') == expected.path().trim_end_matches('/')
    }

    fn authorization_url(&self, state: &str) -> Result<Url> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("scope", self.config.scope.as_str()),
            ("state", state),
        ];

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, encode_component(v)))
            .collect::<Vec<_>>()
            .join("&");

        let raw = format!("{}?{}", self.config.authorize_url(), query);
        Url::parse(&raw).map_err(|e| HubviewError::InvalidUrl(format!("{}: {}", raw, e)))
    }

    /// Exchange an authorization code for an access token
    async fn exchange_code(&self, code: &str) -> Result<SecretString> {
        let request = TokenRequest {
            client_id: &self.config.client_id,
            client_secret: self.config.client_secret.expose_secret(),
            code,
            redirect_uri: self.config.redirect_uri.as_str(),
        };

        let response = self
            .client
            .post(self.config.token_url())
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("hubview/", env!("CARGO_PKG_VERSION")))
            .form(&request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(HubviewError::ExchangeFailed(format!(
                "token endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        match parse_token_response(&text) {
            Some(token) => Ok(SecretString::from(token)),
            None => Err(HubviewError::ExchangeFailed(describe_exchange_failure(&text))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FlowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for OAuthFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthFlow")
            .field("config", &self.config)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

/// Extract the access token from a token endpoint response
///
/// Tries JSON (`{"access_token": ...}`) first, then the legacy
/// `access_token=...&token_type=bearer` form encoding.
pub fn parse_token_response(body: &str) -> Option<String> {
    if let Ok(response) = serde_json::from_str::<TokenResponse>(body) {
        if !response.access_token.is_empty() {
            return Some(response.access_token);
        }
    }

    form_urlencoded::parse(body.trim().as_bytes())
        .find(|(key, _)| key == "access_token")
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
}

fn describe_exchange_failure(body: &str) -> String {
    if let Ok(error) = serde_json::from_str::<ErrorResponse>(body) {
        return error.error_description.unwrap_or(error.error);
    }
    if let Some((_, error)) = form_urlencoded::parse(body.trim().as_bytes()).find(|(k, _)| k == "error") {
        return error.into_owned();
    }
    "unexpected response from the token endpoint".to_string()
}

/// Random alphanumeric nonce from the thread-local CSPRNG
fn generate_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}

/// Percent-encode a query component, spaces as `%20`
fn encode_component(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn trim_base(url: &Url) -> &str {
    url.as_str().trim_end_matches('/')
}
