//! Login session state
//!
//! [`SessionState`] owns the access token and the authenticated user's
//! profile. It keeps the persisted token (via [`TokenStore`]) and the token
//! the API sends consistent, and drives the OAuth flow on behalf of the UI.
//!
//! Every login and logout bumps a generation counter. Profile fetches are
//! tagged with the generation they started under; a result arriving after the
//! session changed is dropped.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use secrecy::SecretString;

use crate::core::credentials::{SecretStore, TokenStore};
use crate::error::{HubviewError, Result};
use crate::github::api::GitHubApi;
use crate::github::oauth::{AuthorizationRequest, OAuthFlow};
use crate::github::types::UserDetail;

#[derive(Default)]
struct SessionInner {
    token: Option<SecretString>,
    current_user: Option<UserDetail>,
    generation: u64,
}

/// Authenticated session for one user
pub struct SessionState<S = Box<dyn SecretStore>> {
    api: GitHubApi,
    oauth: OAuthFlow,
    tokens: TokenStore<S>,
    inner: RwLock<SessionInner>,
}

impl<S: SecretStore> SessionState<S> {
    /// Build a session, resuming from a persisted token when there is one
    ///
    /// The profile is not fetched here; call [`SessionState::restore`].
    pub fn new(api: GitHubApi, oauth: OAuthFlow, store: S) -> Result<Self> {
        let tokens = TokenStore::new(store);
        let token = tokens.load()?;

        if let Some(token) = &token {
            tracing::debug!("resuming session from stored token");
            api.set_token(token.clone());
        }

        Ok(Self {
            api,
            oauth,
            tokens,
            inner: RwLock::new(SessionInner {
                token,
                ..SessionInner::default()
            }),
        })
    }

    /// Refresh the profile of a resumed session
    ///
    /// A stored token the API no longer accepts ends the session. Other
    /// failures leave the session logged in.
    pub async fn restore(&self) -> Result<Option<UserDetail>> {
        if !self.is_logged_in() {
            return Ok(None);
        }
        self.refresh_profile().await
    }

    /// Begin an OAuth login; the returned URL goes to the browser
    pub fn start_login(&self) -> Result<AuthorizationRequest> {
        self.oauth.start_login()
    }

    /// Finish the login with the callback URL the browser was sent to
    ///
    /// A token from an attempt that a newer `start_login` replaced is never
    /// adopted.
    pub async fn complete_login(&self, callback: &str) -> Result<Option<UserDetail>> {
        let authorized = self.oauth.handle_callback(callback).await?;
        if !self.oauth.finish(authorized.attempt) {
            tracing::warn!("dropping token from a superseded login attempt");
            return Err(HubviewError::LoginSuperseded);
        }
        self.set_token(authorized.token).await
    }

    /// The user gave up on the login
    pub fn cancel_login(&self) -> HubviewError {
        self.oauth.cancel()
    }

    /// Adopt `token` for this session
    ///
    /// The token is persisted first; if that fails the session is unchanged.
    /// The profile is refreshed afterwards.
    pub async fn set_token(&self, token: SecretString) -> Result<Option<UserDetail>> {
        {
            let mut inner = self.write();
            // Stored and in-memory tokens change under the same lock
            self.tokens.save(&token)?;
            inner.generation += 1;
            inner.token = Some(token.clone());
            inner.current_user = None;
            self.api.set_token(token);
        }
        tracing::debug!("session token updated");

        self.refresh_profile().await
    }

    /// Fetch the authenticated user's profile
    ///
    /// Returns `Ok(None)` when logged out, or when the session changed while
    /// the request was in flight. An `Unauthorized` answer for the current
    /// session logs out and also yields `Ok(None)`.
    pub async fn refresh_profile(&self) -> Result<Option<UserDetail>> {
        let generation = {
            let inner = self.read();
            if inner.token.is_none() {
                return Ok(None);
            }
            inner.generation
        };

        match self.api.current_user().await {
            Ok(user) => {
                let mut inner = self.write();
                if inner.generation != generation {
                    tracing::warn!("discarding profile fetched for an earlier session");
                    return Ok(None);
                }
                inner.current_user = Some(user.clone());
                Ok(Some(user))
            }
            Err(HubviewError::Unauthorized) => {
                if self.end_session(Some(generation))? {
                    tracing::warn!("stored token was rejected, logged out");
                }
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Drop the token, the profile and the persisted credential
    ///
    /// If the persisted credential cannot be removed the session stays logged in.
    pub fn logout(&self) -> Result<()> {
        self.end_session(None).map(|_| ())
    }

    pub fn is_logged_in(&self) -> bool {
        self.read().token.is_some()
    }

    /// Profile of the logged-in user, once fetched
    pub fn current_user(&self) -> Option<UserDetail> {
        self.read().current_user.clone()
    }

    pub fn token(&self) -> Option<SecretString> {
        self.read().token.clone()
    }

    /// Token in display form, e.g. `gho_...wxyz`
    pub fn masked_token(&self) -> Option<String> {
        self.read()
            .token
            .as_ref()
            .map(TokenStore::<S>::mask_token)
    }

    pub fn api(&self) -> &GitHubApi {
        &self.api
    }

    pub fn oauth(&self) -> &OAuthFlow {
        &self.oauth
    }

    pub fn tokens(&self) -> &TokenStore<S> {
        &self.tokens
    }

    /// Clear the session, but only if it is still `expected` (any when `None`)
    ///
    /// Returns whether the session was cleared.
    fn end_session(&self, expected: Option<u64>) -> Result<bool> {
        {
            let mut inner = self.write();
            if expected.is_some_and(|generation| generation != inner.generation) {
                return Ok(false);
            }
            self.tokens.delete()?;
            inner.generation += 1;
            inner.token = None;
            inner.current_user = None;
            // The API token changes only under this lock
            self.api.clear_token();
        }
        tracing::debug!("session ended");
        Ok(true)
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S> std::fmt::Debug for SessionState<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("SessionState")
            .field("logged_in", &inner.token.is_some())
            .field("user", &inner.current_user.as_ref().map(|u| &u.login))
            .field("generation", &inner.generation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::credentials::{MemoryStore, MockSecretStore, GITHUB_TOKEN_KEY};
    use crate::github::oauth::OAuthConfig;
    use secrecy::ExposeSecret;
    use std::sync::Arc;
    use std::time::Duration;
    use url::Url;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const REDIRECT: &str = "http://127.0.0.1:8914/callback";

    fn profile(login: &str) -> serde_json::Value {
        serde_json::json!({
            "id": 42,
            "login": login,
            "name": null, "company": null, "blog": null, "location": null,
            "email": null, "hireable": null, "bio": null, "twitter_username": null,
            "created_at": "2020-01-01T00:00:00Z",
            "updated_at": "2020-01-01T00:00:00Z"
        })
    }

    fn oauth_for(server: &MockServer) -> OAuthFlow {
        OAuthFlow::new(OAuthConfig {
            client_id: "ID".into(),
            client_secret: SecretString::from("shh"),
            redirect_uri: Url::parse(REDIRECT).unwrap(),
            scope: "user repo".into(),
            provider_url: Url::parse(&server.uri()).unwrap(),
        })
    }

    fn session_with<S: SecretStore>(server: &MockServer, store: S) -> SessionState<S> {
        let api = GitHubApi::new(&Url::parse(&server.uri()).unwrap());
        SessionState::new(api, oauth_for(server), store).unwrap()
    }

    async fn mount_profile(server: &MockServer, token: &str, login: &str) {
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("authorization", format!("token {}", token).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile(login)))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_login_end_to_end() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .and(body_string_contains("code=abc123"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "tok_1"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        mount_profile(&server, "tok_1", "octocat").await;

        let session = session_with(&server, MemoryStore::new());
        assert!(!session.is_logged_in());

        let request = session.start_login().unwrap();
        let callback = format!("{}?code=abc123&state={}", REDIRECT, request.state);
        let user = session.complete_login(&callback).await.unwrap();

        assert_eq!(user.unwrap().login, "octocat");
        assert!(session.is_logged_in());
        assert_eq!(session.current_user().unwrap().login, "octocat");
        assert_eq!(session.token().unwrap().expose_secret(), "tok_1");
        assert_eq!(
            session.tokens().load().unwrap().unwrap().expose_secret(),
            "tok_1"
        );
        assert!(session.api().rest().has_token());
    }

    #[tokio::test]
    async fn test_invalid_callback_leaves_session_untouched() {
        let server = MockServer::start().await;
        let session = session_with(&server, MemoryStore::new());

        session.start_login().unwrap();
        let result = session
            .complete_login(&format!("{}?code=abc&state=bogus", REDIRECT))
            .await;

        assert!(matches!(result, Err(HubviewError::InvalidState)));
        assert!(!session.is_logged_in());
        assert!(session.tokens().load().unwrap().is_none());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_login() {
        let server = MockServer::start().await;
        let session = session_with(&server, MemoryStore::new());

        session.start_login().unwrap();
        assert!(matches!(
            session.cancel_login(),
            HubviewError::UserCancelled
        ));
        assert!(!session.is_logged_in());
    }

    #[tokio::test]
    async fn test_resume_from_stored_token() {
        let server = MockServer::start().await;
        mount_profile(&server, "tok_saved", "mona").await;

        let store = MemoryStore::new();
        store.save(GITHUB_TOKEN_KEY, "tok_saved").unwrap();

        let session = session_with(&server, store);
        assert!(session.is_logged_in());
        assert!(session.current_user().is_none());

        let user = session.restore().await.unwrap();
        assert_eq!(user.unwrap().login, "mona");
        assert_eq!(session.current_user().unwrap().login, "mona");
    }

    #[tokio::test]
    async fn test_revoked_token_logs_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let store = MemoryStore::new();
        store.save(GITHUB_TOKEN_KEY, "tok_revoked").unwrap();

        let session = session_with(&server, store);
        let restored = session.restore().await.unwrap();

        assert!(restored.is_none());
        assert!(!session.is_logged_in());
        assert!(session.tokens().load().unwrap().is_none());
        assert!(!session.api().rest().has_token());
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let server = MockServer::start().await;
        mount_profile(&server, "tok_1", "octocat").await;

        let session = session_with(&server, MemoryStore::new());
        session.set_token(SecretString::from("tok_1")).await.unwrap();

        session.logout().unwrap();
        let first = (
            session.is_logged_in(),
            session.current_user().is_none(),
            session.tokens().load().unwrap().is_none(),
        );
        session.logout().unwrap();
        let second = (
            session.is_logged_in(),
            session.current_user().is_none(),
            session.tokens().load().unwrap().is_none(),
        );

        assert_eq!(first, (false, true, true));
        assert_eq!(first, second);
        assert!(!session.api().rest().has_token());
    }

    #[tokio::test]
    async fn test_profile_arriving_after_logout_is_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(profile("slowpoke"))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;

        let store = MemoryStore::new();
        store.save(GITHUB_TOKEN_KEY, "tok_1").unwrap();
        let session = session_with(&server, store);

        let (refreshed, logout) = tokio::join!(session.refresh_profile(), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            session.logout()
        });

        logout.unwrap();
        assert!(refreshed.unwrap().is_none());
        assert!(session.current_user().is_none());
        assert!(!session.is_logged_in());
    }

    #[tokio::test]
    async fn test_stale_unauthorized_does_not_end_new_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("authorization", "token tok_old"))
            .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(300)))
            .mount(&server)
            .await;
        mount_profile(&server, "tok_new", "octocat").await;

        let store = MemoryStore::new();
        store.save(GITHUB_TOKEN_KEY, "tok_old").unwrap();
        let session = session_with(&server, store);

        let (stale, fresh) = tokio::join!(session.refresh_profile(), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            session.set_token(SecretString::from("tok_new")).await
        });

        assert!(stale.unwrap().is_none());
        assert_eq!(fresh.unwrap().unwrap().login, "octocat");
        assert!(session.is_logged_in());
        assert_eq!(session.token().unwrap().expose_secret(), "tok_new");
        assert_eq!(session.current_user().unwrap().login, "octocat");
    }

    #[tokio::test]
    async fn test_storage_failure_keeps_session_logged_out() {
        let server = MockServer::start().await;

        let mut store = MockSecretStore::new();
        store.expect_read().returning(|_| Ok(None));
        store
            .expect_save()
            .returning(|_, _| Err(HubviewError::Credential("keychain locked".into())));

        let session = session_with(&server, store);
        let result = session.set_token(SecretString::from("tok_1")).await;

        assert!(matches!(result, Err(HubviewError::Credential(_))));
        assert!(!session.is_logged_in());
        assert!(!session.api().rest().has_token());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_superseded_exchange_is_not_adopted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .and(body_string_contains("code=first"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access_token": "tok_first"}))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .and(body_string_contains("code=second"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "tok_second"})),
            )
            .mount(&server)
            .await;
        mount_profile(&server, "tok_second", "octocat").await;

        let session = session_with(&server, MemoryStore::new());
        let first = session.start_login().unwrap();

        let first_url = format!("{}?code=first&state={}", REDIRECT, first.state);
        let (late, second) = tokio::join!(
            session.complete_login(&first_url),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                session.start_login().unwrap()
            }
        );

        assert!(matches!(late, Err(HubviewError::LoginSuperseded)));
        assert!(!session.is_logged_in());
        assert!(session.tokens().load().unwrap().is_none());

        let user = session
            .complete_login(&format!("{}?code=second&state={}", REDIRECT, second.state))
            .await
            .unwrap();
        assert_eq!(user.unwrap().login, "octocat");
        assert_eq!(session.token().unwrap().expose_secret(), "tok_second");
    }

    /// Memory store whose delete takes a while
    #[derive(Default)]
    struct SlowDeleteStore {
        values: MemoryStore,
    }

    impl SecretStore for SlowDeleteStore {
        fn save(&self, key: &str, value: &str) -> Result<()> {
            self.values.save(key, value)
        }

        fn read(&self, key: &str) -> Result<Option<String>> {
            self.values.read(key)
        }

        fn delete(&self, key: &str) -> Result<()> {
            std::thread::sleep(Duration::from_millis(300));
            self.values.delete(key)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_logout_overlapping_set_token_stays_consistent() {
        let server = MockServer::start().await;
        mount_profile(&server, "tok_new", "octocat").await;

        let store = SlowDeleteStore::default();
        store.save(GITHUB_TOKEN_KEY, "tok_old").unwrap();
        let session = Arc::new(session_with(&server, store));

        let logout = tokio::task::spawn_blocking({
            let session = Arc::clone(&session);
            move || session.logout()
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        let adopted = session.set_token(SecretString::from("tok_new")).await;
        logout.await.unwrap().unwrap();
        adopted.unwrap();

        let persisted = session.tokens().load().unwrap();
        assert_eq!(session.is_logged_in(), persisted.is_some());
        assert_eq!(session.api().rest().has_token(), persisted.is_some());
        if let Some(token) = persisted {
            assert_eq!(token.expose_secret(), "tok_new");
            assert_eq!(session.token().unwrap().expose_secret(), "tok_new");
        }
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_session() {
        let server = MockServer::start().await;

        let mut store = MockSecretStore::new();
        store
            .expect_read()
            .returning(|_| Ok(Some("tok_1".to_string())));
        store
            .expect_delete()
            .returning(|_| Err(HubviewError::Credential("keychain locked".into())));

        let session = session_with(&server, store);
        let result = session.logout();

        assert!(matches!(result, Err(HubviewError::Credential(_))));
        assert!(session.is_logged_in());
        assert!(session.api().rest().has_token());
        assert_eq!(session.tokens().load().unwrap().unwrap().expose_secret(), "tok_1");
    }

    #[tokio::test]
    async fn test_masked_token() {
        let server = MockServer::start().await;
        let store = MemoryStore::new();
        store.save(GITHUB_TOKEN_KEY, "gho_1234567890wxyz").unwrap();

        let session = session_with(&server, store);
        assert_eq!(session.masked_token().unwrap(), "gho_...wxyz");
    }
}
