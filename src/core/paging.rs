//! Cursor-driven feeds over the list endpoints
//!
//! `GET /users` pages by the last seen account id (`since`); repository lists
//! page by number starting at 1. A feed stops asking once a page comes back
//! empty.

use crate::error::Result;
use crate::github::api::GitHubApi;
use crate::github::types::{Repository, User, UserDetail};

/// Growing list of all GitHub users
#[derive(Debug, Clone)]
pub struct UserFeed {
    users: Vec<User>,
    /// Id of the last user seen, the next `since`
    cursor: u64,
    per_page: u32,
    has_more: bool,
}

impl UserFeed {
    pub fn new(per_page: u32) -> Self {
        Self::starting_after(per_page, 0)
    }

    /// Start the feed after a given account id instead of from the beginning
    pub fn starting_after(per_page: u32, since: u64) -> Self {
        Self {
            users: Vec::new(),
            cursor: since,
            per_page,
            has_more: true,
        }
    }

    /// Users loaded so far
    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Fetch the next page and append it; returns how many users arrived
    ///
    /// Does nothing once the feed is exhausted.
    pub async fn load_more(&mut self, api: &GitHubApi) -> Result<usize> {
        if !self.has_more {
            return Ok(0);
        }

        let since = self.cursor;
        let page = api.users(since, self.per_page).await?;
        tracing::debug!(since, count = page.len(), "loaded user page");

        self.has_more = !page.is_empty();
        if let Some(last) = page.last() {
            self.cursor = last.id;
        }
        let count = page.len();
        self.users.extend(page);
        Ok(count)
    }

    /// Reload the first page, replacing everything loaded so far
    ///
    /// On failure the current contents are kept.
    pub async fn refresh(&mut self, api: &GitHubApi) -> Result<usize> {
        let page = api.users(0, self.per_page).await?;
        self.has_more = !page.is_empty();
        self.cursor = page.last().map(|u| u.id).unwrap_or(0);
        self.users = page;
        Ok(self.users.len())
    }

    /// Loaded users whose login contains `text`, ignoring case
    ///
    /// An empty `text` matches everyone.
    pub fn filter(&self, text: &str) -> Vec<&User> {
        let needle = text.to_lowercase();
        self.users()
            .iter()
            .filter(|user| needle.is_empty() || user.login.to_lowercase().contains(&needle))
            .collect()
    }
}

/// Whose repositories a [`RepoFeed`] lists
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoOwner {
    /// The authenticated user (`GET /user/repos`)
    CurrentUser,
    /// Any user by login (`GET /users/{login}/repos`)
    User(String),
}

/// Growing list of one owner's repositories
#[derive(Debug, Clone)]
pub struct RepoFeed {
    owner: RepoOwner,
    repositories: Vec<Repository>,
    next_page: u32,
    per_page: u32,
    has_more: bool,
}

impl RepoFeed {
    pub fn new(owner: RepoOwner, per_page: u32) -> Self {
        Self {
            owner,
            repositories: Vec::new(),
            next_page: 1,
            per_page,
            has_more: true,
        }
    }

    pub fn owner(&self) -> &RepoOwner {
        &self.owner
    }

    /// All repositories loaded so far, forks included
    pub fn repositories(&self) -> &[Repository] {
        &self.repositories
    }

    /// Loaded repositories that are not forks
    pub fn sources(&self) -> Vec<&Repository> {
        self.repositories.iter().filter(|repo| !repo.fork).collect()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Fetch the next page and append it; returns how many repositories arrived
    pub async fn load_more(&mut self, api: &GitHubApi) -> Result<usize> {
        if !self.has_more {
            return Ok(0);
        }

        let page = fetch_repositories(api, &self.owner, self.next_page, self.per_page).await?;
        tracing::debug!(page = self.next_page, count = page.len(), "loaded repository page");

        self.has_more = !page.is_empty();
        if self.has_more {
            self.next_page += 1;
        }
        let count = page.len();
        self.repositories.extend(page);
        Ok(count)
    }
}

/// A profile together with its owner's non-fork repositories
#[derive(Debug, Clone)]
pub struct ProfileOverview {
    pub user: UserDetail,
    pub sources: Vec<Repository>,
}

/// Fetch a profile and the first page of repositories in parallel
///
/// Fails if either request fails.
pub async fn load_overview(
    api: &GitHubApi,
    owner: &RepoOwner,
    per_page: u32,
) -> Result<ProfileOverview> {
    let profile = async {
        match owner {
            RepoOwner::CurrentUser => api.current_user().await,
            RepoOwner::User(login) => api.user(login).await,
        }
    };
    let repositories = fetch_repositories(api, owner, 1, per_page);

    let (user, repositories) = tokio::try_join!(profile, repositories)?;

    Ok(ProfileOverview {
        user,
        sources: repositories.into_iter().filter(|repo| !repo.fork).collect(),
    })
}

async fn fetch_repositories(
    api: &GitHubApi,
    owner: &RepoOwner,
    page: u32,
    per_page: u32,
) -> Result<Vec<Repository>> {
    match owner {
        RepoOwner::CurrentUser => api.current_user_repositories(page, per_page).await,
        RepoOwner::User(login) => api.user_repositories(login, page, per_page).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HubviewError;
    use url::Url;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_for(server: &MockServer) -> GitHubApi {
        GitHubApi::new(&Url::parse(&server.uri()).unwrap())
    }

    fn users(ids: &[u64], prefix: &str) -> serde_json::Value {
        ids.iter()
            .map(|id| serde_json::json!({ "id": id, "login": format!("{}{}", prefix, id) }))
            .collect()
    }

    fn repo(id: u64, fork: bool) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "name": format!("r{}", id),
            "full_name": format!("mona/r{}", id),
            "owner": { "id": 1, "login": "mona" },
            "private": false,
            "html_url": format!("https://github.com/mona/r{}", id),
            "description": null,
            "fork": fork,
            "created_at": null,
            "updated_at": null,
            "pushed_at": null,
            "homepage": null,
            "language": null,
            "license": null
        })
    }

    async fn mount_since(server: &MockServer, since: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/users"))
            .and(query_param("since", since))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_user_feed_follows_last_id() {
        let server = MockServer::start().await;
        mount_since(&server, "0", users(&[1, 2, 3], "u")).await;
        mount_since(&server, "3", users(&[7, 9], "u")).await;
        mount_since(&server, "9", serde_json::json!([])).await;

        let api = api_for(&server);
        let mut feed = UserFeed::new(3);

        assert_eq!(feed.load_more(&api).await.unwrap(), 3);
        assert_eq!(feed.load_more(&api).await.unwrap(), 2);
        assert!(feed.has_more());
        assert_eq!(feed.load_more(&api).await.unwrap(), 0);
        assert!(!feed.has_more());

        // Exhausted feeds stop asking
        assert_eq!(feed.load_more(&api).await.unwrap(), 0);
        assert_eq!(server.received_requests().await.unwrap().len(), 3);

        let ids: Vec<u64> = feed.users().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 7, 9]);
    }

    #[tokio::test]
    async fn test_user_feed_refresh_restarts() {
        let server = MockServer::start().await;
        mount_since(&server, "0", users(&[1, 2], "u")).await;
        mount_since(&server, "2", serde_json::json!([])).await;

        let api = api_for(&server);
        let mut feed = UserFeed::new(2);
        feed.load_more(&api).await.unwrap();
        feed.load_more(&api).await.unwrap();
        assert!(!feed.has_more());

        assert_eq!(feed.refresh(&api).await.unwrap(), 2);
        assert!(feed.has_more());
        assert_eq!(feed.users().len(), 2);
    }

    #[tokio::test]
    async fn test_user_feed_keeps_contents_on_error() {
        let server = MockServer::start().await;
        mount_since(&server, "0", users(&[1], "u")).await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .and(query_param("since", "1"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let mut feed = UserFeed::new(1);
        feed.load_more(&api).await.unwrap();

        let result = feed.load_more(&api).await;
        assert!(matches!(result, Err(HubviewError::Server { status: 500, .. })));
        assert_eq!(feed.users().len(), 1);
        assert!(feed.has_more());
    }

    #[tokio::test]
    async fn test_user_feed_starting_after() {
        let server = MockServer::start().await;
        mount_since(&server, "100", users(&[101, 102], "u")).await;

        let api = api_for(&server);
        let mut feed = UserFeed::starting_after(2, 100);
        assert!(feed.users().is_empty());

        feed.load_more(&api).await.unwrap();
        let ids: Vec<u64> = feed.users().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![101, 102]);
    }

    #[tokio::test]
    async fn test_filter_is_case_insensitive() {
        let server = MockServer::start().await;
        mount_since(
            &server,
            "0",
            serde_json::json!([
                { "id": 1, "login": "Octocat" },
                { "id": 2, "login": "mona" },
                { "id": 3, "login": "OCTO-org" }
            ]),
        )
        .await;

        let api = api_for(&server);
        let mut feed = UserFeed::new(3);
        feed.load_more(&api).await.unwrap();

        let logins: Vec<&str> = feed.filter("octo").iter().map(|u| u.login.as_str()).collect();
        assert_eq!(logins, vec!["Octocat", "OCTO-org"]);
        assert_eq!(feed.filter("").len(), 3);
        assert!(feed.filter("nobody").is_empty());
    }

    #[tokio::test]
    async fn test_repo_feed_pages_and_sources() {
        let server = MockServer::start().await;
        for (page, body) in [
            ("1", serde_json::json!([repo(1, false), repo(2, true)])),
            ("2", serde_json::json!([repo(3, false)])),
            ("3", serde_json::json!([])),
        ] {
            Mock::given(method("GET"))
                .and(path("/users/mona/repos"))
                .and(query_param("page", page))
                .and(query_param("type", "owner"))
                .respond_with(ResponseTemplate::new(200).set_body_json(body))
                .mount(&server)
                .await;
        }

        let api = api_for(&server);
        let mut feed = RepoFeed::new(RepoOwner::User("mona".into()), 2);
        while feed.has_more() {
            feed.load_more(&api).await.unwrap();
        }

        assert_eq!(feed.repositories().len(), 3);
        let sources: Vec<u64> = feed.sources().iter().map(|r| r.id).collect();
        assert_eq!(sources, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_overview_filters_forks() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 1, "login": "mona",
                "name": null, "company": null, "blog": null, "location": null,
                "email": null, "hireable": null, "bio": null, "twitter_username": null,
                "created_at": "2020-01-01T00:00:00Z",
                "updated_at": "2020-01-01T00:00:00Z"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/repos"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([repo(1, true), repo(2, false)])),
            )
            .mount(&server)
            .await;

        let api = api_for(&server);
        let overview = load_overview(&api, &RepoOwner::CurrentUser, 30).await.unwrap();

        assert_eq!(overview.user.login, "mona");
        assert_eq!(overview.sources.len(), 1);
        assert_eq!(overview.sources[0].id, 2);
    }

    #[tokio::test]
    async fn test_overview_fails_if_either_request_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/ghost"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/ghost/repos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let result = load_overview(&api, &RepoOwner::User("ghost".into()), 30).await;
        assert!(matches!(result, Err(HubviewError::Server { status: 404, .. })));
    }
}
