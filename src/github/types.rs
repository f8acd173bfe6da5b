//! GitHub API payload types
//!
//! Field names follow the REST API's snake_case JSON directly, so serde's
//! derived mapping is the codec. Timestamps decode from ISO 8601.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest description shown before truncation
const SHORT_DESCRIPTION_LEN: usize = 100;

/// A user as returned by list endpoints (`GET /users`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    /// Numeric account id, also the `since` cursor for `GET /users`
    pub id: u64,
    /// Login handle
    pub login: String,
    #[serde(default)]
    pub node_id: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub gravatar_id: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub repos_url: String,
    /// Account type ("User" or "Organization")
    #[serde(rename = "type", default)]
    pub account_type: String,
    #[serde(default)]
    pub site_admin: bool,
}

/// Full profile of a single user (`GET /users/{login}` and `GET /user`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserDetail {
    pub id: u64,
    pub login: String,
    #[serde(default)]
    pub node_id: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(rename = "type", default)]
    pub account_type: String,
    #[serde(default)]
    pub site_admin: bool,
    pub name: Option<String>,
    pub company: Option<String>,
    pub blog: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub hireable: Option<bool>,
    pub bio: Option<String>,
    pub twitter_username: Option<String>,
    #[serde(default)]
    pub public_repos: u32,
    #[serde(default)]
    pub public_gists: u32,
    #[serde(default)]
    pub followers: u32,
    #[serde(default)]
    pub following: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserDetail {
    /// Display name, falling back to the login
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.login)
    }
}

/// Repository license summary
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct License {
    pub key: String,
    pub name: String,
    pub url: Option<String>,
    pub spdx_id: Option<String>,
    #[serde(default)]
    pub node_id: String,
}

/// A repository as returned by the repository list endpoints
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    #[serde(default)]
    pub node_id: String,
    pub name: String,
    pub full_name: String,
    pub owner: User,
    pub private: bool,
    pub html_url: String,
    pub description: Option<String>,
    /// Whether this repository is a fork of another
    pub fork: bool,
    #[serde(default)]
    pub url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// `null` for repositories that never received a push
    pub pushed_at: Option<DateTime<Utc>>,
    pub homepage: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub watchers_count: u64,
    pub language: Option<String>,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    #[serde(default)]
    pub default_branch: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub visibility: String,
    pub license: Option<License>,
}

impl Repository {
    /// Primary language, or "No Language"
    pub fn language_display(&self) -> &str {
        self.language.as_deref().unwrap_or("No Language")
    }

    /// Star count with thousands separators (e.g. "12,345")
    pub fn stargazers_display(&self) -> String {
        group_thousands(self.stargazers_count)
    }

    /// Description cut to 100 characters with a trailing "..."
    pub fn short_description(&self) -> String {
        match self.description.as_deref() {
            None => "No description".to_string(),
            Some(desc) if desc.chars().count() > SHORT_DESCRIPTION_LEN => {
                let cut: String = desc.chars().take(SHORT_DESCRIPTION_LEN).collect();
                format!("{}...", cut)
            }
            Some(desc) => desc.to_string(),
        }
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
