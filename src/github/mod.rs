//! GitHub integration module
//!
//! This module provides all GitHub-related functionality:
//! - OAuth authorization-code login
//! - Authenticated REST request pipeline
//! - Typed user and repository endpoints

pub mod api;
pub mod oauth;
pub mod rest;
pub mod types;

pub use api::GitHubApi;
pub use oauth::{AuthorizationRequest, AuthorizedToken, FlowPhase, OAuthConfig, OAuthFlow};
pub use rest::RestClient;
pub use types::{License, Repository, User, UserDetail};
