//! hubview - browse GitHub users and repositories
//!
//! This library provides the authentication and API-access core: an OAuth
//! authorization-code login with CSRF state validation, durable token storage,
//! session state, and a typed client for the GitHub REST API.

pub mod cli;
pub mod core;
pub mod error;
pub mod github;

pub use error::{HubviewError, Result};
