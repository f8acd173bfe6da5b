//! Core functionality for hubview
//!
//! This module contains shared business logic including:
//! - Credential storage
//! - Login session state
//! - Paged user and repository feeds
//! - Application configuration

pub mod config;
pub mod credentials;
pub mod paging;
pub mod session;

pub use config::Config;
pub use credentials::{KeyringStore, MemoryStore, SecretStore, TokenStore};
pub use paging::{load_overview, ProfileOverview, RepoFeed, RepoOwner, UserFeed};
pub use session::SessionState;
