//! Handler for the `me` command

use crate::cli::users::print_overview;
use crate::core::config::Config;
use crate::core::paging::{load_overview, RepoOwner};
use crate::core::session::SessionState;
use crate::error::{HubviewError, Result};

/// Show the authenticated user's profile and repositories
pub async fn handle_me(config: &Config, session: &SessionState) -> Result<()> {
    if !session.is_logged_in() {
        return Err(HubviewError::NotAuthenticated);
    }

    match load_overview(session.api(), &RepoOwner::CurrentUser, config.per_page).await {
        Ok(overview) => {
            print_overview(&overview);
            Ok(())
        }
        Err(HubviewError::Unauthorized) => {
            // Revoked or expired outside of hubview
            session.logout()?;
            Err(HubviewError::Unauthorized)
        }
        Err(e) => Err(e),
    }
}
