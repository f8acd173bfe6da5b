//! Authentication CLI command handlers

use std::io::{self, BufRead, Write};

use crate::cli::commands::AuthCommand;
use crate::cli::open_browser;
use crate::core::config::Config;
use crate::core::session::SessionState;
use crate::error::{HubviewError, Result};

/// Handle authentication commands
pub async fn handle_auth(command: AuthCommand, config: &Config, session: &SessionState) -> Result<()> {
    match command {
        AuthCommand::Login { no_browser } => handle_login(config, session, no_browser).await,
        AuthCommand::Logout => handle_logout(session),
        AuthCommand::Status => handle_status(session).await,
    }
}

/// Handle the login command using the OAuth web flow
async fn handle_login(config: &Config, session: &SessionState, no_browser: bool) -> Result<()> {
    // Check if already authenticated
    if session.is_logged_in() {
        println!("✓ Already authenticated with GitHub.");
        println!();
        println!("  To re-authenticate, first run: hubview auth logout");
        return Ok(());
    }

    config.validate()?;

    println!("Starting GitHub authentication...\n");

    let request = session.start_login()?;

    // Always show the URL
    println!("Open this URL in your browser:");
    println!("  {}", request.url);
    println!();

    if !no_browser && open_browser(request.url.as_str()) {
        println!("✓ Browser opened automatically.");
        println!();
    }

    println!("After authorizing, your browser is sent to:");
    println!("  {}?code=...&state=...", config.redirect_uri);
    println!();

    let callback = match read_callback(&mut io::stdin().lock())? {
        Some(callback) => callback,
        None => return Err(session.cancel_login()),
    };

    let user = session.complete_login(&callback).await?;
    if !session.is_logged_in() {
        // GitHub issued a token it then refused for GET /user
        return Err(HubviewError::Unauthorized);
    }

    match user {
        Some(user) => println!("\n✓ Logged in as @{}", user.login),
        None => println!("\n✓ Successfully authenticated with GitHub!"),
    }
    Ok(())
}

/// Prompt for the callback URL; `None` when the user cancels
fn read_callback(input: &mut impl BufRead) -> Result<Option<String>> {
    print!("Paste the full URL from the address bar (or 'cancel'): ");
    io::stdout().flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(parse_callback_input(&line))
}

fn parse_callback_input(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("cancel") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Handle the logout command
fn handle_logout(session: &SessionState) -> Result<()> {
    if !session.is_logged_in() {
        println!("Not currently authenticated.");
        return Ok(());
    }

    session.logout()?;
    println!("Successfully logged out.");
    Ok(())
}

/// Handle the status command
async fn handle_status(session: &SessionState) -> Result<()> {
    println!("Authentication Status:");

    if !session.is_logged_in() {
        println!("  GitHub: Not authenticated");
        return Ok(());
    }

    match session.restore().await {
        Ok(Some(user)) => {
            println!("  GitHub: Authenticated as @{}", user.login);
        }
        Ok(None) if !session.is_logged_in() => {
            println!("  GitHub: Not authenticated (stored token was revoked)");
            return Ok(());
        }
        Ok(None) => println!("  GitHub: Authenticated"),
        Err(e @ HubviewError::Transport(_)) => {
            tracing::warn!("profile refresh failed: {}", e);
            println!("  GitHub: Authenticated (profile unavailable offline)");
        }
        Err(e) => return Err(e),
    }

    if let Some(masked) = session.masked_token() {
        println!("\n  GitHub token: {}", masked);
    }

    Ok(())
}
