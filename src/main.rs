//! hubview - GitHub user and repository browser
//!
//! Log in through the browser with GitHub's OAuth web flow, then browse users
//! and repositories from the terminal.
//!
//! Available as the `hubview` command.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use hubview::cli::commands::{Cli, Commands};
use hubview::cli::{auth, build_session, config, me, users};
use hubview::core::config::Config;
use hubview::core::session::SessionState;
use hubview::error::Result;

#[tokio::main]
async fn main() {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Config commands don't need a session
        Commands::Config(args) => config::handle_config(args.command),
        Commands::Auth(args) => {
            let (config, session) = open_session(cli.ephemeral)?;
            auth::handle_auth(args.command, &config, &session).await
        }
        Commands::Users(args) => {
            let (config, session) = open_session(cli.ephemeral)?;
            users::handle_users(args.command, &config, &session).await
        }
        Commands::Me => {
            let (config, session) = open_session(cli.ephemeral)?;
            me::handle_me(&config, &session).await
        }
    }
}

/// Load the configuration and resume the stored session
fn open_session(ephemeral: bool) -> Result<(Config, SessionState)> {
    let config = Config::load()?;
    let session = build_session(&config, ephemeral)?;
    Ok((config, session))
}
