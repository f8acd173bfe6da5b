//! User browsing CLI command handlers

use crate::cli::commands::UsersCommand;
use crate::core::config::Config;
use crate::core::paging::{load_overview, ProfileOverview, RepoOwner, UserFeed};
use crate::core::session::SessionState;
use crate::error::Result;
use crate::github::types::User;

/// Handle user commands
pub async fn handle_users(command: UsersCommand, config: &Config, session: &SessionState) -> Result<()> {
    match command {
        UsersCommand::List {
            since,
            per_page,
            pages,
            filter,
        } => {
            let per_page = per_page.unwrap_or(config.per_page);
            handle_list(session, since, per_page, pages, filter.as_deref()).await
        }
        UsersCommand::Show { login } => handle_show(config, session, &login).await,
    }
}

async fn handle_list(
    session: &SessionState,
    since: u64,
    per_page: u32,
    pages: u32,
    filter: Option<&str>,
) -> Result<()> {
    let mut feed = UserFeed::starting_after(per_page, since);

    for _ in 0..pages {
        if feed.load_more(session.api()).await? == 0 {
            break;
        }
    }

    let shown = feed.filter(filter.unwrap_or_default());
    if shown.is_empty() {
        println!("No users found.");
    } else {
        for user in &shown {
            println!("{}", format_user_row(user));
        }
    }

    if feed.has_more() {
        if let Some(last) = feed.users().last() {
            println!();
            println!("More: hubview users list --since {}", last.id);
        }
    }

    Ok(())
}

async fn handle_show(config: &Config, session: &SessionState, login: &str) -> Result<()> {
    let overview = load_overview(
        session.api(),
        &RepoOwner::User(login.to_string()),
        config.per_page,
    )
    .await?;

    print_overview(&overview);
    Ok(())
}

fn format_user_row(user: &User) -> String {
    let mut row = format!("{:>10}  {}", user.id, user.login);
    if user.account_type == "Organization" {
        row.push_str("  (org)");
    }
    if user.site_admin {
        row.push_str("  [staff]");
    }
    row
}

/// Print a profile followed by its non-fork repositories
pub fn print_overview(overview: &ProfileOverview) {
    let user = &overview.user;

    println!("{} (@{})", user.display_name(), user.login);
    if let Some(bio) = user.bio.as_deref().filter(|b| !b.is_empty()) {
        println!("  {}", bio);
    }
    println!();
    println!(
        "  Email:     {}",
        user.email.as_deref().unwrap_or("Not provided")
    );
    println!(
        "  Location:  {}",
        user.location.as_deref().unwrap_or("Not provided")
    );
    if let Some(company) = &user.company {
        println!("  Company:   {}", company);
    }
    if let Some(blog) = user.blog.as_deref().filter(|b| !b.is_empty()) {
        println!("  Blog:      {}", blog);
    }
    println!(
        "  Followers: {}  Following: {}",
        user.followers, user.following
    );
    println!("  Joined:    {}", user.created_at.format("%Y-%m-%d"));
    println!();

    if overview.sources.is_empty() {
        println!("No repositories.");
        return;
    }

    println!("Repositories ({}):", overview.sources.len());
    for repo in &overview.sources {
        println!(
            "  {}  ★ {}  [{}]",
            repo.name,
            repo.stargazers_display(),
            repo.language_display()
        );
        println!("    {}", repo.short_description());
    }
}
