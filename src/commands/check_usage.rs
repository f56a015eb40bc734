//! `check-usage` command: print Copilot quota snapshots

use crate::commands::auth::CLI_TIMEOUT_SECS;
use crate::core::github::GitHubClient;
use crate::core::logging::init_logging;
use crate::core::paths::Paths;
use crate::core::provider::AccountType;
use crate::core::session::Session;
use crate::core::token::{cache_vscode_version, setup_github_token};
use crate::models::copilot::CopilotUsage;
use anyhow::{Context, Result};
use clap::Args;

#[derive(Debug, Args)]
pub struct CheckUsageArgs {
    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the GitHub token
    #[arg(long)]
    pub show_token: bool,
}

pub async fn run(args: CheckUsageArgs) -> Result<()> {
    init_logging("info", args.verbose);

    let paths = Paths::from_env()?;
    paths.ensure()?;

    let github = GitHubClient::new(CLI_TIMEOUT_SECS)?;
    let session = Session::new(AccountType::default());
    cache_vscode_version(&paths, &github, &session).await;
    setup_github_token(&paths, &github, &session, false, args.show_token).await?;

    let token = session
        .github_token()
        .await
        .context("GitHub token is not set")?;
    let usage = github
        .get_copilot_usage(&token, &session.vscode_version().await)
        .await
        .context("Failed to fetch Copilot usage")?;

    print!("{}", render_usage(&usage));
    Ok(())
}

fn render_usage(usage: &CopilotUsage) -> String {
    let rows = usage.summary_rows();
    if rows.is_empty() {
        return "No usage information available\n".to_string();
    }

    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    let mut out = String::from("Copilot Usage\n");
    for (label, value) in rows {
        out.push_str(&format!("  {:<width$}  {}\n", label, value, width = width));
    }
    out
}
