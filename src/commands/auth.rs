//! `auth` command: force a fresh GitHub login

use crate::core::github::GitHubClient;
use crate::core::logging::init_logging;
use crate::core::paths::Paths;
use crate::core::provider::AccountType;
use crate::core::session::Session;
use crate::core::token::setup_github_token;
use anyhow::Result;
use clap::Args;

/// Timeout for GitHub API calls made by the CLI
pub(crate) const CLI_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Args)]
pub struct AuthArgs {
    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the GitHub token once obtained
    #[arg(long)]
    pub show_token: bool,
}

pub async fn run(args: AuthArgs) -> Result<()> {
    init_logging("info", args.verbose);

    let paths = Paths::from_env()?;
    paths.ensure()?;

    let github = GitHubClient::new(CLI_TIMEOUT_SECS)?;
    let session = Session::new(AccountType::default());
    setup_github_token(&paths, &github, &session, true, args.show_token).await?;

    println!(
        "GitHub token written to {}",
        paths.github_token_path.display()
    );
    Ok(())
}
