//! GitHub and Copilot token lifecycle
//!
//! The GitHub token is long-lived and persisted; the Copilot token is minted
//! from it and refreshed in the background for as long as the process runs.

use crate::core::github::GitHubClient;
use crate::core::paths::Paths;
use crate::core::session::Session;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Refresh this many seconds before the token's suggested refresh time
const REFRESH_MARGIN_SECS: u64 = 60;

/// Floor for the refresh delay, also used as the retry delay after a failure
const MIN_REFRESH_SECS: u64 = 30;

/// Delay before the next refresh given the upstream `refresh_in`
pub fn refresh_delay(refresh_in: u64) -> Duration {
    Duration::from_secs(
        refresh_in
            .saturating_sub(REFRESH_MARGIN_SECS)
            .max(MIN_REFRESH_SECS),
    )
}

/// Make a GitHub token available in the session
///
/// Unless `force` is set a persisted token is reused. Otherwise the device
/// flow runs and the new token is written to disk.
pub async fn setup_github_token(
    paths: &Paths,
    github: &GitHubClient,
    session: &Session,
    force: bool,
    show_token: bool,
) -> Result<()> {
    if !force {
        if let Some(token) = paths.read_github_token()? {
            if show_token {
                println!("GitHub token: {}", token);
            }
            session.set_github_token(token).await;
            log_user(github, session).await;
            return Ok(());
        }
    }

    info!("Not logged in, getting new access token");
    let device = github
        .get_device_code()
        .await
        .context("Failed to get device code")?;

    println!(
        "Please enter the code \"{}\" at {}",
        device.user_code, device.verification_uri
    );

    let token = github
        .poll_access_token(&device)
        .await
        .context("Failed to get GitHub token")?;

    paths.write_github_token(&token)?;
    if show_token {
        println!("GitHub token: {}", token);
    }
    session.set_github_token(token).await;
    log_user(github, session).await;
    Ok(())
}

/// Log the authenticated login; failure is only a warning
pub async fn log_user(github: &GitHubClient, session: &Session) {
    let Some(token) = session.github_token().await else {
        return;
    };
    match github.get_user(&token).await {
        Ok(user) => info!("Logged in as {}", user.login),
        Err(e) => warn!("Could not fetch user info: {}", e),
    }
}

/// Mint the first Copilot token and spawn the refresh task
pub async fn setup_copilot_token(
    github: Arc<GitHubClient>,
    session: Arc<Session>,
    show_token: bool,
) -> Result<JoinHandle<()>> {
    let github_token = session
        .github_token()
        .await
        .context("GitHub token is not set")?;
    let vscode_version = session.vscode_version().await;

    let token = github
        .get_copilot_token(&github_token, &vscode_version)
        .await
        .context("Failed to get Copilot token")?;

    info!("GitHub Copilot token fetched successfully");
    if show_token {
        println!("Copilot token: {}", token.token);
    }

    let delay = refresh_delay(token.refresh_in);
    session.set_copilot_token(token).await;

    Ok(tokio::spawn(refresh_loop(
        github,
        session,
        github_token,
        delay,
        show_token,
    )))
}

async fn refresh_loop(
    github: Arc<GitHubClient>,
    session: Arc<Session>,
    github_token: String,
    mut delay: Duration,
    show_token: bool,
) {
    loop {
        tokio::time::sleep(delay).await;
        info!("Refreshing Copilot token");

        let vscode_version = session.vscode_version().await;
        match github
            .get_copilot_token(&github_token, &vscode_version)
            .await
        {
            Ok(token) => {
                info!("Copilot token refreshed");
                if show_token {
                    println!("Refreshed Copilot token: {}", token.token);
                }
                delay = refresh_delay(token.refresh_in);
                session.set_copilot_token(token).await;
            }
            Err(e) => {
                // Keep serving with the previous token until a refresh succeeds
                error!("Failed to refresh Copilot token: {}", e);
                delay = Duration::from_secs(MIN_REFRESH_SECS);
            }
        }
    }
}

/// Load the VS Code version from cache, fetching and caching it if absent
pub async fn cache_vscode_version(paths: &Paths, github: &GitHubClient, session: &Session) {
    let version = match paths.read_vscode_version() {
        Ok(Some(version)) => version,
        Ok(None) => {
            let version = github.get_vscode_version().await;
            if let Err(e) = paths.write_vscode_version(&version) {
                warn!("Failed to cache VS Code version: {}", e);
            }
            version
        }
        Err(e) => {
            warn!("Failed to read cached VS Code version: {}", e);
            github.get_vscode_version().await
        }
    };

    info!("Using VS Code version {}", version);
    session.set_vscode_version(version).await;
}
