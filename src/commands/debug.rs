//! `debug` command: print environment and authentication diagnostics

use crate::commands::auth::CLI_TIMEOUT_SECS;
use crate::core::config::Config;
use crate::core::github::GitHubClient;
use crate::core::logging::init_logging;
use crate::core::paths::Paths;
use crate::core::provider::Provider;
use crate::core::providers::CopilotProvider;
use crate::core::session::Session;
use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Characters of a token shown with `--show-token`
const TOKEN_PREFIX_LEN: usize = 8;

#[derive(Debug, Args)]
pub struct DebugArgs {
    /// Include internal state
    #[arg(short, long)]
    pub verbose: bool,

    /// Show token prefixes
    #[arg(long)]
    pub show_token: bool,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct PathInfo {
    path: String,
    exists: bool,
}

impl PathInfo {
    fn new(path: &Path) -> Self {
        Self {
            path: path.display().to_string(),
            exists: path.exists(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DebugInfo {
    version: &'static str,
    os: &'static str,
    arch: &'static str,
    config_dir: PathInfo,
    github_token_file: PathInfo,
    vscode_version_file: PathInfo,
    config_file: PathInfo,
    authenticated: bool,
    vscode_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    github_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    copilot_token: Option<String>,
    models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    internal: Option<InternalState>,
}

#[derive(Debug, Serialize)]
struct InternalState {
    account_type: String,
    copilot_base_url: String,
    host: String,
    port: u16,
    log_level: String,
    request_timeout: u64,
    rate_limit_seconds: Option<u64>,
    rate_limit_wait: bool,
    manual_approve: bool,
    copilot_token_expires_at: Option<i64>,
}

/// First few characters of a secret followed by an ellipsis
fn token_prefix(token: &str) -> String {
    let prefix: String = token.chars().take(TOKEN_PREFIX_LEN).collect();
    format!("{}...", prefix)
}

pub async fn run(args: DebugArgs) -> Result<()> {
    init_logging("warn", false);

    let paths = Paths::from_env()?;
    let config = match Config::load(None, &paths) {
        Ok(config) => config,
        Err(e) => {
            debug!("Falling back to default config: {:#}", e);
            Config::default()
        }
    };

    let mut info = DebugInfo {
        version: env!("CARGO_PKG_VERSION"),
        os: std::env::consts::OS,
        arch: std::env::consts::ARCH,
        config_dir: PathInfo::new(&paths.config_dir),
        github_token_file: PathInfo::new(&paths.github_token_path),
        vscode_version_file: PathInfo::new(&paths.vscode_version_path),
        config_file: PathInfo::new(&paths.config_file_path),
        authenticated: false,
        vscode_version: paths.read_vscode_version().ok().flatten(),
        github_token: None,
        copilot_token: None,
        models: Vec::new(),
        error: None,
        internal: None,
    };

    let session = Arc::new(Session::new(config.account_type));
    if let Some(version) = &info.vscode_version {
        session.set_vscode_version(version.clone()).await;
    }

    if let Some(token) = paths.read_github_token()? {
        info.authenticated = true;
        if args.show_token {
            info.github_token = Some(token_prefix(&token));
        }
        session.set_github_token(token).await;

        if let Err(e) = load_models(&config, &session, &mut info).await {
            info.error = Some(format!("{:#}", e));
        }
        if args.show_token {
            info.copilot_token = session.copilot_token().await.map(|t| token_prefix(&t));
        }
    }

    if args.verbose {
        info.internal = Some(InternalState {
            account_type: session.account_type().to_string(),
            copilot_base_url: session.base_url(),
            host: config.host.clone(),
            port: config.port,
            log_level: config.log_level.clone(),
            request_timeout: config.request_timeout,
            rate_limit_seconds: config.rate_limit_seconds,
            rate_limit_wait: config.rate_limit_wait,
            manual_approve: config.manual_approve,
            copilot_token_expires_at: session.copilot_token_expires_at().await,
        });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print!("{}", render_text(&info));
    }
    Ok(())
}

/// Mint a Copilot token and list the model catalog
async fn load_models(config: &Config, session: &Arc<Session>, info: &mut DebugInfo) -> Result<()> {
    let github = Arc::new(GitHubClient::new(CLI_TIMEOUT_SECS)?);
    let github_token = session
        .github_token()
        .await
        .context("GitHub token is not set")?;

    let token = github
        .get_copilot_token(&github_token, &session.vscode_version().await)
        .await
        .context("Failed to get Copilot token")?;
    session.set_copilot_token(token).await;

    let provider = CopilotProvider::new(session.clone(), github, config.request_timeout)?;
    let models = provider
        .get_models()
        .await
        .context("Failed to fetch model catalog")?;
    info.models = models.data.into_iter().map(|m| m.id).collect();
    Ok(())
}

fn render_text(info: &DebugInfo) -> String {
    fn path_line(label: &str, path: &PathInfo) -> String {
        let status = if path.exists { "exists" } else { "missing" };
        format!("  {}: {} ({})\n", label, path.path, status)
    }

    let mut out = String::new();
    out.push_str(&format!("copilot-api-proxy {}\n", info.version));
    out.push_str(&format!("Platform: {}/{}\n", info.os, info.arch));
    out.push_str("Paths:\n");
    out.push_str(&path_line("Config dir", &info.config_dir));
    out.push_str(&path_line("GitHub token", &info.github_token_file));
    out.push_str(&path_line("VS Code version", &info.vscode_version_file));
    out.push_str(&path_line("Config file", &info.config_file));
    out.push_str(&format!(
        "Authenticated: {}\n",
        if info.authenticated { "yes" } else { "no" }
    ));
    out.push_str(&format!(
        "VS Code version: {}\n",
        info.vscode_version.as_deref().unwrap_or("not cached")
    ));
    if let Some(token) = &info.github_token {
        out.push_str(&format!("GitHub token: {}\n", token));
    }
    if let Some(token) = &info.copilot_token {
        out.push_str(&format!("Copilot token: {}\n", token));
    }
    if let Some(error) = &info.error {
        out.push_str(&format!("Error: {}\n", error));
    }

    if info.models.is_empty() {
        out.push_str("Models: none\n");
    } else {
        out.push_str("Models:\n");
        for model in &info.models {
            out.push_str(&format!("  - {}\n", model));
        }
    }

    if let Some(internal) = &info.internal {
        out.push_str("Internal:\n");
        out.push_str(&format!("  Account type: {}\n", internal.account_type));
        out.push_str(&format!("  Copilot API: {}\n", internal.copilot_base_url));
        out.push_str(&format!("  Listen: {}:{}\n", internal.host, internal.port));
        out.push_str(&format!("  Log level: {}\n", internal.log_level));
        out.push_str(&format!("  Request timeout: {}s\n", internal.request_timeout));
        match internal.rate_limit_seconds {
            Some(seconds) => out.push_str(&format!(
                "  Rate limit: {}s ({})\n",
                seconds,
                if internal.rate_limit_wait { "wait" } else { "reject" }
            )),
            None => out.push_str("  Rate limit: off\n"),
        }
        out.push_str(&format!("  Manual approval: {}\n", internal.manual_approve));
        if let Some(expires_at) = internal.copilot_token_expires_at {
            out.push_str(&format!("  Copilot token expires at: {}\n", expires_at));
        }
    }
    out
}
