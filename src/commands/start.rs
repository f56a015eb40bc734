//! `start` command: authenticate, load the model catalog and serve the proxy

use crate::api::endpoints::{AppState, create_router};
use crate::core::config::Config;
use crate::core::github::GitHubClient;
use crate::core::logging::init_logging;
use crate::core::model_manager::ModelManager;
use crate::core::paths::Paths;
use crate::core::provider::{AccountType, Provider};
use crate::core::providers::CopilotProvider;
use crate::core::rate_limit::RateLimiter;
use crate::core::session::Session;
use crate::core::shell::{ShellKind, generate_env_script, parse_choice};
use crate::core::token::{cache_vscode_version, log_user, setup_copilot_token, setup_github_token};
use anyhow::{Context, Result, bail};
use clap::Args;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const USAGE_VIEWER_URL: &str = "https://ericc-ch.github.io/copilot-api";

#[derive(Debug, Args)]
pub struct StartArgs {
    /// Port to listen on [default: 4141]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind [default: 0.0.0.0]
    #[arg(long)]
    pub host: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Copilot plan: individual, business or enterprise
    #[arg(short, long)]
    pub account_type: Option<String>,

    /// Ask for approval on the terminal before forwarding each request
    #[arg(long)]
    pub manual: bool,

    /// Minimum seconds between proxied requests
    #[arg(short, long)]
    pub rate_limit: Option<u64>,

    /// Wait out the rate limit instead of answering 429
    #[arg(short, long)]
    pub wait: bool,

    /// Use this GitHub token instead of the stored one
    #[arg(short = 'g', long, env = "GH_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Print a script that launches Claude Code against this server
    #[arg(short, long)]
    pub claude_code: bool,

    /// Print GitHub and Copilot tokens when fetched or refreshed
    #[arg(long)]
    pub show_token: bool,

    /// Configuration file [default: <config dir>/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Apply command-line flags on top of the loaded configuration
fn apply_overrides(config: &mut Config, args: &StartArgs) -> Result<()> {
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(account_type) = &args.account_type {
        config.account_type = account_type.parse()?;
    }
    if let Some(seconds) = args.rate_limit {
        config.rate_limit_seconds = (seconds > 0).then_some(seconds);
    }
    config.rate_limit_wait |= args.wait;
    config.manual_approve |= args.manual;
    Ok(())
}

pub async fn run(args: StartArgs) -> Result<()> {
    let paths = Paths::from_env()?;
    paths.ensure()?;

    let mut config = Config::load(args.config.as_deref(), &paths)?;
    apply_overrides(&mut config, &args)?;
    init_logging(&config.log_level, args.verbose);

    if config.account_type != AccountType::Individual {
        info!("Using {} plan GitHub account", config.account_type);
    }
    if config.manual_approve {
        info!("Manual approval enabled");
    }

    let github = Arc::new(GitHubClient::new(config.request_timeout)?);
    let session = Arc::new(Session::new(config.account_type));

    cache_vscode_version(&paths, &github, &session).await;

    match &args.github_token {
        Some(token) => {
            info!("Using provided GitHub token");
            session.set_github_token(token.clone()).await;
            log_user(&github, &session).await;
        }
        None => setup_github_token(&paths, &github, &session, false, args.show_token).await?,
    }

    // Lives for the whole process; the server never returns normally
    let _refresh = setup_copilot_token(github.clone(), session.clone(), args.show_token).await?;

    let provider = Arc::new(CopilotProvider::new(
        session.clone(),
        github.clone(),
        config.request_timeout,
    )?);

    let model_manager = Arc::new(ModelManager::new());
    let models = provider
        .get_models()
        .await
        .context("Failed to fetch model catalog")?;
    model_manager.set_models(models).await;

    let model_ids = model_manager.model_ids().await;
    println!("Available models:");
    for id in &model_ids {
        println!("- {}", id);
    }

    let server_url = format!("http://localhost:{}", config.port);

    if args.claude_code {
        if model_ids.is_empty() {
            warn!("No models available, skipping Claude Code setup");
        } else {
            let script = claude_code_script(&server_url, &model_ids).await?;
            println!("\nRun the following to start Claude Code:\n\n{}\n", script);
        }
    }

    println!(
        "Usage viewer: {}?endpoint={}/usage",
        USAGE_VIEWER_URL, server_url
    );

    let rate_limiter = RateLimiter::new(
        config.rate_limit_seconds.map(Duration::from_secs),
        config.rate_limit_wait,
    );
    if rate_limiter.is_enabled() {
        info!(
            "Rate limit: one request every {}s ({})",
            config.rate_limit_seconds.unwrap_or_default(),
            if config.rate_limit_wait { "wait" } else { "reject" }
        );
    }

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState {
        config: Arc::new(config),
        session,
        model_manager,
        provider,
        rate_limiter: Arc::new(rate_limiter),
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Server listening on {}", server_url);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

/// Ask for a main and a small model and build the launch script
async fn claude_code_script(server_url: &str, model_ids: &[String]) -> Result<String> {
    let model = select_model("Select a model to use with Claude Code", model_ids).await?;
    let small_model = select_model("Select a small model to use with Claude Code", model_ids).await?;

    Ok(generate_env_script(
        ShellKind::current(),
        &[
            ("ANTHROPIC_BASE_URL", server_url),
            ("ANTHROPIC_AUTH_TOKEN", "dummy"),
            ("ANTHROPIC_MODEL", model.as_str()),
            ("ANTHROPIC_SMALL_FAST_MODEL", small_model.as_str()),
        ],
        "claude",
    ))
}

/// Numbered terminal menu; re-prompts until a valid choice is entered
async fn select_model(prompt: &str, model_ids: &[String]) -> Result<String> {
    let prompt = prompt.to_string();
    let ids = model_ids.to_vec();

    tokio::task::spawn_blocking(move || -> Result<String> {
        let mut stdout = io::stdout();
        let stdin = io::stdin();

        writeln!(stdout, "{}", prompt)?;
        for (i, id) in ids.iter().enumerate() {
            writeln!(stdout, "  {}) {}", i + 1, id)?;
        }

        loop {
            write!(stdout, "Choice [1-{}]: ", ids.len())?;
            stdout.flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                bail!("No model selected");
            }
            if let Some(index) = parse_choice(&line, ids.len()) {
                return Ok(ids[index].clone());
            }
            writeln!(stdout, "Invalid choice")?;
        }
    })
    .await?
}
