//! GitHub Copilot API Proxy
//!
//! This application exposes a GitHub Copilot subscription as OpenAI- and
//! Anthropic-compatible HTTP endpoints, converting between the formats where
//! needed.

mod api;
mod commands;
mod conversion;
mod core;
mod models;

use crate::commands::{Cli, Commands};
use clap::Parser;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Auth(args) => commands::auth::run(args).await,
        Commands::Start(args) => commands::start::run(args).await,
        Commands::CheckUsage(args) => commands::check_usage::run(args).await,
        Commands::Debug(args) => commands::debug::run(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
