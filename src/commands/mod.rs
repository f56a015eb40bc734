//! Command-line interface
//!
//! Each subcommand owns its argument struct and an async `run` entry point.

pub mod auth;
pub mod check_usage;
pub mod debug;
pub mod start;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "copilot-api",
    version,
    about = "Expose GitHub Copilot as an OpenAI and Anthropic compatible API"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Run the GitHub device flow and store the token")]
    Auth(auth::AuthArgs),
    #[command(about = "Start the proxy server")]
    Start(start::StartArgs),
    #[command(about = "Show Copilot usage and quotas")]
    CheckUsage(check_usage::CheckUsageArgs),
    #[command(about = "Print diagnostic information")]
    Debug(debug::DebugArgs),
}
