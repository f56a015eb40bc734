//! Core application modules
//!
//! This module contains configuration, authentication, request gating and
//! the upstream provider.

pub mod approval;
pub mod config;
pub mod constants;
pub mod github;
pub mod headers;
pub mod logging;
pub mod model_manager;
pub mod paths;
pub mod provider;
pub mod providers;
pub mod rate_limit;
pub mod session;
pub mod shell;
pub mod token;
pub mod tokenizer;
