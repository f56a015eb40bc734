//! API data models
//!
//! This module contains data structures for the Anthropic, OpenAI and
//! GitHub Copilot APIs.

pub mod anthropic;
pub mod copilot;
pub mod openai;
