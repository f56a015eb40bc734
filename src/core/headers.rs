//! Request headers expected by the Copilot and GitHub APIs
//!
//! Copilot only serves clients that identify as the VS Code Copilot Chat
//! extension, so every request carries the editor identity headers.

use crate::core::constants::editor;
use crate::core::provider::ProviderError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Who started the turn, reported to Copilot as `X-Initiator`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initiator {
    User,
    Agent,
}

impl Initiator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Initiator::User => "user",
            Initiator::Agent => "agent",
        }
    }
}

/// Options that vary per Copilot request
#[derive(Debug, Clone, Copy, Default)]
pub struct CopilotRequestOptions {
    pub vision: bool,
    pub initiator: Option<Initiator>,
}

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) -> Result<(), ProviderError> {
    let value = HeaderValue::from_str(value)
        .map_err(|e| ProviderError::Unexpected(format!("Invalid header {}: {}", name, e)))?;
    headers.insert(HeaderName::from_static(name), value);
    Ok(())
}

fn editor_headers(headers: &mut HeaderMap, vscode_version: &str) -> Result<(), ProviderError> {
    insert(headers, "editor-version", &format!("vscode/{}", vscode_version))?;
    insert(headers, "editor-plugin-version", editor::EDITOR_PLUGIN_VERSION)?;
    insert(headers, "user-agent", editor::USER_AGENT)?;
    insert(headers, "x-github-api-version", editor::API_VERSION)?;
    insert(headers, "x-vscode-user-agent-library-version", "electron-fetch")?;
    Ok(())
}

/// Headers for requests to the Copilot API
pub fn copilot_headers(
    copilot_token: &str,
    vscode_version: &str,
    options: CopilotRequestOptions,
) -> Result<HeaderMap, ProviderError> {
    let mut headers = HeaderMap::new();
    insert(&mut headers, "authorization", &format!("Bearer {}", copilot_token))?;
    insert(&mut headers, "content-type", "application/json")?;
    insert(&mut headers, "copilot-integration-id", "vscode-chat")?;
    insert(&mut headers, "openai-intent", "conversation-panel")?;
    insert(
        &mut headers,
        "x-request-id",
        &uuid::Uuid::new_v4().to_string(),
    )?;
    editor_headers(&mut headers, vscode_version)?;

    if options.vision {
        insert(&mut headers, "copilot-vision-request", "true")?;
    }
    if let Some(initiator) = options.initiator {
        insert(&mut headers, "x-initiator", initiator.as_str())?;
    }

    Ok(headers)
}

/// Headers for authenticated requests to the GitHub API
pub fn github_headers(github_token: &str, vscode_version: &str) -> Result<HeaderMap, ProviderError> {
    let mut headers = HeaderMap::new();
    insert(&mut headers, "content-type", "application/json")?;
    insert(&mut headers, "accept", "application/json")?;
    insert(&mut headers, "authorization", &format!("token {}", github_token))?;
    editor_headers(&mut headers, vscode_version)?;
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
        headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_copilot_headers_identity() {
        let headers =
            copilot_headers("tid=abc", "1.99.0", CopilotRequestOptions::default()).unwrap();
        assert_eq!(get(&headers, "authorization"), Some("Bearer tid=abc"));
        assert_eq!(get(&headers, "editor-version"), Some("vscode/1.99.0"));
        assert_eq!(get(&headers, "copilot-integration-id"), Some("vscode-chat"));
        assert_eq!(get(&headers, "user-agent"), Some("GitHubCopilotChat/0.26.7"));
        assert_eq!(get(&headers, "x-github-api-version"), Some("2025-04-01"));
        assert!(get(&headers, "x-request-id").is_some());
        assert!(get(&headers, "copilot-vision-request").is_none());
        assert!(get(&headers, "x-initiator").is_none());
    }

    #[test]
    fn test_copilot_headers_vision_and_initiator() {
        let headers = copilot_headers(
            "tid=abc",
            "1.99.0",
            CopilotRequestOptions {
                vision: true,
                initiator: Some(Initiator::Agent),
            },
        )
        .unwrap();
        assert_eq!(get(&headers, "copilot-vision-request"), Some("true"));
        assert_eq!(get(&headers, "x-initiator"), Some("agent"));
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = copilot_headers("t", "1", CopilotRequestOptions::default()).unwrap();
        let b = copilot_headers("t", "1", CopilotRequestOptions::default()).unwrap();
        assert_ne!(get(&a, "x-request-id"), get(&b, "x-request-id"));
    }

    #[test]
    fn test_github_headers() {
        let headers = github_headers("gho_1", "1.85.0").unwrap();
        assert_eq!(get(&headers, "authorization"), Some("token gho_1"));
        assert_eq!(get(&headers, "accept"), Some("application/json"));
    }

    #[test]
    fn test_invalid_token_is_an_error() {
        assert!(copilot_headers("bad\ntoken", "1", CopilotRequestOptions::default()).is_err());
    }
}
