//! Provider abstraction over the Copilot backend
//!
//! This module defines the trait the HTTP layer talks to, the error type for
//! upstream failures, and the Copilot account type that selects the backend
//! host.

use crate::models::copilot::{CopilotUsage, ModelsResponse};
use crate::models::openai::{
    ChatCompletionResponse, ChatCompletionsPayload, EmbeddingResponse, UpstreamEmbeddingRequest,
};
use async_trait::async_trait;
use axum::http::StatusCode;
use futures::stream::Stream;
use serde_json::Value;
use std::fmt;
use std::pin::Pin;
use std::str::FromStr;
use thiserror::Error;

/// Stream of raw SSE lines from the upstream
pub type LineStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// Error code Copilot uses when a `previous_response_id` can no longer be used
pub const INVALID_STATEFUL_MARKER: &str = "invalid_stateful_marker";

/// Error types for provider operations
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid stateful marker: {0}")]
    InvalidStatefulMarker(String),

    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Copilot token not found")]
    MissingToken,

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ProviderError {
    /// Classify a non-success upstream response
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => ProviderError::Authentication(body),
            429 => ProviderError::RateLimit(body),
            400 if body.contains(INVALID_STATEFUL_MARKER) => {
                ProviderError::InvalidStatefulMarker(body)
            }
            400 => ProviderError::BadRequest(body),
            _ => ProviderError::ApiError {
                status,
                message: body,
            },
        }
    }

    /// HTTP status to report to our own client
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProviderError::Authentication(_) | ProviderError::MissingToken => {
                StatusCode::UNAUTHORIZED
            }
            ProviderError::RateLimit(_) => StatusCode::TOO_MANY_REQUESTS,
            ProviderError::BadRequest(_) | ProviderError::InvalidStatefulMarker(_) => {
                StatusCode::BAD_REQUEST
            }
            ProviderError::ApiError { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ProviderError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message to report: the upstream body where there is one
    pub fn message(&self) -> String {
        match self {
            ProviderError::Authentication(m)
            | ProviderError::RateLimit(m)
            | ProviderError::BadRequest(m)
            | ProviderError::InvalidStatefulMarker(m)
            | ProviderError::Unexpected(m) => m.clone(),
            ProviderError::ApiError { message, .. } => message.clone(),
            ProviderError::MissingToken => self.to_string(),
        }
    }
}

/// Trait for the upstream the proxy forwards to
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send non-streaming chat completion request
    async fn create_chat_completion(
        &self,
        request: &ChatCompletionsPayload,
    ) -> Result<ChatCompletionResponse, ProviderError>;

    /// Send streaming chat completion request
    async fn create_chat_completion_stream(
        &self,
        request: &ChatCompletionsPayload,
    ) -> Result<LineStream, ProviderError>;

    async fn create_embeddings(
        &self,
        request: &UpstreamEmbeddingRequest,
    ) -> Result<EmbeddingResponse, ProviderError>;

    async fn get_models(&self) -> Result<ModelsResponse, ProviderError>;

    /// Forward a Responses API request
    async fn create_response(&self, body: &Value) -> Result<Value, ProviderError>;

    async fn create_response_stream(&self, body: &Value) -> Result<LineStream, ProviderError>;

    /// Copilot usage and quota for the signed-in user
    async fn get_usage(&self) -> Result<CopilotUsage, ProviderError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;
}

/// Copilot account plans; each plan has its own API host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccountType {
    #[default]
    Individual,
    Business,
    Enterprise,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Individual => "individual",
            AccountType::Business => "business",
            AccountType::Enterprise => "enterprise",
        }
    }

    /// Copilot API base URL for this plan
    pub fn base_url(&self) -> String {
        match self {
            AccountType::Individual => "https://api.githubcopilot.com".to_string(),
            other => format!("https://api.{}.githubcopilot.com", other.as_str()),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown account type '{0}'. Must be one of: individual, business, enterprise")]
pub struct UnknownAccountType(pub String);

impl FromStr for AccountType {
    type Err = UnknownAccountType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "individual" => Ok(AccountType::Individual),
            "business" => Ok(AccountType::Business),
            "enterprise" => Ok(AccountType::Enterprise),
            _ => Err(UnknownAccountType(s.to_string())),
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_urls() {
        assert_eq!(
            AccountType::Individual.base_url(),
            "https://api.githubcopilot.com"
        );
        assert_eq!(
            AccountType::Business.base_url(),
            "https://api.business.githubcopilot.com"
        );
        assert_eq!(
            AccountType::Enterprise.base_url(),
            "https://api.enterprise.githubcopilot.com"
        );
    }

    #[test]
    fn test_account_type_parsing() {
        assert_eq!("Business".parse::<AccountType>().unwrap(), AccountType::Business);
        assert_eq!(
            " enterprise ".parse::<AccountType>().unwrap(),
            AccountType::Enterprise
        );
        let err = "team".parse::<AccountType>().unwrap_err();
        assert!(err.to_string().contains("'team'"));
    }

    #[test]
    fn test_classify_statuses() {
        assert!(matches!(
            ProviderError::from_status(401, "bad token".into()),
            ProviderError::Authentication(_)
        ));
        assert!(matches!(
            ProviderError::from_status(429, "slow".into()),
            ProviderError::RateLimit(_)
        ));
        assert!(matches!(
            ProviderError::from_status(400, "nope".into()),
            ProviderError::BadRequest(_)
        ));
        let err = ProviderError::from_status(503, "down".into());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.message(), "down");
    }

    #[test]
    fn test_classify_stateful_marker() {
        let body = r#"{"error":{"message":"expired","code":"invalid_stateful_marker"}}"#;
        let err = ProviderError::from_status(400, body.to_string());
        assert!(matches!(err, ProviderError::InvalidStatefulMarker(_)));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
