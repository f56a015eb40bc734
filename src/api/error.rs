//! HTTP error responses
//!
//! OpenAI-style routes answer `{"error": {"message", "type", "code"?}}`;
//! Anthropic-style routes answer `{"type": "error", "error": {"type", "message"}}`.

use crate::core::approval::ApprovalError;
use crate::core::provider::{INVALID_STATEFUL_MARKER, ProviderError};
use crate::core::rate_limit::RateLimitError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    RateLimited(#[from] RateLimitError),

    #[error(transparent)]
    Approval(#[from] ApprovalError),

    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Provider(e) => e.status_code(),
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Approval(ApprovalError::Denied) => StatusCode::FORBIDDEN,
            ApiError::Approval(ApprovalError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Error type name shared by both response shapes
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Provider(ProviderError::Authentication(_) | ProviderError::MissingToken) => {
                "authentication_error"
            }
            ApiError::Provider(ProviderError::RateLimit(_)) | ApiError::RateLimited(_) => {
                "rate_limit_error"
            }
            ApiError::Provider(
                ProviderError::BadRequest(_) | ProviderError::InvalidStatefulMarker(_),
            )
            | ApiError::BadRequest(_) => "invalid_request_error",
            ApiError::Approval(ApprovalError::Denied) => "permission_error",
            ApiError::Provider(_) | ApiError::Approval(_) => "api_error",
        }
    }

    fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::Provider(ProviderError::InvalidStatefulMarker(_)) => {
                Some(INVALID_STATEFUL_MARKER)
            }
            ApiError::RateLimited(_) => Some("rate_limit_exceeded"),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::Provider(e) => e.message(),
            other => other.to_string(),
        }
    }

    /// OpenAI-style error body
    pub fn openai_body(&self) -> Value {
        let mut body = json!({
            "error": {
                "message": self.message(),
                "type": self.error_type()
            }
        });
        if let Some(code) = self.code() {
            body["error"]["code"] = json!(code);
        }
        body
    }

    /// Anthropic-style error body
    pub fn anthropic_body(&self) -> Value {
        json!({
            "type": "error",
            "error": {
                "type": self.error_type(),
                "message": self.message()
            }
        })
    }

    fn log(&self) {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed ({}): {}", status, self);
        } else {
            tracing::warn!("Request rejected ({}): {}", status, self);
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        (self.status_code(), Json(self.openai_body())).into_response()
    }
}

/// Wrapper that renders an [`ApiError`] in the Anthropic shape
#[derive(Debug)]
pub struct AnthropicError(pub ApiError);

impl From<ApiError> for AnthropicError {
    fn from(e: ApiError) -> Self {
        AnthropicError(e)
    }
}

impl From<ProviderError> for AnthropicError {
    fn from(e: ProviderError) -> Self {
        AnthropicError(e.into())
    }
}

impl IntoResponse for AnthropicError {
    fn into_response(self) -> Response {
        self.0.log();
        (self.0.status_code(), Json(self.0.anthropic_body())).into_response()
    }
}
