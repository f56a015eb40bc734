//! GitHub Copilot provider implementation

use crate::core::constants::role;
use crate::core::github::{AuthError, GitHubClient};
use crate::core::headers::{CopilotRequestOptions, Initiator, copilot_headers};
use crate::core::provider::{LineStream, Provider, ProviderError};
use crate::core::session::Session;
use crate::models::copilot::{CopilotUsage, ModelsResponse};
use crate::models::openai::{
    ChatCompletionResponse, ChatCompletionsPayload, EmbeddingResponse, UpstreamEmbeddingRequest,
};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, error};

/// Bound on connection setup; streams may legitimately run much longer
const CONNECT_TIMEOUT_SECS: u64 = 30;

pub struct CopilotProvider {
    client: Client,
    session: Arc<Session>,
    github: Arc<GitHubClient>,
    /// Whole-request timeout for non-streaming calls
    timeout: Duration,
}

impl CopilotProvider {
    pub fn new(
        session: Arc<Session>,
        github: Arc<GitHubClient>,
        timeout: u64,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Unexpected(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            session,
            github,
            timeout: Duration::from_secs(timeout),
        })
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        options: CopilotRequestOptions,
    ) -> Result<RequestBuilder, ProviderError> {
        let token = self
            .session
            .copilot_token()
            .await
            .ok_or(ProviderError::MissingToken)?;
        let vscode_version = self.session.vscode_version().await;
        let headers = copilot_headers(&token, &vscode_version, options)?;

        Ok(self
            .client
            .request(method, format!("{}{}", self.session.base_url(), path))
            .headers(headers))
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        options: CopilotRequestOptions,
    ) -> Result<T, ProviderError> {
        let response = self
            .request(reqwest::Method::POST, path, options)
            .await?
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Unexpected(e.to_string()))?;

        parse_json(check_status(response, path).await?).await
    }

    async fn post_stream<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        options: CopilotRequestOptions,
    ) -> Result<LineStream, ProviderError> {
        let response = self
            .request(reqwest::Method::POST, path, options)
            .await?
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Unexpected(e.to_string()))?;

        Ok(into_line_stream(check_status(response, path).await?))
    }
}

/// Turn a non-success response into a classified error
async fn check_status(response: Response, path: &str) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    error!("Copilot request to {} failed with {}: {}", path, status, body);
    Err(ProviderError::from_status(status.as_u16(), body))
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    response
        .json()
        .await
        .map_err(|e| ProviderError::Unexpected(format!("Failed to parse response: {}", e)))
}

fn into_line_stream(response: Response) -> LineStream {
    let byte_stream = response.bytes_stream().map_err(std::io::Error::other);
    let reader = tokio::io::BufReader::new(tokio_util::io::StreamReader::new(byte_stream));
    let lines = LinesStream::new(reader.lines());

    Box::pin(lines.map(|result| result.map_err(|e| ProviderError::Unexpected(e.to_string()))))
}

fn chat_options(payload: &ChatCompletionsPayload) -> CopilotRequestOptions {
    CopilotRequestOptions {
        vision: payload.has_vision_input(),
        initiator: Some(if payload.is_agent_call() {
            Initiator::Agent
        } else {
            Initiator::User
        }),
    }
}

/// Header options for a Responses API body, read from its `input` items
pub fn response_options(body: &Value) -> CopilotRequestOptions {
    let items = body
        .get("input")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let is_agent = items.iter().any(|item| {
        let item_role = item.get("role").and_then(Value::as_str);
        let item_type = item.get("type").and_then(Value::as_str).unwrap_or_default();
        item_role == Some(role::ASSISTANT)
            || item_type == "function_call"
            || item_type == "function_call_output"
    });

    let vision = items.iter().any(|item| {
        item.get("content")
            .and_then(Value::as_array)
            .is_some_and(|parts| {
                parts
                    .iter()
                    .any(|p| p.get("type").and_then(Value::as_str) == Some("input_image"))
            })
    });

    CopilotRequestOptions {
        vision,
        initiator: Some(if is_agent {
            Initiator::Agent
        } else {
            Initiator::User
        }),
    }
}

#[async_trait]
impl Provider for CopilotProvider {
    async fn create_chat_completion(
        &self,
        request: &ChatCompletionsPayload,
    ) -> Result<ChatCompletionResponse, ProviderError> {
        debug!("Sending chat completion for model {}", request.model);
        self.post_json("/chat/completions", request, chat_options(request))
            .await
    }

    async fn create_chat_completion_stream(
        &self,
        request: &ChatCompletionsPayload,
    ) -> Result<LineStream, ProviderError> {
        debug!("Sending streaming chat completion for model {}", request.model);
        let mut request = request.clone();
        request.stream = Some(true);
        let options = chat_options(&request);
        self.post_stream("/chat/completions", &request, options)
            .await
    }

    async fn create_embeddings(
        &self,
        request: &UpstreamEmbeddingRequest,
    ) -> Result<EmbeddingResponse, ProviderError> {
        self.post_json("/embeddings", request, CopilotRequestOptions::default())
            .await
    }

    async fn get_models(&self) -> Result<ModelsResponse, ProviderError> {
        let response = self
            .request(reqwest::Method::GET, "/models", CopilotRequestOptions::default())
            .await?
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ProviderError::Unexpected(e.to_string()))?;

        parse_json(check_status(response, "/models").await?).await
    }

    async fn create_response(&self, body: &Value) -> Result<Value, ProviderError> {
        self.post_json("/responses", body, response_options(body))
            .await
    }

    async fn create_response_stream(&self, body: &Value) -> Result<LineStream, ProviderError> {
        self.post_stream("/responses", body, response_options(body))
            .await
    }

    async fn get_usage(&self) -> Result<CopilotUsage, ProviderError> {
        let github_token = self
            .session
            .github_token()
            .await
            .ok_or_else(|| ProviderError::Authentication("GitHub token not set".to_string()))?;
        let vscode_version = self.session.vscode_version().await;

        self.github
            .get_copilot_usage(&github_token, &vscode_version)
            .await
            .map_err(usage_error)
    }

    fn provider_name(&self) -> &str {
        "GitHub Copilot"
    }
}

/// GitHub failures on the usage endpoint keep their upstream status
fn usage_error(err: AuthError) -> ProviderError {
    match err {
        AuthError::Http { status, body, .. } => ProviderError::from_status(status, body),
        other => ProviderError::Unexpected(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::provider::AccountType;
    use crate::models::openai::{Message, MessageContent};
    use serde_json::json;

    #[test]
    fn test_chat_options() {
        let payload = ChatCompletionsPayload::new(
            "gpt-4o",
            vec![Message::new("user", Some(MessageContent::Text("hi".into())))],
        );
        let options = chat_options(&payload);
        assert!(!options.vision);
        assert_eq!(options.initiator, Some(Initiator::User));
    }

    #[test]
    fn test_response_options_detects_agent_and_images() {
        let body = json!({
            "model": "gpt-5",
            "input": [
                {"role": "user", "content": [
                    {"type": "input_text", "text": "look"},
                    {"type": "input_image", "image_url": "data:image/png;base64,AA"}
                ]},
                {"type": "function_call_output", "call_id": "c1", "output": "ok"}
            ]
        });
        let options = response_options(&body);
        assert!(options.vision);
        assert_eq!(options.initiator, Some(Initiator::Agent));
    }

    #[test]
    fn test_response_options_string_input() {
        let options = response_options(&json!({"model": "gpt-5", "input": "hello"}));
        assert!(!options.vision);
        assert_eq!(options.initiator, Some(Initiator::User));
    }

    #[tokio::test]
    async fn test_missing_copilot_token() {
        let session = Arc::new(Session::new(AccountType::Individual));
        let github = Arc::new(GitHubClient::new(1).unwrap());
        let provider = CopilotProvider::new(session, github, 5).unwrap();
        let payload = ChatCompletionsPayload::new("gpt-4o", vec![]);
        assert!(matches!(
            provider.create_chat_completion(&payload).await,
            Err(ProviderError::MissingToken)
        ));
    }

    #[test]
    fn test_usage_error_keeps_upstream_status() {
        let unauthorized = usage_error(AuthError::Http {
            context: "Failed to get Copilot usage",
            status: 401,
            body: "Bad credentials".into(),
        });
        assert!(matches!(unauthorized, ProviderError::Authentication(_)));
        assert_eq!(unauthorized.message(), "Bad credentials");

        let limited = usage_error(AuthError::Http {
            context: "Failed to get Copilot usage",
            status: 429,
            body: "slow down".into(),
        });
        assert_eq!(limited.status_code(), axum::http::StatusCode::TOO_MANY_REQUESTS);

        let network = usage_error(AuthError::Network("connection reset".into()));
        assert!(matches!(network, ProviderError::Unexpected(_)));
    }
}
