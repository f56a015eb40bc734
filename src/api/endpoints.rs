//! API endpoint handlers
//!
//! This module implements the HTTP surface of the proxy: OpenAI-compatible
//! chat, embeddings, models and responses routes, the Anthropic Messages
//! routes, and a few informational endpoints.

use crate::api::error::{AnthropicError, ApiError};
use crate::conversion::request_converter::convert_anthropic_to_openai;
use crate::conversion::response_converter::{
    SseLine, convert_openai_stream_to_anthropic, convert_openai_to_anthropic, parse_sse_line,
};
use crate::core::approval::await_approval;
use crate::core::config::Config;
use crate::core::model_manager::ModelManager;
use crate::core::provider::{LineStream, Provider};
use crate::core::rate_limit::RateLimiter;
use crate::core::session::Session;
use crate::core::tokenizer::{estimate_payload, estimate_token_count_request};
use crate::models::anthropic::{AnthropicMessagesRequest, AnthropicTokenCountRequest};
use crate::models::copilot::ModelsResponse;
use crate::models::openai::{ChatCompletionsPayload, EmbeddingRequest, UpstreamEmbeddingRequest};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderValue, header},
    response::{
        IntoResponse, Response, Sse,
        sse::{Event, KeepAlive},
    },
    routing::{get, post},
};
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: Arc<Session>,
    pub model_manager: Arc<ModelManager>,
    pub provider: Arc<dyn Provider>,
    pub rate_limiter: Arc<RateLimiter>,
}

/// Create the API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/chat/completions", post(chat_completions))
        .route("/v1/chat/completions", post(chat_completions))
        .route("/models", get(list_models))
        .route("/v1/models", get(list_models))
        .route("/embeddings", post(create_embeddings))
        .route("/v1/embeddings", post(create_embeddings))
        .route("/responses", post(create_response))
        .route("/v1/responses", post(create_response))
        .route("/v1/messages", post(create_message))
        .route("/v1/messages/count_tokens", post(count_tokens))
        .route("/usage", get(usage))
        .route("/token", get(token_info))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Deserialize a JSON request body; failures are reported as 400
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))
}

/// Rate limit, then ask the operator when manual approval is on
async fn gate(state: &AppState) -> Result<(), ApiError> {
    state.rate_limiter.check().await?;
    if state.config.manual_approve {
        await_approval().await?;
    }
    Ok(())
}

fn sse_response<S>(stream: S) -> Response
where
    S: Stream<Item = Result<Event, Infallible>> + Send + 'static,
{
    let mut response = Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}

/// Relay upstream SSE lines, keeping `event:` names
///
/// With `append_done` the stream always ends with `data: [DONE]`.
fn forward_sse(lines: LineStream, append_done: bool) -> Response {
    let stream = async_stream::stream! {
        let mut lines = lines;
        let mut event_name: Option<String> = None;
        let mut saw_done = false;

        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!("Upstream stream error: {}", e);
                    let body = json!({"error": {"message": e.message(), "type": "api_error"}});
                    yield Ok::<_, Infallible>(Event::default().data(body.to_string()));
                    break;
                }
            };

            let trimmed = line.trim();
            if let Some(name) = trimmed.strip_prefix("event:") {
                event_name = Some(name.trim().to_string());
                continue;
            }

            match parse_sse_line(trimmed) {
                Some(SseLine::Data(data)) => {
                    let mut event = Event::default().data(data);
                    if let Some(name) = event_name.take() {
                        event = event.event(name);
                    }
                    yield Ok(event);
                }
                Some(SseLine::Done) => {
                    saw_done = true;
                    break;
                }
                None => {}
            }
        }

        if saw_done || append_done {
            yield Ok(Event::default().data("[DONE]"));
        }
    };

    sse_response(stream)
}

/// POST /chat/completions - OpenAI chat completions pass-through
async fn chat_completions(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let mut payload: ChatCompletionsPayload = parse_body(&body)?;
    gate(&state).await?;

    info!(
        "Chat completion: model={}, stream={}, messages={}, tokens~{}",
        payload.model,
        payload.is_stream(),
        payload.messages.len(),
        estimate_payload(&payload)
    );

    if payload.max_tokens.is_none() {
        if let Some(limit) = state.model_manager.max_output_tokens(&payload.model).await {
            debug!("Set max_tokens to {}", limit);
            payload.max_tokens = Some(limit);
        }
    }

    if payload.is_stream() {
        let lines = state.provider.create_chat_completion_stream(&payload).await?;
        Ok(forward_sse(lines, true))
    } else {
        let response = state.provider.create_chat_completion(&payload).await?;
        Ok(Json(response).into_response())
    }
}

/// GET /models - Cached model catalog
async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(state.model_manager.models().await.unwrap_or_default())
}

/// Validate embedding input and normalize it to a list
pub fn normalize_embedding_request(
    request: EmbeddingRequest,
) -> Result<UpstreamEmbeddingRequest, ApiError> {
    let input = request.input.into_vec();
    if input.is_empty() {
        return Err(ApiError::BadRequest(
            "Embedding input must not be empty".to_string(),
        ));
    }
    if input.iter().any(|s| s.trim().is_empty()) {
        return Err(ApiError::BadRequest(
            "Embedding input must not contain empty strings".to_string(),
        ));
    }

    Ok(UpstreamEmbeddingRequest {
        input,
        model: request.model,
        extra: request.extra,
    })
}

/// POST /embeddings - Embeddings pass-through
async fn create_embeddings(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request = normalize_embedding_request(parse_body(&body)?)?;
    gate(&state).await?;

    debug!(
        "Embeddings: model={}, inputs={}",
        request.model,
        request.input.len()
    );
    let response = state.provider.create_embeddings(&request).await?;
    Ok(Json(response).into_response())
}

/// POST /responses - Copilot Responses API pass-through
async fn create_response(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let body: Value = parse_body(&body)?;
    if !body.is_object() {
        return Err(ApiError::BadRequest(
            "Request body must be a JSON object".to_string(),
        ));
    }
    gate(&state).await?;

    let stream = body.get("stream").and_then(Value::as_bool).unwrap_or(false);
    let model = body.get("model").and_then(Value::as_str).unwrap_or("<none>");
    info!("Responses request: model={}, stream={}", model, stream);

    if stream {
        let lines = state.provider.create_response_stream(&body).await?;
        Ok(forward_sse(lines, false))
    } else {
        let response = state.provider.create_response(&body).await?;
        Ok(Json(response).into_response())
    }
}

/// POST /v1/messages - Anthropic Messages API
async fn create_message(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, AnthropicError> {
    let request: AnthropicMessagesRequest = parse_body(&body)?;
    gate(&state).await?;

    let model = state.model_manager.resolve_model(&request.model).await;
    let payload = convert_anthropic_to_openai(&request, model);

    info!(
        "Anthropic request: model={} -> {}, stream={}, messages={}, tokens~{}",
        request.model,
        payload.model,
        request.stream,
        request.messages.len(),
        estimate_payload(&payload)
    );

    if request.stream {
        let lines = state.provider.create_chat_completion_stream(&payload).await?;
        let events = convert_openai_stream_to_anthropic(lines, request.model.clone()).map(|e| {
            Ok::<_, Infallible>(Event::default().event(e.event).data(e.data.to_string()))
        });
        Ok(sse_response(events))
    } else {
        let response = state.provider.create_chat_completion(&payload).await?;
        Ok(Json(convert_openai_to_anthropic(&response, &request.model)).into_response())
    }
}

/// POST /v1/messages/count_tokens - Estimate input tokens
async fn count_tokens(body: Bytes) -> Result<Response, AnthropicError> {
    let request: AnthropicTokenCountRequest = parse_body(&body)?;
    let input_tokens = estimate_token_count_request(&request);
    debug!("Token count for model {}: {}", request.model, input_tokens);
    Ok(Json(json!({ "input_tokens": input_tokens })).into_response())
}

/// GET /usage - Copilot usage and quotas
async fn usage(State(state): State<AppState>) -> Result<Response, ApiError> {
    let usage = state.provider.get_usage().await?;
    Ok(Json(usage).into_response())
}

/// GET /token - Token presence and expiry, never the tokens themselves
async fn token_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "has_github_token": state.session.github_token().await.is_some(),
        "has_copilot_token": state.session.copilot_token().await.is_some(),
        "expires_at": state.session.copilot_token_expires_at().await,
    }))
}

/// GET / - Root endpoint
async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Server running" }))
}

/// GET /health - Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "provider": state.provider.provider_name(),
        "copilot_token": state.session.copilot_token().await.is_some(),
    }))
}
