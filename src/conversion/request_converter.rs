//! Anthropic to OpenAI request conversion
//!
//! This module converts Anthropic Messages API requests into Copilot chat
//! completion payloads, handling message transformation, tool conversion,
//! and parameter mapping.

use crate::core::constants::{role, tool};
use crate::models::anthropic::{
    AnthropicMessage, AnthropicMessagesRequest, ContentBlock, MessageContent, ToolChoice,
};
use crate::models::openai::{
    self, ChatCompletionsPayload, ContentPart, FunctionCall, FunctionDef, Message, StopSequences,
    Tool, ToolCall,
};
use serde_json::{Value, json};
use tracing::debug;

/// Convert an Anthropic request to a chat completions payload
///
/// `model` is the already resolved Copilot model id.
pub fn convert_anthropic_to_openai(
    request: &AnthropicMessagesRequest,
    model: String,
) -> ChatCompletionsPayload {
    let mut messages = Vec::new();

    if let Some(system) = &request.system {
        let text = system.to_text();
        if !text.trim().is_empty() {
            messages.push(Message::new(
                role::SYSTEM,
                Some(openai::MessageContent::Text(text)),
            ));
        }
    }

    for message in &request.messages {
        if message.role == role::ASSISTANT {
            messages.push(convert_assistant_message(message));
        } else {
            messages.extend(convert_user_message(message));
        }
    }

    let mut payload = ChatCompletionsPayload::new(model, messages);
    payload.max_tokens = Some(request.max_tokens);
    payload.temperature = request.temperature;
    payload.top_p = request.top_p;
    payload.stream = Some(request.stream);
    payload.stop = request
        .stop_sequences
        .clone()
        .filter(|s| !s.is_empty())
        .map(StopSequences::Many);
    payload.user = request
        .metadata
        .as_ref()
        .and_then(|m| m.get("user_id"))
        .and_then(Value::as_str)
        .map(str::to_string);

    if let Some(tools) = &request.tools {
        let tools: Vec<Tool> = tools
            .iter()
            .filter(|t| !t.name.trim().is_empty())
            .map(|t| Tool {
                tool_type: tool::FUNCTION.to_string(),
                function: FunctionDef {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.input_schema.clone(),
                },
            })
            .collect();
        if !tools.is_empty() {
            payload.tools = Some(tools);
        }
    }

    payload.tool_choice = request.tool_choice.as_ref().map(convert_tool_choice);

    debug!(
        "Converted Anthropic request to {} chat messages",
        payload.messages.len()
    );
    payload
}

fn convert_tool_choice(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::Any => json!("required"),
        ToolChoice::None => json!("none"),
        ToolChoice::Tool { name } => json!({
            "type": tool::FUNCTION,
            "function": {"name": name}
        }),
    }
}

/// Tool results become `tool` messages placed before the rest of the turn
fn convert_user_message(message: &AnthropicMessage) -> Vec<Message> {
    let blocks = match &message.content {
        MessageContent::Text(text) => {
            return vec![Message::new(
                role::USER,
                Some(openai::MessageContent::Text(text.clone())),
            )];
        }
        MessageContent::Blocks(blocks) => blocks,
    };

    let mut out = Vec::new();
    let mut parts = Vec::new();

    for block in blocks {
        match block {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                ..
            } => {
                let text = content.as_ref().map(|c| c.to_text()).unwrap_or_default();
                let mut tool_message =
                    Message::new(role::TOOL, Some(openai::MessageContent::Text(text)));
                tool_message.tool_call_id = Some(tool_use_id.clone());
                out.push(tool_message);
            }
            ContentBlock::Text { text } => parts.push(ContentPart::text(text.clone())),
            ContentBlock::Image { source } => {
                if let Some(url) = source.to_url() {
                    parts.push(ContentPart::image(url));
                }
            }
            ContentBlock::ToolUse { .. }
            | ContentBlock::Thinking { .. }
            | ContentBlock::Unsupported => {}
        }
    }

    if !parts.is_empty() {
        out.push(Message::new(role::USER, Some(user_content(parts))));
    }
    out
}

/// Plain text when there are no images, typed parts otherwise
fn user_content(parts: Vec<ContentPart>) -> openai::MessageContent {
    if parts.iter().all(|p| p.image_url.is_none()) {
        let text = parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("\n\n");
        openai::MessageContent::Text(text)
    } else {
        openai::MessageContent::Parts(parts)
    }
}

fn convert_assistant_message(message: &AnthropicMessage) -> Message {
    let blocks = match &message.content {
        MessageContent::Text(text) => {
            return Message::new(
                role::ASSISTANT,
                Some(openai::MessageContent::Text(text.clone())),
            );
        }
        MessageContent::Blocks(blocks) => blocks,
    };

    let mut text_parts = Vec::new();
    let mut tool_calls = Vec::new();

    for block in blocks {
        match block {
            ContentBlock::Text { text } => text_parts.push(text.as_str()),
            ContentBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                id: id.clone(),
                call_type: tool::FUNCTION.to_string(),
                function: FunctionCall {
                    name: name.clone(),
                    arguments: input.to_string(),
                },
            }),
            _ => {}
        }
    }

    let content = (!text_parts.is_empty())
        .then(|| openai::MessageContent::Text(text_parts.join("\n\n")));
    let mut out = Message::new(role::ASSISTANT, content);
    if !tool_calls.is_empty() {
        out.tool_calls = Some(tool_calls);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(value: Value) -> AnthropicMessagesRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_system_and_simple_message() {
        let req = request(json!({
            "model": "claude-sonnet-4-20250514",
            "max_tokens": 1024,
            "system": [{"type": "text", "text": "Be brief."}],
            "messages": [{"role": "user", "content": "Hello"}]
        }));
        let payload = convert_anthropic_to_openai(&req, "claude-sonnet-4".into());

        assert_eq!(payload.model, "claude-sonnet-4");
        assert_eq!(payload.max_tokens, Some(1024));
        assert_eq!(payload.stream, Some(false));
        assert_eq!(payload.messages.len(), 2);
        assert_eq!(payload.messages[0].role, "system");
        assert_eq!(payload.messages[0].text(), "Be brief.");
        assert_eq!(payload.messages[1].text(), "Hello");
    }

    #[test]
    fn test_tool_round_trip_ordering() {
        let req = request(json!({
            "model": "m",
            "max_tokens": 100,
            "messages": [
                {"role": "user", "content": "weather?"},
                {"role": "assistant", "content": [
                    {"type": "thinking", "thinking": "hmm", "signature": "s"},
                    {"type": "text", "text": "Checking."},
                    {"type": "tool_use", "id": "toolu_1", "name": "get_weather",
                     "input": {"city": "Paris"}}
                ]},
                {"role": "user", "content": [
                    {"type": "text", "text": "and tomorrow?"},
                    {"type": "tool_result", "tool_use_id": "toolu_1", "content": "sunny"}
                ]}
            ]
        }));
        let payload = convert_anthropic_to_openai(&req, "m".into());
        let msgs = &payload.messages;
        assert_eq!(msgs.len(), 4);

        assert_eq!(msgs[1].role, "assistant");
        assert_eq!(msgs[1].text(), "Checking.");
        let calls = msgs[1].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].id, "toolu_1");
        assert_eq!(calls[0].function.arguments, r#"{"city":"Paris"}"#);

        assert_eq!(msgs[2].role, "tool");
        assert_eq!(msgs[2].tool_call_id.as_deref(), Some("toolu_1"));
        assert_eq!(msgs[2].text(), "sunny");

        assert_eq!(msgs[3].role, "user");
        assert_eq!(msgs[3].text(), "and tomorrow?");
    }

    #[test]
    fn test_image_becomes_data_url() {
        let req = request(json!({
            "model": "m",
            "max_tokens": 10,
            "messages": [{"role": "user", "content": [
                {"type": "text", "text": "what is this"},
                {"type": "image", "source": {"type": "base64", "media_type": "image/png", "data": "AAAA"}}
            ]}]
        }));
        let payload = convert_anthropic_to_openai(&req, "m".into());
        assert!(payload.has_vision_input());
        match &payload.messages[0].content {
            Some(openai::MessageContent::Parts(parts)) => {
                assert_eq!(
                    parts[1].image_url.as_ref().unwrap().url,
                    "data:image/png;base64,AAAA"
                );
            }
            other => panic!("expected parts, got {:?}", other),
        }
    }

    #[test]
    fn test_parameters_and_tool_choice() {
        let req = request(json!({
            "model": "m",
            "max_tokens": 10,
            "stream": true,
            "temperature": 0.5,
            "stop_sequences": ["END"],
            "metadata": {"user_id": "u-1"},
            "tools": [{"name": "search", "description": "d", "input_schema": {"type": "object"}}],
            "tool_choice": {"type": "any"},
            "messages": [{"role": "user", "content": "x"}]
        }));
        let payload = convert_anthropic_to_openai(&req, "m".into());
        assert!(payload.is_stream());
        assert_eq!(payload.temperature, Some(0.5));
        assert_eq!(payload.stop, Some(StopSequences::Many(vec!["END".into()])));
        assert_eq!(payload.user.as_deref(), Some("u-1"));
        assert_eq!(payload.tools.as_ref().unwrap()[0].function.name, "search");
        assert_eq!(payload.tool_choice, Some(json!("required")));
    }

    #[test]
    fn test_tool_choice_mapping() {
        assert_eq!(convert_tool_choice(&ToolChoice::Auto), json!("auto"));
        assert_eq!(convert_tool_choice(&ToolChoice::None), json!("none"));
        assert_eq!(
            convert_tool_choice(&ToolChoice::Tool {
                name: "search".into()
            }),
            json!({"type": "function", "function": {"name": "search"}})
        );
    }
}
