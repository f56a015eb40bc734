//! Approximate token counting
//!
//! Roughly 4 characters per token. Good enough for logging and for the
//! `count_tokens` endpoint, which clients only use for budgeting.

use crate::models::anthropic::{
    AnthropicMessage, AnthropicTokenCountRequest, AnthropicTool, ContentBlock, MessageContent,
    SystemContent,
};
use crate::models::openai::{self, Message};

const CHARS_PER_TOKEN: usize = 4;

/// Tokens for a piece of text; any non-empty text counts for at least one
pub fn estimate_text(text: &str) -> usize {
    let chars = text.chars().count();
    if chars == 0 {
        0
    } else {
        chars.div_ceil(CHARS_PER_TOKEN)
    }
}

/// Tokens across OpenAI chat messages, counting roles and text parts
pub fn estimate_chat_messages(messages: &[Message]) -> usize {
    messages
        .iter()
        .map(|message| {
            let mut tokens = estimate_text(&message.role) + estimate_text(&message.text());
            if let Some(calls) = &message.tool_calls {
                for call in calls {
                    tokens += estimate_text(&call.function.name);
                    tokens += estimate_text(&call.function.arguments);
                }
            }
            tokens
        })
        .sum()
}

fn estimate_block(block: &ContentBlock) -> usize {
    match block {
        ContentBlock::Text { text } => estimate_text(text),
        ContentBlock::ToolUse { name, input, .. } => {
            estimate_text(name) + estimate_text(&input.to_string())
        }
        ContentBlock::ToolResult { content, .. } => content
            .as_ref()
            .map(|c| estimate_text(&c.to_text()))
            .unwrap_or(0),
        ContentBlock::Thinking { thinking, .. } => estimate_text(thinking),
        ContentBlock::Image { .. } | ContentBlock::Unsupported => 0,
    }
}

fn estimate_anthropic_message(message: &AnthropicMessage) -> usize {
    let content = match &message.content {
        MessageContent::Text(text) => estimate_text(text),
        MessageContent::Blocks(blocks) => blocks.iter().map(estimate_block).sum(),
    };
    estimate_text(&message.role) + content
}

fn estimate_tools(tools: &[AnthropicTool]) -> usize {
    tools
        .iter()
        .map(|tool| {
            estimate_text(&tool.name)
                + tool.description.as_deref().map(estimate_text).unwrap_or(0)
                + estimate_text(&tool.input_schema.to_string())
        })
        .sum()
}

/// Tokens for an Anthropic request: system prompt, messages and tools
pub fn estimate_anthropic(
    system: Option<&SystemContent>,
    messages: &[AnthropicMessage],
    tools: Option<&[AnthropicTool]>,
) -> usize {
    let system = system.map(|s| estimate_text(&s.to_text())).unwrap_or(0);
    let messages: usize = messages.iter().map(estimate_anthropic_message).sum();
    let tools = tools.map(estimate_tools).unwrap_or(0);
    (system + messages + tools).max(1)
}

pub fn estimate_token_count_request(request: &AnthropicTokenCountRequest) -> usize {
    estimate_anthropic(
        request.system.as_ref(),
        &request.messages,
        request.tools.as_deref(),
    )
}

/// Tokens for a chat completions payload, including tool definitions
pub fn estimate_payload(payload: &openai::ChatCompletionsPayload) -> usize {
    let tools = payload
        .tools
        .as_ref()
        .map(|tools| {
            tools
                .iter()
                .map(|t| {
                    estimate_text(&t.function.name)
                        + t.function.description.as_deref().map(estimate_text).unwrap_or(0)
                        + estimate_text(&t.function.parameters.to_string())
                })
                .sum()
        })
        .unwrap_or(0);
    estimate_chat_messages(&payload.messages) + tools
}
