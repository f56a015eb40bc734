//! OpenAI to Anthropic response conversion
//!
//! This module converts Copilot chat completion responses back to the
//! Anthropic Messages format, supporting both streaming and non-streaming
//! responses.

use crate::core::constants::{content, delta as delta_const, event, role, stop};
use crate::core::provider::LineStream;
use crate::models::openai::{ChatCompletionChunk, ChatCompletionResponse, Usage};
use futures::{Stream, StreamExt};
use serde_json::{Value, json};
use std::collections::HashMap;
use tracing::{error, warn};

/// One Anthropic server-sent event: its name and JSON payload
#[derive(Debug, Clone, PartialEq)]
pub struct AnthropicEvent {
    pub event: &'static str,
    pub data: Value,
}

impl AnthropicEvent {
    fn new(event: &'static str, data: Value) -> Self {
        Self { event, data }
    }
}

/// Map an OpenAI finish reason onto an Anthropic stop reason
pub fn map_finish_reason(reason: &str) -> &'static str {
    match reason {
        "length" => stop::MAX_TOKENS,
        "tool_calls" | "function_call" => stop::TOOL_USE,
        _ => stop::END_TURN,
    }
}

/// Anthropic usage object; cached prompt tokens are reported separately
pub fn anthropic_usage(usage: &Usage) -> Value {
    let cached = usage.cached_tokens();
    let mut out = json!({
        "input_tokens": usage.prompt_tokens.saturating_sub(cached),
        "output_tokens": usage.completion_tokens,
    });
    if cached > 0 {
        out["cache_read_input_tokens"] = json!(cached);
    }
    out
}

fn new_message_id() -> String {
    format!("msg_{}", &uuid::Uuid::new_v4().simple().to_string()[..24])
}

/// Convert a non-streaming response to an Anthropic message
///
/// Text and tool calls from every choice are merged into one content list.
pub fn convert_openai_to_anthropic(response: &ChatCompletionResponse, model: &str) -> Value {
    let mut content_blocks = Vec::new();
    let mut stop_reason = None;

    for choice in &response.choices {
        if let Some(text) = choice.message.content.as_deref() {
            if !text.is_empty() {
                content_blocks.push(json!({"type": content::TEXT, "text": text}));
            }
        }

        for call in choice.message.tool_calls.iter().flatten() {
            let input: Value =
                serde_json::from_str(&call.function.arguments).unwrap_or_else(|_| json!({}));
            content_blocks.push(json!({
                "type": content::TOOL_USE,
                "id": call.id,
                "name": call.function.name,
                "input": input
            }));
        }

        if let Some(reason) = choice.finish_reason.as_deref() {
            let mapped = map_finish_reason(reason);
            // A tool call anywhere means the client has to act
            if stop_reason.is_none() || mapped == stop::TOOL_USE {
                stop_reason = Some(mapped);
            }
        }
    }

    let id = if response.id.is_empty() {
        new_message_id()
    } else {
        response.id.clone()
    };

    json!({
        "id": id,
        "type": "message",
        "role": role::ASSISTANT,
        "content": content_blocks,
        "model": model,
        "stop_reason": stop_reason.unwrap_or(stop::END_TURN),
        "stop_sequence": null,
        "usage": response
            .usage
            .as_ref()
            .map(anthropic_usage)
            .unwrap_or_else(|| json!({"input_tokens": 0, "output_tokens": 0}))
    })
}

/// A classified upstream SSE line
#[derive(Debug, PartialEq, Eq)]
pub enum SseLine<'a> {
    Data(&'a str),
    Done,
}

/// Extract the payload of a `data:` line; other lines yield `None`
pub fn parse_sse_line(line: &str) -> Option<SseLine<'_>> {
    let data = line.trim().strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        Some(SseLine::Done)
    } else if data.is_empty() {
        None
    } else {
        Some(SseLine::Data(data))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Text,
    Tool,
}

#[derive(Debug, Clone, Copy)]
struct OpenBlock {
    index: u32,
    kind: BlockKind,
    /// Upstream tool call index for tool blocks
    tool_index: Option<u32>,
}

/// Incremental OpenAI chunk to Anthropic event translator
///
/// Blocks get sequential indices and only one block is open at a time.
pub struct AnthropicStreamTranslator {
    model: String,
    message_started: bool,
    finished: bool,
    next_index: u32,
    open: Option<OpenBlock>,
    /// Upstream tool call index to Anthropic block index
    tool_blocks: HashMap<u32, u32>,
    /// Text that arrived while a tool block was open
    deferred_text: String,
    stop_reason: Option<&'static str>,
    usage: Option<Usage>,
}

impl AnthropicStreamTranslator {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            message_started: false,
            finished: false,
            next_index: 0,
            open: None,
            tool_blocks: HashMap::new(),
            deferred_text: String::new(),
            stop_reason: None,
            usage: None,
        }
    }

    fn start_message(&mut self, id: &str, events: &mut Vec<AnthropicEvent>) {
        if self.message_started {
            return;
        }
        self.message_started = true;

        let id = if id.is_empty() {
            new_message_id()
        } else {
            id.to_string()
        };
        let usage = self
            .usage
            .as_ref()
            .map(|u| {
                let mut usage = anthropic_usage(u);
                usage["output_tokens"] = json!(0);
                usage
            })
            .unwrap_or_else(|| json!({"input_tokens": 0, "output_tokens": 0}));

        events.push(AnthropicEvent::new(
            event::MESSAGE_START,
            json!({
                "type": event::MESSAGE_START,
                "message": {
                    "id": id,
                    "type": "message",
                    "role": role::ASSISTANT,
                    "content": [],
                    "model": self.model,
                    "stop_reason": null,
                    "stop_sequence": null,
                    "usage": usage
                }
            }),
        ));
        events.push(AnthropicEvent::new(event::PING, json!({"type": event::PING})));
    }

    fn close_block(&mut self, events: &mut Vec<AnthropicEvent>) {
        if let Some(block) = self.open.take() {
            events.push(AnthropicEvent::new(
                event::CONTENT_BLOCK_STOP,
                json!({"type": event::CONTENT_BLOCK_STOP, "index": block.index}),
            ));
        }
    }

    fn open_block(
        &mut self,
        kind: BlockKind,
        tool_index: Option<u32>,
        content_block: Value,
        events: &mut Vec<AnthropicEvent>,
    ) -> u32 {
        self.close_block(events);
        let index = self.next_index;
        self.next_index += 1;
        self.open = Some(OpenBlock {
            index,
            kind,
            tool_index,
        });
        events.push(AnthropicEvent::new(
            event::CONTENT_BLOCK_START,
            json!({
                "type": event::CONTENT_BLOCK_START,
                "index": index,
                "content_block": content_block
            }),
        ));
        index
    }

    /// Emit deferred text in its own block once the tool block is done
    fn flush_deferred_text(&mut self, events: &mut Vec<AnthropicEvent>) {
        if self.deferred_text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.deferred_text);
        self.close_block(events);
        self.push_text(&text, events);
    }

    fn close_all(&mut self, events: &mut Vec<AnthropicEvent>) {
        self.close_block(events);
        self.flush_deferred_text(events);
        self.close_block(events);
    }

    fn push_text(&mut self, text: &str, events: &mut Vec<AnthropicEvent>) {
        let index = match self.open {
            Some(block) if block.kind == BlockKind::Text => block.index,
            // Keep the tool block open so its remaining arguments still land
            Some(_) => {
                self.deferred_text.push_str(text);
                return;
            }
            None => self.open_block(
                BlockKind::Text,
                None,
                json!({"type": content::TEXT, "text": ""}),
                events,
            ),
        };
        events.push(AnthropicEvent::new(
            event::CONTENT_BLOCK_DELTA,
            json!({
                "type": event::CONTENT_BLOCK_DELTA,
                "index": index,
                "delta": {"type": delta_const::TEXT, "text": text}
            }),
        ));
    }

    fn push_tool_arguments(
        &mut self,
        tool_index: u32,
        arguments: &str,
        events: &mut Vec<AnthropicEvent>,
    ) {
        let Some(&index) = self.tool_blocks.get(&tool_index) else {
            return;
        };
        match self.open {
            Some(block) if block.tool_index == Some(tool_index) => {
                events.push(AnthropicEvent::new(
                    event::CONTENT_BLOCK_DELTA,
                    json!({
                        "type": event::CONTENT_BLOCK_DELTA,
                        "index": index,
                        "delta": {"type": delta_const::INPUT_JSON, "partial_json": arguments}
                    }),
                ));
            }
            _ => warn!(
                "Dropping arguments for tool call {} after its block closed",
                tool_index
            ),
        }
    }

    /// Translate one upstream chunk
    pub fn process_chunk(&mut self, chunk: &ChatCompletionChunk) -> Vec<AnthropicEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }

        if let Some(usage) = &chunk.usage {
            self.usage = Some(usage.clone());
        }
        self.start_message(&chunk.id, &mut events);

        for choice in &chunk.choices {
            let delta = &choice.delta;

            if let Some(text) = delta.content.as_deref() {
                if !text.is_empty() {
                    self.push_text(text, &mut events);
                }
            }

            for call in delta.tool_calls.iter().flatten() {
                let function = call.function.as_ref();
                let is_new = !self.tool_blocks.contains_key(&call.index);

                if is_new {
                    if let (Some(id), Some(name)) =
                        (call.id.as_deref(), function.and_then(|f| f.name.as_deref()))
                    {
                        self.flush_deferred_text(&mut events);
                        let index = self.open_block(
                            BlockKind::Tool,
                            Some(call.index),
                            json!({
                                "type": content::TOOL_USE,
                                "id": id,
                                "name": name,
                                "input": {}
                            }),
                            &mut events,
                        );
                        self.tool_blocks.insert(call.index, index);
                    }
                }

                if let Some(arguments) = function.and_then(|f| f.arguments.as_deref()) {
                    if !arguments.is_empty() {
                        self.push_tool_arguments(call.index, arguments, &mut events);
                    }
                }
            }

            if let Some(reason) = choice.finish_reason.as_deref() {
                self.stop_reason = Some(map_finish_reason(reason));
                self.close_all(&mut events);
            }
        }

        events
    }

    /// Close any open block and end the message; later calls yield nothing
    pub fn finish(&mut self) -> Vec<AnthropicEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }

        self.start_message("", &mut events);
        self.close_all(&mut events);
        self.finished = true;

        let usage = self
            .usage
            .as_ref()
            .map(|u| json!({"output_tokens": u.completion_tokens}))
            .unwrap_or_else(|| json!({"output_tokens": 0}));

        events.push(AnthropicEvent::new(
            event::MESSAGE_DELTA,
            json!({
                "type": event::MESSAGE_DELTA,
                "delta": {
                    "stop_reason": self.stop_reason.unwrap_or(stop::END_TURN),
                    "stop_sequence": null
                },
                "usage": usage
            }),
        ));
        events.push(AnthropicEvent::new(
            event::MESSAGE_STOP,
            json!({"type": event::MESSAGE_STOP}),
        ));
        events
    }

    #[cfg(test)]
    fn open_tool_index(&self) -> Option<u32> {
        self.open.and_then(|b| b.tool_index)
    }
}

/// Error event sent when the upstream stream fails midway
pub fn stream_error_event(message: &str) -> AnthropicEvent {
    AnthropicEvent::new(
        event::ERROR,
        json!({
            "type": event::ERROR,
            "error": {"type": "api_error", "message": message}
        }),
    )
}

/// Convert an upstream chat completion line stream to Anthropic events
pub fn convert_openai_stream_to_anthropic(
    lines: LineStream,
    model: String,
) -> impl Stream<Item = AnthropicEvent> + Send {
    async_stream::stream! {
        let mut translator = AnthropicStreamTranslator::new(model);
        let mut lines = lines;

        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!("Stream error: {}", e);
                    yield stream_error_event(&format!("Stream error: {}", e.message()));
                    return;
                }
            };

            let data = match parse_sse_line(&line) {
                Some(SseLine::Data(data)) => data,
                Some(SseLine::Done) => break,
                None => continue,
            };

            let chunk: ChatCompletionChunk = match serde_json::from_str(data) {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!("Failed to parse chunk: {}, error: {}", data, e);
                    continue;
                }
            };

            for event in translator.process_chunk(&chunk) {
                yield event;
            }
        }

        for event in translator.finish() {
            yield event;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::provider::ProviderError;
    use futures::stream;

    fn chunk(value: Value) -> ChatCompletionChunk {
        serde_json::from_value(value).unwrap()
    }

    fn names(events: &[AnthropicEvent]) -> Vec<&'static str> {
        events.iter().map(|e| e.event).collect()
    }

    #[test]
    fn test_non_streaming_text_and_tools() {
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "Let me check."},
                 "finish_reason": "stop"},
                {"index": 1, "message": {"role": "assistant", "content": null, "tool_calls": [
                    {"id": "call_1", "type": "function",
                     "function": {"name": "lookup", "arguments": "{\"q\":\"x\"}"}}
                ]}, "finish_reason": "tool_calls"}
            ],
            "usage": {"prompt_tokens": 100, "completion_tokens": 20, "total_tokens": 120,
                      "prompt_tokens_details": {"cached_tokens": 30}}
        }))
        .unwrap();

        let out = convert_openai_to_anthropic(&response, "claude-sonnet-4");
        assert_eq!(out["model"], "claude-sonnet-4");
        assert_eq!(out["content"][0], json!({"type": "text", "text": "Let me check."}));
        assert_eq!(out["content"][1]["type"], "tool_use");
        assert_eq!(out["content"][1]["input"], json!({"q": "x"}));
        assert_eq!(out["stop_reason"], "tool_use");
        assert_eq!(out["usage"]["input_tokens"], 70);
        assert_eq!(out["usage"]["output_tokens"], 20);
        assert_eq!(out["usage"]["cache_read_input_tokens"], 30);
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(map_finish_reason("stop"), "end_turn");
        assert_eq!(map_finish_reason("length"), "max_tokens");
        assert_eq!(map_finish_reason("tool_calls"), "tool_use");
        assert_eq!(map_finish_reason("content_filter"), "end_turn");
    }

    #[test]
    fn test_usage_without_cache() {
        let usage = Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
            prompt_tokens_details: None,
        };
        let out = anthropic_usage(&usage);
        assert_eq!(out, json!({"input_tokens": 10, "output_tokens": 5}));
    }

    #[test]
    fn test_parse_sse_line() {
        assert_eq!(parse_sse_line("data: {\"a\":1}"), Some(SseLine::Data("{\"a\":1}")));
        assert_eq!(parse_sse_line("data: [DONE]"), Some(SseLine::Done));
        assert_eq!(parse_sse_line("event: ping"), None);
        assert_eq!(parse_sse_line(""), None);
    }

    #[test]
    fn test_text_then_tool_sequence() {
        let mut t = AnthropicStreamTranslator::new("claude-sonnet-4");
        let mut events = Vec::new();
        events.extend(t.process_chunk(&chunk(json!({
            "id": "c1", "choices": [{"index": 0, "delta": {"role": "assistant", "content": "Hi"}}]
        }))));
        events.extend(t.process_chunk(&chunk(json!({
            "id": "c1", "choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 0, "id": "call_1", "function": {"name": "run", "arguments": ""}}
            ]}}]
        }))));
        assert_eq!(t.open_tool_index(), Some(0));
        events.extend(t.process_chunk(&chunk(json!({
            "id": "c1", "choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 0, "function": {"arguments": "{\"cmd\":"}}
            ]}}]
        }))));
        events.extend(t.process_chunk(&chunk(json!({
            "id": "c1", "choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 0, "function": {"arguments": "\"ls\"}"}}
            ]}, "finish_reason": "tool_calls"}]
        }))));
        events.extend(t.finish());

        assert_eq!(
            names(&events),
            vec![
                "message_start",
                "ping",
                "content_block_start",
                "content_block_delta",
                "content_block_stop",
                "content_block_start",
                "content_block_delta",
                "content_block_delta",
                "content_block_stop",
                "message_delta",
                "message_stop",
            ]
        );
        assert_eq!(events[2].data["index"], 0);
        assert_eq!(events[5].data["index"], 1);
        assert_eq!(events[5].data["content_block"]["name"], "run");
        assert_eq!(events[6].data["delta"]["type"], "input_json_delta");
        assert_eq!(events[9].data["delta"]["stop_reason"], "tool_use");
        assert!(t.finish().is_empty());
    }

    #[test]
    fn test_text_during_tool_call_keeps_arguments() {
        let mut t = AnthropicStreamTranslator::new("m");
        let mut events = Vec::new();
        events.extend(t.process_chunk(&chunk(json!({
            "id": "c1", "choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 0, "id": "call_1", "function": {"name": "run", "arguments": "{\"cmd\":"}}
            ]}}]
        }))));
        events.extend(t.process_chunk(&chunk(json!({
            "id": "c1", "choices": [{"index": 0, "delta": {"content": "one moment"}}]
        }))));
        events.extend(t.process_chunk(&chunk(json!({
            "id": "c1", "choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 0, "function": {"arguments": "\"ls\"}"}}
            ]}, "finish_reason": "tool_calls"}]
        }))));
        events.extend(t.finish());

        assert_eq!(
            names(&events),
            vec![
                "message_start",
                "ping",
                "content_block_start",
                "content_block_delta",
                "content_block_delta",
                "content_block_stop",
                "content_block_start",
                "content_block_delta",
                "content_block_stop",
                "message_delta",
                "message_stop",
            ]
        );
        assert_eq!(events[3].data["delta"]["partial_json"], "{\"cmd\":");
        assert_eq!(events[4].data["index"], 0);
        assert_eq!(events[4].data["delta"]["partial_json"], "\"ls\"}");
        assert_eq!(events[6].data["index"], 1);
        assert_eq!(events[7].data["delta"]["text"], "one moment");
        assert_eq!(events[9].data["delta"]["stop_reason"], "tool_use");
    }

    #[test]
    fn test_deferred_text_flushed_before_next_tool() {
        let mut t = AnthropicStreamTranslator::new("m");
        let mut events = Vec::new();
        events.extend(t.process_chunk(&chunk(json!({
            "id": "c1", "choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 0, "id": "call_1", "function": {"name": "a", "arguments": "{}"}}
            ]}}]
        }))));
        events.extend(t.process_chunk(&chunk(json!({
            "id": "c1", "choices": [{"index": 0, "delta": {"content": "and"}}]
        }))));
        events.extend(t.process_chunk(&chunk(json!({
            "id": "c1", "choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 1, "id": "call_2", "function": {"name": "b", "arguments": "{}"}}
            ]}}]
        }))));

        let starts: Vec<&Value> = events
            .iter()
            .filter(|e| e.event == "content_block_start")
            .map(|e| &e.data["content_block"])
            .collect();
        assert_eq!(starts.len(), 3);
        assert_eq!(starts[0]["name"], "a");
        assert_eq!(starts[1]["type"], "text");
        assert_eq!(starts[2]["name"], "b");
    }

    #[test]
    fn test_missing_finish_reason_still_closes() {
        let mut t = AnthropicStreamTranslator::new("m");
        let mut events = t.process_chunk(&chunk(json!({
            "id": "c1", "choices": [{"index": 0, "delta": {"content": "partial"}}]
        })));
        events.extend(t.finish());
        let tail = names(&events[events.len() - 3..]);
        assert_eq!(tail, vec!["content_block_stop", "message_delta", "message_stop"]);
        assert_eq!(events[events.len() - 2].data["delta"]["stop_reason"], "end_turn");
    }

    #[test]
    fn test_usage_after_finish_reason_is_reported() {
        let mut t = AnthropicStreamTranslator::new("m");
        t.process_chunk(&chunk(json!({
            "id": "c1", "choices": [{"index": 0, "delta": {"content": "x"}, "finish_reason": "length"}]
        })));
        t.process_chunk(&chunk(json!({
            "id": "c1", "choices": [],
            "usage": {"prompt_tokens": 9, "completion_tokens": 4, "total_tokens": 13}
        })));
        let events = t.finish();
        let delta = events.iter().find(|e| e.event == "message_delta").unwrap();
        assert_eq!(delta.data["delta"]["stop_reason"], "max_tokens");
        assert_eq!(delta.data["usage"]["output_tokens"], 4);
    }

    #[tokio::test]
    async fn test_stream_conversion_end_to_end() {
        let lines: Vec<Result<String, ProviderError>> = vec![
            Ok("data: {\"id\":\"c\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hel\"}}]}".into()),
            Ok(String::new()),
            Ok("data: {\"id\":\"c\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"},\"finish_reason\":\"stop\"}]}".into()),
            Ok("data: [DONE]".into()),
        ];
        let events: Vec<AnthropicEvent> =
            convert_openai_stream_to_anthropic(Box::pin(stream::iter(lines)), "m".into())
                .collect()
                .await;

        let texts: Vec<&str> = events
            .iter()
            .filter(|e| e.event == "content_block_delta")
            .filter_map(|e| e.data["delta"]["text"].as_str())
            .collect();
        assert_eq!(texts, vec!["Hel", "lo"]);
        assert_eq!(events.last().unwrap().event, "message_stop");
    }

    #[tokio::test]
    async fn test_stream_error_emits_error_event() {
        let lines: Vec<Result<String, ProviderError>> =
            vec![Err(ProviderError::Unexpected("connection reset".into()))];
        let events: Vec<AnthropicEvent> =
            convert_openai_stream_to_anthropic(Box::pin(stream::iter(lines)), "m".into())
                .collect()
                .await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "error");
    }
}
