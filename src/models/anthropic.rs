//! Anthropic API data models
//!
//! This module defines the request structures for the Anthropic Messages API.
//! Responses are built as JSON in the converters.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Image source of an image block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl ImageSource {
    /// URL usable as an OpenAI `image_url`, if the source is understood
    pub fn to_url(&self) -> Option<String> {
        match self.source_type.as_str() {
            "base64" => {
                let media_type = self.media_type.as_deref()?;
                let data = self.data.as_deref()?;
                Some(format!("data:{};base64,{}", media_type, data))
            }
            "url" => self.url.clone(),
            _ => None,
        }
    }
}

/// Tool result content can be a string or a list of blocks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ToolResultContent {
    Text(String),
    Blocks(Vec<Value>),
}

impl ToolResultContent {
    /// Flatten the result into plain text
    ///
    /// Text blocks contribute their text, anything else its JSON form.
    pub fn to_text(&self) -> String {
        match self {
            ToolResultContent::Text(s) => s.clone(),
            ToolResultContent::Blocks(blocks) => blocks
                .iter()
                .map(|block| match block.get("text").and_then(Value::as_str) {
                    Some(text) => text.to_string(),
                    None => block.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Content block of a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        source: ImageSource,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: Option<ToolResultContent>,
        #[serde(default)]
        is_error: Option<bool>,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
        #[serde(default)]
        signature: Option<String>,
    },
    #[serde(other)]
    Unsupported,
}

/// Message content can be a string or array of content blocks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// Message with role and content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: MessageContent,
}

/// System text block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemBlock {
    #[serde(rename = "type", default = "default_text_type")]
    pub block_type: String,
    pub text: String,
}

fn default_text_type() -> String {
    "text".to_string()
}

/// System content can be a string or array of text blocks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SystemContent {
    Text(String),
    Blocks(Vec<SystemBlock>),
}

impl SystemContent {
    pub fn to_text(&self) -> String {
        match self {
            SystemContent::Text(s) => s.clone(),
            SystemContent::Blocks(blocks) => blocks
                .iter()
                .map(|b| b.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

/// Tool definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnthropicTool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: Value,
}

/// Tool choice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolChoice {
    Auto,
    Any,
    Tool { name: String },
    None,
}

/// Messages API request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicMessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<AnthropicMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<AnthropicTool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<Value>,
}

/// Token count request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicTokenCountRequest {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub messages: Vec<AnthropicMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<AnthropicTool>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_mixed_blocks() {
        let msg: AnthropicMessage = serde_json::from_value(json!({
            "role": "user",
            "content": [
                {"type": "text", "text": "hello"},
                {"type": "tool_result", "tool_use_id": "toolu_1", "content": "42"},
                {"type": "document", "source": {}}
            ]
        }))
        .unwrap();

        match msg.content {
            MessageContent::Blocks(blocks) => {
                assert_eq!(blocks.len(), 3);
                assert!(matches!(blocks[0], ContentBlock::Text { .. }));
                assert!(matches!(blocks[1], ContentBlock::ToolResult { .. }));
                assert_eq!(blocks[2], ContentBlock::Unsupported);
            }
            MessageContent::Text(_) => panic!("expected blocks"),
        }
    }

    #[test]
    fn test_tool_result_text_flattening() {
        let content = ToolResultContent::Blocks(vec![
            json!({"type": "text", "text": "line one"}),
            json!({"type": "text", "text": "line two"}),
        ]);
        assert_eq!(content.to_text(), "line one\nline two");
    }

    #[test]
    fn test_image_source_urls() {
        let b64 = ImageSource {
            source_type: "base64".into(),
            media_type: Some("image/png".into()),
            data: Some("AAAA".into()),
            url: None,
        };
        assert_eq!(b64.to_url().as_deref(), Some("data:image/png;base64,AAAA"));

        let missing = ImageSource {
            source_type: "base64".into(),
            media_type: None,
            data: Some("AAAA".into()),
            url: None,
        };
        assert_eq!(missing.to_url(), None);
    }

    #[test]
    fn test_system_blocks_join() {
        let system: SystemContent = serde_json::from_value(json!([
            {"type": "text", "text": "a"},
            {"type": "text", "text": "b"}
        ]))
        .unwrap();
        assert_eq!(system.to_text(), "a\n\nb");
    }

    #[test]
    fn test_tool_choice_variants() {
        let choice: ToolChoice =
            serde_json::from_value(json!({"type": "tool", "name": "search"})).unwrap();
        assert_eq!(
            choice,
            ToolChoice::Tool {
                name: "search".into()
            }
        );
        let any: ToolChoice = serde_json::from_value(json!({"type": "any"})).unwrap();
        assert_eq!(any, ToolChoice::Any);
    }
}
