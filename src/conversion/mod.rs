//! Conversion between the Anthropic Messages API and OpenAI chat completions

pub mod request_converter;
pub mod response_converter;
