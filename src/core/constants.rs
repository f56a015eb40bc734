//! Constants for upstream endpoints, editor identity and API vocabulary
//!
//! This module defines the GitHub / Copilot endpoint constants together with
//! the string constants used for message roles, content types, stop reasons,
//! event types, and delta types.

/// GitHub and Copilot endpoints and client identity
pub mod github {
    /// GitHub REST API base URL
    pub const API_BASE_URL: &str = "https://api.github.com";

    /// GitHub web base URL (OAuth device flow lives here)
    pub const BASE_URL: &str = "https://github.com";

    /// OAuth client id of the Copilot editor integration
    pub const CLIENT_ID: &str = "Iv1.b507a08c87ecfe98";

    /// OAuth scopes requested during the device flow
    pub const APP_SCOPES: &str = "read:user";

    /// Grant type for device-code token polling
    pub const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

    /// Release feed used to discover the current VS Code version
    pub const VSCODE_RELEASE_URL: &str =
        "https://api.github.com/repos/microsoft/vscode/releases/latest";
}

/// Editor identity sent with every upstream request
pub mod editor {
    /// `editor-plugin-version` header value
    pub const EDITOR_PLUGIN_VERSION: &str = "copilot-chat/0.26.7";

    /// `user-agent` header value
    pub const USER_AGENT: &str = "GitHubCopilotChat/0.26.7";

    /// `x-github-api-version` header value
    pub const API_VERSION: &str = "2025-04-01";

    /// VS Code version used when discovery fails
    pub const FALLBACK_VSCODE_VERSION: &str = "1.85.0";
}

/// Message role constants
pub mod role {
    /// User role identifier
    pub const USER: &str = "user";

    /// Assistant role identifier
    pub const ASSISTANT: &str = "assistant";

    /// System role identifier
    pub const SYSTEM: &str = "system";

    /// Tool role identifier
    pub const TOOL: &str = "tool";
}

/// Content type constants
pub mod content {
    /// Text content type
    pub const TEXT: &str = "text";

    /// OpenAI image part type
    pub const IMAGE_URL: &str = "image_url";

    /// Tool use content type
    pub const TOOL_USE: &str = "tool_use";
}

/// Tool type constants
pub mod tool {
    /// Function tool type
    pub const FUNCTION: &str = "function";
}

/// Stop reason constants
pub mod stop {
    /// End turn stop reason
    pub const END_TURN: &str = "end_turn";

    /// Max tokens stop reason
    pub const MAX_TOKENS: &str = "max_tokens";

    /// Tool use stop reason
    pub const TOOL_USE: &str = "tool_use";
}

/// Server-sent event type constants
pub mod event {
    /// Message start event
    pub const MESSAGE_START: &str = "message_start";

    /// Message stop event
    pub const MESSAGE_STOP: &str = "message_stop";

    /// Message delta event
    pub const MESSAGE_DELTA: &str = "message_delta";

    /// Content block start event
    pub const CONTENT_BLOCK_START: &str = "content_block_start";

    /// Content block stop event
    pub const CONTENT_BLOCK_STOP: &str = "content_block_stop";

    /// Content block delta event
    pub const CONTENT_BLOCK_DELTA: &str = "content_block_delta";

    /// Ping event
    pub const PING: &str = "ping";

    /// Error event
    pub const ERROR: &str = "error";
}

/// Delta type constants
pub mod delta {
    /// Text delta type
    pub const TEXT: &str = "text_delta";

    /// Input JSON delta type
    pub const INPUT_JSON: &str = "input_json_delta";
}
