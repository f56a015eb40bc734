//! Provider implementations

pub mod copilot;

pub use copilot::CopilotProvider;
