//! Error types for tool handlers and dispatch.

use thiserror::Error;

/// Result type for tool operations.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Errors raised by the registry or by individual tool handlers.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool name is not registered.
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    /// Arguments did not match the tool's declared parameter schema.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// HTTP transport failure against the tool's backend (includes
    /// timeouts).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned a non-success status.
    #[error("backend error {status}: {body}")]
    Backend {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// Embedding generation for a semantic query failed.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// Handler-level failure.
    #[error("tool execution failed: {0}")]
    Execution(String),
}
