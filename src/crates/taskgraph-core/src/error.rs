//! Error types for graph construction and execution.
//!
//! All errors implement `std::error::Error` via the `thiserror` crate.
//! Node failures keep the original boxed error as their `source`, so a
//! caller that runs domain logic inside node executors can downcast the
//! source back into its own error type after a failed run.
//!
//! # Example
//!
//! ```rust
//! use taskgraph_core::error::GraphError;
//!
//! let err = GraphError::node_execution("planner", "provider returned 500");
//! assert_eq!(
//!     err.to_string(),
//!     "node 'planner' execution failed: provider returned 500"
//! );
//! ```

use thiserror::Error;

/// Boxed error type carried by node executors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Convenience result type using [`GraphError`].
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors raised while building, validating, or running a graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Graph structure is invalid (missing entry, dangling edge target, ...).
    #[error("graph validation failed: {0}")]
    Validation(String),

    /// A node executor returned an error. The original error is preserved
    /// as the source and can be recovered by downcasting.
    #[error("node '{node}' execution failed: {source}")]
    NodeExecution {
        /// Name of the node that failed.
        node: String,
        /// The error returned by the executor.
        #[source]
        source: BoxError,
    },

    /// A node returned a delta touching a field outside its declared
    /// write set.
    #[error("node '{node}' wrote undeclared field '{field}'")]
    UndeclaredWrite {
        /// Name of the offending node.
        node: String,
        /// The field the node tried to write.
        field: String,
    },

    /// State merge failed (reducer type mismatch, non-object state, ...).
    #[error("state error: {0}")]
    State(String),

    /// A node exceeded the configured per-node timeout.
    #[error("node '{node}' timed out after {duration_ms}ms")]
    Timeout {
        /// Name of the node that timed out.
        node: String,
        /// Timeout budget in milliseconds.
        duration_ms: u64,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Execution-level failure without a specific node context.
    #[error("execution failed: {0}")]
    Execution(String),
}

impl GraphError {
    /// Create a node execution error from anything convertible into a
    /// boxed error.
    pub fn node_execution(node: impl Into<String>, error: impl Into<BoxError>) -> Self {
        Self::NodeExecution {
            node: node.into(),
            source: error.into(),
        }
    }
}
