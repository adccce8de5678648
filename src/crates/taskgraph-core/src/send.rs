//! Dynamic fan-out for conditional edges.
//!
//! A conditional edge normally routes to a single labelled branch. When the
//! number of parallel branches is only known at runtime (one per plan item,
//! one per tool call, ...), the router can instead return a list of
//! [`Send`] values. Each `Send` names a target node and carries the seed
//! state that one child receives. All children of one fan-out run in the
//! same super-step, and the engine merges their deltas in `Send`-index
//! order, so downstream nodes observe a deterministic aggregate no matter
//! which child finishes first.
//!
//! # Example
//!
//! ```rust
//! use taskgraph_core::send::{RouteResult, Send};
//! use serde_json::json;
//!
//! fn fan_out(items: &[&str]) -> RouteResult {
//!     RouteResult::Fanout(
//!         items
//!             .iter()
//!             .enumerate()
//!             .map(|(idx, item)| Send::new("worker", json!({"item": item, "index": idx})))
//!             .collect(),
//!     )
//! }
//! ```

use crate::graph::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One parallel child of a fan-out: a target node plus its seed state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Send {
    node: NodeId,
    seed: Value,
}

impl Send {
    /// Create a fan-out child targeting `node` with `seed` as its input.
    pub fn new(node: impl Into<NodeId>, seed: Value) -> Self {
        Self {
            node: node.into(),
            seed,
        }
    }

    /// Target node name.
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Seed state handed to the child.
    pub fn seed(&self) -> &Value {
        &self.seed
    }

    /// Consume the send, returning its parts.
    pub fn into_parts(self) -> (NodeId, Value) {
        (self.node, self.seed)
    }
}

/// Result of evaluating a conditional edge router.
#[derive(Debug, Clone)]
pub enum RouteResult {
    /// Follow the branch registered under this label.
    Label(String),

    /// Spawn one child per [`Send`], each with its own seed state.
    Fanout(Vec<Send>),
}

impl From<&str> for RouteResult {
    fn from(label: &str) -> Self {
        RouteResult::Label(label.to_string())
    }
}

impl From<String> for RouteResult {
    fn from(label: String) -> Self {
        RouteResult::Label(label)
    }
}

impl From<Vec<Send>> for RouteResult {
    fn from(sends: Vec<Send>) -> Self {
        RouteResult::Fanout(sends)
    }
}
