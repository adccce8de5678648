//! # taskgraph-core
//!
//! Generic dataflow executor for staged agent workflows.
//!
//! A graph is a set of async nodes over a shared JSON state. Nodes return
//! small deltas; a [`state::StateSchema`] of per-field reducers decides how
//! deltas merge, and every node declares the fields it may write. Execution
//! proceeds in super-steps: all ready nodes run concurrently, their deltas
//! are applied atomically at the barrier in deterministic order, and edges
//! (direct, conditional, or fan-out via [`send::Send`]) produce the next
//! ready set. Sub-graphs compile once into a [`CompiledGraph`] and can be
//! invoked from a parent node per fan-out child.
//!
//! The crate also carries the shared conversation types
//! ([`messages::ChatMessage`], [`messages::ToolCall`]) and the
//! [`llm::ChatModel`] trait that provider crates implement, so agents,
//! engine, and clients agree on one vocabulary.
//!
//! # Example
//!
//! ```rust
//! use taskgraph_core::{StateGraph, END};
//! use taskgraph_core::state::{AppendReducer, StateSchema};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = StateSchema::new().with_field("steps", Box::new(AppendReducer));
//! let mut graph = StateGraph::new(schema);
//!
//! graph.add_node("work", &["steps"], |_state| {
//!     Box::pin(async move { Ok(json!({"steps": ["worked"]})) })
//! });
//! graph.set_entry("work");
//! graph.add_edge("work", END);
//!
//! let result = graph.compile()?.invoke(json!({"steps": []})).await?;
//! assert_eq!(result["steps"], json!(["worked"]));
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod compiled;
pub mod error;
pub mod graph;
pub mod llm;
pub mod messages;
pub mod send;
pub mod state;

pub use builder::StateGraph;
pub use compiled::CompiledGraph;
pub use error::{BoxError, GraphError};
pub use graph::{NodeId, END, START};
pub use messages::{ChatMessage, ToolCall};
pub use send::{RouteResult, Send};
