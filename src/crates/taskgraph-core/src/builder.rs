//! Builder API for assembling graphs.
//!
//! [`StateGraph`] pairs a [`Graph`] with the [`StateSchema`] that governs
//! delta merging, and compiles both into an immutable, shareable
//! [`CompiledGraph`].
//!
//! # Example
//!
//! ```rust
//! use taskgraph_core::builder::StateGraph;
//! use taskgraph_core::state::{AppendReducer, StateSchema};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = StateSchema::new().with_field("log", Box::new(AppendReducer));
//!
//! let mut graph = StateGraph::new(schema);
//! graph.add_node("step", &["log"], |_state| {
//!     Box::pin(async move { Ok(json!({"log": ["step ran"]})) })
//! });
//! graph.set_entry("step");
//! graph.add_edge("step", taskgraph_core::graph::END);
//!
//! let compiled = graph.compile()?;
//! let out = compiled.invoke(json!({"log": []})).await?;
//! assert_eq!(out["log"], json!(["step ran"]));
//! # Ok(())
//! # }
//! ```

use crate::compiled::CompiledGraph;
use crate::error::{GraphError, Result};
use crate::graph::{Graph, NodeFuture, NodeId, NodeSpec, RouterFn, START};
use crate::send::RouteResult;
use crate::state::StateSchema;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Mutable graph under construction.
pub struct StateGraph {
    graph: Graph,
    schema: StateSchema,
}

impl StateGraph {
    /// Start a new graph over the given state schema.
    pub fn new(schema: StateSchema) -> Self {
        Self {
            graph: Graph::new(),
            schema,
        }
    }

    /// Add a node with its declared write set and async executor.
    pub fn add_node<F>(
        &mut self,
        id: impl Into<NodeId>,
        writes: &[&str],
        executor: F,
    ) -> &mut Self
    where
        F: Fn(Value) -> NodeFuture + Send + Sync + 'static,
    {
        let name = id.into();
        self.graph.add_node(NodeSpec {
            name: name.clone(),
            executor: Arc::new(executor),
            writes: writes.iter().map(|w| w.to_string()).collect(),
        });
        self
    }

    /// Add a direct edge between two nodes.
    pub fn add_edge(&mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) -> &mut Self {
        self.graph.add_edge(from, to);
        self
    }

    /// Add a conditional edge. `branches` maps router labels to target
    /// nodes; a router may also fan out, bypassing the branch table.
    pub fn add_conditional_edge<F>(
        &mut self,
        from: impl Into<NodeId>,
        router: F,
        branches: HashMap<String, NodeId>,
    ) -> &mut Self
    where
        F: Fn(&Value) -> RouteResult + Send + Sync + 'static,
    {
        let router: RouterFn = Arc::new(router);
        self.graph.add_conditional_edge(from, router, branches);
        self
    }

    /// Mark the node execution starts from.
    pub fn set_entry(&mut self, node: impl Into<NodeId>) -> &mut Self {
        self.graph.add_edge(START, node);
        self
    }

    /// Validate and freeze the graph into an executable form.
    pub fn compile(self) -> Result<CompiledGraph> {
        self.graph.validate().map_err(GraphError::Validation)?;
        Ok(CompiledGraph::new(self.graph, self.schema))
    }
}
