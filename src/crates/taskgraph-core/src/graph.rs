//! Graph structure: nodes, edges, and validation.
//!
//! A [`Graph`] is the static description that [`StateGraph`](crate::StateGraph)
//! builds and [`CompiledGraph`](crate::CompiledGraph) executes. Nodes are
//! async functions from the current state to a delta; edges are either
//! direct or conditional (routing by label, or fanning out via
//! [`Send`](crate::send::Send)).
//!
//! Every node declares the state fields it is allowed to write. The engine
//! enforces the declaration when merging deltas, which turns "a node quietly
//! clobbered a field it should not own" from a debugging session into a
//! typed error.

use crate::send::RouteResult;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Node identifier. Must be unique within a graph.
pub type NodeId = String;

/// Virtual entry node. Edges from `START` define the initial frontier.
pub const START: &str = "__start__";

/// Virtual exit node. Routing to `END` terminates that branch.
pub const END: &str = "__end__";

/// Future returned by a node executor.
pub type NodeFuture = std::pin::Pin<
    Box<
        dyn std::future::Future<Output = std::result::Result<Value, crate::error::BoxError>>
            + std::marker::Send,
    >,
>;

/// Async node body: state snapshot in, delta out.
pub type NodeExecutor = Arc<dyn Fn(Value) -> NodeFuture + std::marker::Send + Sync>;

/// Router function for conditional edges.
pub type RouterFn = Arc<dyn Fn(&Value) -> RouteResult + std::marker::Send + Sync>;

/// A node registered in the graph.
#[derive(Clone)]
pub struct NodeSpec {
    /// Node name.
    pub name: NodeId,

    /// Async executor producing a state delta.
    pub executor: NodeExecutor,

    /// State fields this node may write. Deltas touching other fields are
    /// rejected at the merge barrier.
    pub writes: Vec<String>,
}

impl std::fmt::Debug for NodeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSpec")
            .field("name", &self.name)
            .field("writes", &self.writes)
            .finish_non_exhaustive()
    }
}

/// An outgoing edge.
#[derive(Clone)]
pub enum Edge {
    /// Unconditional transition to the target node (or [`END`]).
    Direct(NodeId),

    /// Runtime routing: the router inspects the merged state and returns a
    /// branch label or a fan-out.
    Conditional {
        /// Router evaluated on the state after the super-step barrier.
        router: RouterFn,
        /// Label to target-node mapping for [`RouteResult::Label`] results.
        branches: HashMap<String, NodeId>,
    },
}

impl std::fmt::Debug for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Edge::Direct(to) => f.debug_tuple("Direct").field(to).finish(),
            Edge::Conditional { branches, .. } => f
                .debug_struct("Conditional")
                .field("branches", branches)
                .finish_non_exhaustive(),
        }
    }
}

/// Static graph structure.
#[derive(Default)]
pub struct Graph {
    /// Registered nodes by name.
    pub nodes: HashMap<NodeId, NodeSpec>,

    /// Outgoing edges by source node ([`START`] included).
    pub edges: HashMap<NodeId, Vec<Edge>>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node.
    pub fn add_node(&mut self, spec: NodeSpec) {
        self.nodes.insert(spec.name.clone(), spec);
    }

    /// Add a direct edge.
    pub fn add_edge(&mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) {
        self.edges
            .entry(from.into())
            .or_default()
            .push(Edge::Direct(to.into()));
    }

    /// Add a conditional edge with its branch table.
    pub fn add_conditional_edge(
        &mut self,
        from: impl Into<NodeId>,
        router: RouterFn,
        branches: HashMap<String, NodeId>,
    ) {
        self.edges
            .entry(from.into())
            .or_default()
            .push(Edge::Conditional { router, branches });
    }

    /// Check structural consistency: every edge source and target must be a
    /// registered node, [`START`], or [`END`], and [`START`] must have at
    /// least one outgoing edge.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.edges.get(START).map_or(true, |e| e.is_empty()) {
            return Err("graph has no entry edge from __start__".to_string());
        }

        for (from, edges) in &self.edges {
            if from != START && !self.nodes.contains_key(from) {
                return Err(format!("edge source '{}' is not a node", from));
            }

            for edge in edges {
                match edge {
                    Edge::Direct(to) => self.check_target(from, to)?,
                    Edge::Conditional { branches, .. } => {
                        for to in branches.values() {
                            self.check_target(from, to)?;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn check_target(&self, from: &str, to: &str) -> std::result::Result<(), String> {
        if to != END && !self.nodes.contains_key(to) {
            return Err(format!("edge target '{}' (from '{}') is not a node", to, from));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> NodeSpec {
        NodeSpec {
            name: name.to_string(),
            executor: Arc::new(|_| Box::pin(async { Ok(serde_json::json!({})) })),
            writes: vec![],
        }
    }

    #[test]
    fn test_validate_requires_entry() {
        let graph = Graph::new();
        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_linear_graph() {
        let mut graph = Graph::new();
        graph.add_node(noop("a"));
        graph.add_node(noop("b"));
        graph.add_edge(START, "a");
        graph.add_edge("a", "b");
        graph.add_edge("b", END);

        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_dangling_target() {
        let mut graph = Graph::new();
        graph.add_node(noop("a"));
        graph.add_edge(START, "a");
        graph.add_edge("a", "missing");

        let err = graph.validate().unwrap_err();
        assert!(err.contains("missing"));
    }

    #[test]
    fn test_validate_checks_conditional_branches() {
        let mut graph = Graph::new();
        graph.add_node(noop("a"));
        graph.add_edge(START, "a");
        graph.add_conditional_edge(
            "a",
            Arc::new(|_| "end".into()),
            HashMap::from([("end".to_string(), "nowhere".to_string())]),
        );

        assert!(graph.validate().is_err());
    }
}
