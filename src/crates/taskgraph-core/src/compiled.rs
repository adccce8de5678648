//! Super-step execution of compiled graphs.
//!
//! A run proceeds as a sequence of super-steps. Within one super-step every
//! frontier task executes concurrently against the same state snapshot;
//! their deltas are buffered and applied through the schema reducers in
//! task-index order at the barrier, after which outgoing edges are
//! evaluated on the merged state to form the next frontier.
//!
//! Guarantees this module provides:
//!
//! - **Deterministic merges.** Fan-out children publish in `Send`-index
//!   order regardless of which finishes first, so append-reduced fields
//!   come out in spawn order.
//! - **Declared writes.** A delta touching a field outside the node's
//!   declared write set fails the run with
//!   [`GraphError::UndeclaredWrite`].
//! - **Fail-fast.** The first node error aborts the run: remaining sibling
//!   tasks are dropped before any of their deltas merge, and the typed
//!   error surfaces to the caller. The same applies when the caller drops
//!   the `invoke` future, which is the cancellation path.
//! - **Re-entrant cycles.** A conditional edge may route back to an earlier
//!   node; the node simply re-enters the frontier with the updated state.
//!   Termination is the router's responsibility, with a step limit as the
//!   backstop.

use crate::error::{GraphError, Result};
use crate::graph::{Edge, Graph, NodeId, NodeSpec, END, START};
use crate::send::RouteResult;
use crate::state::StateSchema;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::debug;

const DEFAULT_STEP_LIMIT: usize = 128;

/// One schedulable unit of a super-step.
#[derive(Debug, Clone)]
struct Task {
    node: NodeId,
    /// Fan-out children carry their own seed; plain tasks read the shared
    /// state snapshot.
    seed: Option<Value>,
}

/// An immutable, executable graph. Cheap to clone and safe to share
/// across tasks; sub-graphs are compiled once and invoked per fan-out
/// child.
#[derive(Clone)]
pub struct CompiledGraph {
    nodes: Arc<HashMap<NodeId, NodeSpec>>,
    edges: Arc<HashMap<NodeId, Vec<Edge>>>,
    schema: Arc<StateSchema>,
    node_timeout: Option<Duration>,
    step_limit: usize,
}

impl CompiledGraph {
    pub(crate) fn new(graph: Graph, schema: StateSchema) -> Self {
        Self {
            nodes: Arc::new(graph.nodes),
            edges: Arc::new(graph.edges),
            schema: Arc::new(schema),
            node_timeout: None,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    /// Set a per-node execution timeout. A node exceeding it fails the run
    /// with [`GraphError::Timeout`].
    pub fn with_node_timeout(mut self, timeout: Duration) -> Self {
        self.node_timeout = Some(timeout);
        self
    }

    /// Override the super-step limit (backstop against non-terminating
    /// cycles).
    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    /// Run the graph to completion and return the final merged state.
    pub async fn invoke(&self, input: Value) -> Result<Value> {
        let mut state = input;
        if !state.is_object() {
            return Err(GraphError::State("graph input must be an object".to_string()));
        }

        let mut frontier = self.successors(START, &state)?;
        let mut steps = 0usize;

        while !frontier.is_empty() {
            steps += 1;
            if steps > self.step_limit {
                return Err(GraphError::Execution(format!(
                    "super-step limit of {} exceeded",
                    self.step_limit
                )));
            }
            debug!(step = steps, tasks = frontier.len(), "super-step");

            let deltas = self.run_super_step(&frontier, &state).await?;

            for (idx, delta) in deltas.iter().enumerate() {
                let node = &frontier[idx].node;
                self.check_writes(node, delta)?;
                self.schema
                    .apply(&mut state, delta)
                    .map_err(|e| GraphError::State(format!("in node '{}': {}", node, e)))?;
            }

            frontier = self.next_frontier(&frontier, &state)?;
        }

        Ok(state)
    }

    /// Execute all frontier tasks concurrently and return their deltas in
    /// task-index order. The first failure aborts the remaining tasks.
    async fn run_super_step(&self, frontier: &[Task], state: &Value) -> Result<Vec<Value>> {
        let mut join_set = JoinSet::new();

        for (idx, task) in frontier.iter().enumerate() {
            let spec = self
                .nodes
                .get(&task.node)
                .ok_or_else(|| {
                    GraphError::Validation(format!("task targets unknown node '{}'", task.node))
                })?
                .clone();
            let input = task.seed.clone().unwrap_or_else(|| state.clone());
            let timeout = self.node_timeout;

            join_set.spawn(async move {
                let future = (spec.executor)(input);
                let result = match timeout {
                    Some(budget) => match tokio::time::timeout(budget, future).await {
                        Ok(inner) => inner,
                        Err(_) => {
                            return (
                                idx,
                                Err(GraphError::Timeout {
                                    node: spec.name,
                                    duration_ms: budget.as_millis() as u64,
                                }),
                            )
                        }
                    },
                    None => future.await,
                };

                let delta = result.map_err(|source| GraphError::NodeExecution {
                    node: spec.name,
                    source,
                });
                (idx, delta)
            });
        }

        let mut deltas: Vec<Option<Value>> = vec![None; frontier.len()];
        while let Some(joined) = join_set.join_next().await {
            let (idx, result) = joined
                .map_err(|e| GraphError::Execution(format!("node task panicked: {}", e)))?;
            // Dropping join_set on the error path aborts in-flight siblings
            // before any delta is merged.
            deltas[idx] = Some(result?);
        }

        deltas
            .into_iter()
            .map(|d| d.ok_or_else(|| GraphError::Execution("node task vanished".to_string())))
            .collect()
    }

    /// Evaluate outgoing edges of every completed task on the merged state.
    /// Plain targets are deduplicated (a join node fires once per
    /// super-step); fan-out seeds are kept in send order.
    fn next_frontier(&self, frontier: &[Task], state: &Value) -> Result<Vec<Task>> {
        let mut next: Vec<Task> = Vec::new();

        for task in frontier {
            for successor in self.successors(&task.node, state)? {
                let duplicate = successor.seed.is_none()
                    && next
                        .iter()
                        .any(|t| t.seed.is_none() && t.node == successor.node);
                if !duplicate {
                    next.push(successor);
                }
            }
        }

        Ok(next)
    }

    fn successors(&self, node: &str, state: &Value) -> Result<Vec<Task>> {
        let mut out = Vec::new();

        let Some(edges) = self.edges.get(node) else {
            return Ok(out);
        };

        for edge in edges {
            match edge {
                Edge::Direct(to) => {
                    if to != END {
                        out.push(Task {
                            node: to.clone(),
                            seed: None,
                        });
                    }
                }
                Edge::Conditional { router, branches } => match router(state) {
                    RouteResult::Label(label) => {
                        let target = branches.get(&label).ok_or_else(|| {
                            GraphError::Validation(format!(
                                "router for '{}' returned unknown branch label '{}'",
                                node, label
                            ))
                        })?;
                        if target != END {
                            out.push(Task {
                                node: target.clone(),
                                seed: None,
                            });
                        }
                    }
                    RouteResult::Fanout(sends) => {
                        for send in sends {
                            let (target, seed) = send.into_parts();
                            if !self.nodes.contains_key(&target) {
                                return Err(GraphError::Validation(format!(
                                    "fan-out from '{}' targets unknown node '{}'",
                                    node, target
                                )));
                            }
                            out.push(Task {
                                node: target,
                                seed: Some(seed),
                            });
                        }
                    }
                },
            }
        }

        Ok(out)
    }

    fn check_writes(&self, node: &str, delta: &Value) -> Result<()> {
        let Some(spec) = self.nodes.get(node) else {
            return Err(GraphError::Validation(format!("unknown node '{}'", node)));
        };

        let Some(fields) = delta.as_object() else {
            return Err(GraphError::State(format!(
                "node '{}' returned a non-object delta",
                node
            )));
        };

        for field in fields.keys() {
            if !spec.writes.iter().any(|w| w == field) {
                return Err(GraphError::UndeclaredWrite {
                    node: node.to_string(),
                    field: field.clone(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::StateGraph;
    use crate::send::{RouteResult, Send};
    use crate::state::{AppendReducer, MaxReducer, StateSchema};
    use serde_json::json;

    fn append_schema() -> StateSchema {
        StateSchema::new().with_field("log", Box::new(AppendReducer))
    }

    #[tokio::test]
    async fn test_undeclared_write_is_rejected() {
        let mut graph = StateGraph::new(StateSchema::new());
        graph.add_node("sneaky", &["allowed"], |_| {
            Box::pin(async move { Ok(json!({"forbidden": true})) })
        });
        graph.set_entry("sneaky");
        graph.add_edge("sneaky", END);

        let err = graph.compile().unwrap().invoke(json!({})).await.unwrap_err();
        match err {
            GraphError::UndeclaredWrite { node, field } => {
                assert_eq!(node, "sneaky");
                assert_eq!(field, "forbidden");
            }
            other => panic!("expected UndeclaredWrite, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fanout_merges_in_send_order_despite_delays() {
        let mut graph = StateGraph::new(append_schema());
        graph.add_node("seed", &[], |_| Box::pin(async move { Ok(json!({})) }));
        graph.add_node("worker", &["log"], |state| {
            Box::pin(async move {
                let idx = state["index"].as_u64().unwrap_or(0);
                // Earlier children sleep longer, so completion order is the
                // reverse of send order.
                tokio::time::sleep(Duration::from_millis(60 - idx * 20)).await;
                Ok(json!({"log": [idx]}))
            })
        });
        graph.set_entry("seed");
        graph.add_conditional_edge(
            "seed",
            |_state| {
                RouteResult::Fanout(
                    (0..3)
                        .map(|idx| Send::new("worker", json!({"index": idx})))
                        .collect(),
                )
            },
            HashMap::new(),
        );
        graph.add_edge("worker", END);

        let out = graph
            .compile()
            .unwrap()
            .invoke(json!({"log": []}))
            .await
            .unwrap();
        assert_eq!(out["log"], json!([0, 1, 2]));
    }

    #[tokio::test]
    async fn test_join_node_fires_once_after_fanout() {
        let mut graph = StateGraph::new(append_schema());
        graph.add_node("seed", &[], |_| Box::pin(async move { Ok(json!({})) }));
        graph.add_node("worker", &["log"], |state| {
            Box::pin(async move { Ok(json!({"log": [state["index"].clone()]})) })
        });
        graph.add_node("join", &["log"], |_| {
            Box::pin(async move { Ok(json!({"log": ["joined"]})) })
        });
        graph.set_entry("seed");
        graph.add_conditional_edge(
            "seed",
            |_| {
                RouteResult::Fanout(vec![
                    Send::new("worker", json!({"index": 0})),
                    Send::new("worker", json!({"index": 1})),
                ])
            },
            HashMap::new(),
        );
        graph.add_edge("worker", "join");
        graph.add_edge("join", END);

        let out = graph
            .compile()
            .unwrap()
            .invoke(json!({"log": []}))
            .await
            .unwrap();
        assert_eq!(out["log"], json!([0, 1, "joined"]));
    }

    #[tokio::test]
    async fn test_conditional_cycle_terminates_on_label() {
        let schema = StateSchema::new().with_field("round", Box::new(MaxReducer));
        let mut graph = StateGraph::new(schema);
        graph.add_node("loop", &["round"], |state| {
            Box::pin(async move {
                let round = state["round"].as_i64().unwrap_or(0);
                Ok(json!({"round": round + 1}))
            })
        });
        graph.set_entry("loop");
        graph.add_conditional_edge(
            "loop",
            |state| {
                if state["round"].as_i64().unwrap_or(0) >= 3 {
                    "done".into()
                } else {
                    "again".into()
                }
            },
            HashMap::from([
                ("again".to_string(), "loop".to_string()),
                ("done".to_string(), END.to_string()),
            ]),
        );

        let out = graph
            .compile()
            .unwrap()
            .invoke(json!({"round": 0}))
            .await
            .unwrap();
        assert_eq!(out["round"], 3);
    }

    #[tokio::test]
    async fn test_node_error_aborts_run() {
        let mut graph = StateGraph::new(StateSchema::new());
        graph.add_node("boom", &[], |_| {
            Box::pin(async move { Err("node exploded".into()) })
        });
        graph.set_entry("boom");
        graph.add_edge("boom", END);

        let err = graph.compile().unwrap().invoke(json!({})).await.unwrap_err();
        match err {
            GraphError::NodeExecution { node, source } => {
                assert_eq!(node, "boom");
                assert_eq!(source.to_string(), "node exploded");
            }
            other => panic!("expected NodeExecution, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_node_timeout() {
        let mut graph = StateGraph::new(StateSchema::new());
        graph.add_node("slow", &[], |_| {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(json!({}))
            })
        });
        graph.set_entry("slow");
        graph.add_edge("slow", END);

        let compiled = graph
            .compile()
            .unwrap()
            .with_node_timeout(Duration::from_millis(20));

        let err = compiled.invoke(json!({})).await.unwrap_err();
        assert!(matches!(err, GraphError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_step_limit_backstop() {
        let mut graph = StateGraph::new(StateSchema::new());
        graph.add_node("spin", &[], |_| Box::pin(async move { Ok(json!({})) }));
        graph.set_entry("spin");
        graph.add_edge("spin", "spin");

        let compiled = graph.compile().unwrap().with_step_limit(10);
        let err = compiled.invoke(json!({})).await.unwrap_err();
        assert!(matches!(err, GraphError::Execution(_)));
    }

    #[tokio::test]
    async fn test_unknown_branch_label() {
        let mut graph = StateGraph::new(StateSchema::new());
        graph.add_node("route", &[], |_| Box::pin(async move { Ok(json!({})) }));
        graph.set_entry("route");
        graph.add_conditional_edge("route", |_| "mystery".into(), HashMap::new());

        let err = graph.compile().unwrap().invoke(json!({})).await.unwrap_err();
        assert!(matches!(err, GraphError::Validation(_)));
    }
}
