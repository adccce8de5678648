//! Agent-level error types.
//!
//! Every kind here is fatal to the run: the engine cancels in-flight
//! siblings and the caller receives the typed error, never a partial
//! result. Retry behaviour lives inside the sub-task loop, not here;
//! infrastructure failures are deliberately not retried so provider
//! instability stays visible.

use taskgraph_core::error::GraphError;
use taskgraph_core::llm::ModelError;
use thiserror::Error;
use tooling::ToolError;

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors a run can fail with. Callers match on the kind to decide policy.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The planner's structured completion returned no usable plan.
    #[error("plan parse failed: {0}")]
    PlanParse(String),

    /// The reflector's structured completion returned no usable critique.
    #[error("reflection parse failed: {0}")]
    ReflectionParse(String),

    /// The tool selector's completion carried no tool calls.
    #[error("model selected no tool")]
    NoToolSelected,

    /// The model requested a tool that is not registered.
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    /// A tool handler failed or timed out.
    #[error("tool execution failed: {0}")]
    ToolExecution(ToolError),

    /// Transport or provider failure on a model call.
    #[error("model call failed: {0}")]
    ModelCall(ModelError),

    /// Run state broke an invariant the agent depends on.
    #[error("state invariant violated: {0}")]
    Invariant(String),

    /// Engine-level failure (validation, undeclared write, timeout, ...).
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl AgentError {
    /// Recover the typed agent error from an engine failure.
    ///
    /// Node executors return [`AgentError`] boxed; the engine wraps it in
    /// [`GraphError::NodeExecution`]. Downcasting the source restores the
    /// original kind so callers can distinguish, say, a missing tool from
    /// a provider outage.
    pub fn from_graph(err: GraphError) -> Self {
        match err {
            GraphError::NodeExecution { node, source } => match source.downcast::<AgentError>() {
                Ok(inner) => *inner,
                Err(source) => Self::Graph(GraphError::NodeExecution { node, source }),
            },
            other => Self::Graph(other),
        }
    }

    /// Map a tool dispatch failure onto its agent-level kind.
    pub(crate) fn from_tool(err: ToolError) -> Self {
        match err {
            ToolError::UnknownTool(name) => Self::UnknownTool(name),
            other => Self::ToolExecution(other),
        }
    }

    /// Map a planner parse failure onto its agent-level kind.
    pub(crate) fn from_plan_parse(err: ModelError) -> Self {
        match err {
            ModelError::Parse(msg) => Self::PlanParse(msg),
            other => Self::ModelCall(other),
        }
    }

    /// Map a reflector parse failure onto its agent-level kind.
    pub(crate) fn from_reflection_parse(err: ModelError) -> Self {
        match err {
            ModelError::Parse(msg) => Self::ReflectionParse(msg),
            other => Self::ModelCall(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_graph_recovers_typed_error() {
        let graph_err = GraphError::NodeExecution {
            node: "select_tools".to_string(),
            source: Box::new(AgentError::NoToolSelected),
        };

        assert!(matches!(
            AgentError::from_graph(graph_err),
            AgentError::NoToolSelected
        ));
    }

    #[test]
    fn test_from_graph_keeps_foreign_errors() {
        let graph_err = GraphError::NodeExecution {
            node: "select_tools".to_string(),
            source: "something else".into(),
        };

        assert!(matches!(
            AgentError::from_graph(graph_err),
            AgentError::Graph(GraphError::NodeExecution { .. })
        ));
    }

    #[test]
    fn test_tool_error_mapping() {
        assert!(matches!(
            AgentError::from_tool(ToolError::UnknownTool("x".to_string())),
            AgentError::UnknownTool(name) if name == "x"
        ));
        assert!(matches!(
            AgentError::from_tool(ToolError::Execution("boom".to_string())),
            AgentError::ToolExecution(_)
        ));
    }

    #[test]
    fn test_parse_error_mapping() {
        assert!(matches!(
            AgentError::from_plan_parse(ModelError::Parse("null".to_string())),
            AgentError::PlanParse(_)
        ));
        assert!(matches!(
            AgentError::from_plan_parse(ModelError::Call("500".to_string())),
            AgentError::ModelCall(_)
        ));
        assert!(matches!(
            AgentError::from_reflection_parse(ModelError::Parse("null".to_string())),
            AgentError::ReflectionParse(_)
        ));
    }
}
