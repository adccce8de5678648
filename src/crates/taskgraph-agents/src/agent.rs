//! The plan-and-execute help desk agent.
//!
//! A run flows through two graphs:
//!
//! ```text
//! START ─→ create_plan ─→ (fan-out, one child per plan entry)
//!                             │
//!                             ▼
//!                      execute_subtask × N      (each invokes the
//!                             │                  compiled sub-graph)
//!                             ▼
//!                       create_answer ─→ END
//! ```
//!
//! and, inside every fan-out child, the bounded tool-use loop:
//!
//! ```text
//! select_tools ─→ execute_tools ─→ create_subtask_answer ─→ reflect_subtask
//!       ▲                                                        │
//!       └──────────── not completed and budget remains ──────────┘
//! ```
//!
//! The sub-graph is compiled once at construction and shared across
//! children; every child owns its own state, so sibling message buffers
//! never mix. Model calls pin temperature and seed, so with a
//! deterministic provider two runs over the same question produce the
//! same [`AgentResult`].

use crate::error::{AgentError, Result};
use crate::models::{AgentResult, Plan, Reflection, SubtaskResult, ToolInvocationResult};
use crate::prompts::AgentPrompts;
use crate::state::{main_schema, prune_messages, subtask_schema, MainState, SubtaskState};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use taskgraph_core::llm::{ChatModel, ChatRequest};
use taskgraph_core::messages::ChatMessage;
use taskgraph_core::send::{RouteResult, Send};
use taskgraph_core::{CompiledGraph, StateGraph, END};
use tooling::ToolRegistry;
use tracing::info;

/// Default critique budget per sub-task, counting the first attempt.
pub const DEFAULT_MAX_CHALLENGES: u32 = 3;

/// Configures and builds a [`HelpdeskAgent`].
pub struct HelpdeskAgentBuilder {
    model: Arc<dyn ChatModel>,
    registry: Arc<ToolRegistry>,
    prompts: AgentPrompts,
    max_challenges: u32,
    node_timeout: Option<Duration>,
}

impl HelpdeskAgentBuilder {
    /// Start a builder over a model client and a tool registry.
    pub fn new(model: Arc<dyn ChatModel>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            model,
            registry,
            prompts: AgentPrompts::default(),
            max_challenges: DEFAULT_MAX_CHALLENGES,
            node_timeout: None,
        }
    }

    /// Override the prompt set.
    pub fn with_prompts(mut self, prompts: AgentPrompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Override the critique budget per sub-task.
    pub fn with_max_challenges(mut self, max_challenges: u32) -> Self {
        self.max_challenges = max_challenges;
        self
    }

    /// Set a timeout per sub-task loop node. Each loop node is one model
    /// call or one round of tool calls; planner and summariser calls are
    /// bounded by the HTTP client timeout instead, since the fan-out node
    /// hosting a whole sub-graph must not share a single-call budget.
    pub fn with_node_timeout(mut self, timeout: Duration) -> Self {
        self.node_timeout = Some(timeout);
        self
    }

    /// Compile both graphs and return the agent.
    pub fn build(self) -> Result<HelpdeskAgent> {
        let core = Arc::new(AgentCore {
            model: self.model,
            registry: self.registry,
            prompts: self.prompts,
            max_challenges: self.max_challenges,
        });

        let subgraph = Arc::new(build_subtask_graph(core.clone(), self.node_timeout)?);
        let graph = build_main_graph(core, subgraph)?;

        Ok(HelpdeskAgent { graph })
    }
}

/// Plan-and-execute agent over search tools.
pub struct HelpdeskAgent {
    graph: CompiledGraph,
}

impl HelpdeskAgent {
    /// Build an agent with default prompts and budget.
    pub fn new(model: Arc<dyn ChatModel>, registry: Arc<ToolRegistry>) -> Result<Self> {
        Self::builder(model, registry).build()
    }

    /// Start a configuration builder.
    pub fn builder(model: Arc<dyn ChatModel>, registry: Arc<ToolRegistry>) -> HelpdeskAgentBuilder {
        HelpdeskAgentBuilder::new(model, registry)
    }

    /// Answer a question. Resolves when the whole graph has terminated;
    /// dropping the returned future cancels all in-flight sub-tasks.
    pub async fn run(&self, question: &str) -> Result<AgentResult> {
        info!(question = %question, "starting agent run");

        let initial = serde_json::to_value(MainState {
            question: question.to_string(),
            ..MainState::default()
        })
        .map_err(|e| AgentError::Graph(e.into()))?;

        let final_state = self
            .graph
            .invoke(initial)
            .await
            .map_err(AgentError::from_graph)?;
        let state: MainState = from_state(final_state)?;

        info!(subtasks = state.subtask_results.len(), "agent run finished");
        Ok(AgentResult {
            question: state.question,
            plan: state.plan,
            subtasks: state.subtask_results,
            answer: state.last_answer,
        })
    }
}

/// Shared dependencies of every node.
struct AgentCore {
    model: Arc<dyn ChatModel>,
    registry: Arc<ToolRegistry>,
    prompts: AgentPrompts,
    max_challenges: u32,
}

impl AgentCore {
    /// Planner node: decompose the question into ordered sub-tasks.
    async fn create_plan(&self, state: Value) -> Result<Value> {
        let view: MainState = from_state(state)?;
        info!("creating plan");

        let messages = vec![
            ChatMessage::system(&self.prompts.planner_system),
            ChatMessage::user(self.prompts.render_planner_user(&view.question)),
        ];

        let parsed = self
            .model
            .parse(ChatRequest::new(messages), Plan::response_format())
            .await
            .map_err(AgentError::from_plan_parse)?;
        let plan: Plan =
            serde_json::from_value(parsed).map_err(|e| AgentError::PlanParse(e.to_string()))?;

        info!(subtasks = plan.subtasks.len(), "plan created");
        Ok(json!({"plan": plan.subtasks}))
    }

    /// Selector node: pick tools for the sub-task, pruning old tool
    /// traffic on retries.
    async fn select_tools(&self, state: Value) -> Result<Value> {
        let view: SubtaskState = from_state(state)?;
        info!(subtask = %view.subtask, round = view.challenge_count, "selecting tools");

        let mut messages = if view.challenge_count == 0 {
            vec![
                ChatMessage::system(&self.prompts.subtask_system),
                ChatMessage::user(self.prompts.render_tool_selection_user(
                    &view.question,
                    &view.plan,
                    &view.subtask,
                )),
            ]
        } else {
            let mut pruned = prune_messages(view.messages);
            pruned.push(ChatMessage::user(&self.prompts.retry_user));
            pruned
        };

        let request =
            ChatRequest::new(messages.clone()).with_tools(self.registry.definitions());
        let response = self
            .model
            .complete(request)
            .await
            .map_err(AgentError::ModelCall)?;

        let tool_calls = response.tool_calls().to_vec();
        if tool_calls.is_empty() {
            return Err(AgentError::NoToolSelected);
        }

        messages.push(ChatMessage::assistant_tool_calls(tool_calls));
        Ok(json!({"messages": messages}))
    }

    /// Executor node: dispatch every pending tool call in order.
    async fn execute_tools(&self, state: Value) -> Result<Value> {
        let view: SubtaskState = from_state(state)?;
        let mut messages = view.messages;

        let tool_calls = messages
            .last()
            .map(|m| m.tool_calls().to_vec())
            .unwrap_or_default();
        if tool_calls.is_empty() {
            return Err(AgentError::Invariant(
                "executor ran without a pending tool call".to_string(),
            ));
        }

        let mut round = Vec::with_capacity(tool_calls.len());
        for call in &tool_calls {
            let hits = self
                .registry
                .dispatch(call)
                .await
                .map_err(AgentError::from_tool)?;
            info!(tool = %call.name, hits = hits.len(), "tool executed");

            let content =
                serde_json::to_string(&hits).map_err(|e| AgentError::Graph(e.into()))?;
            messages.push(ChatMessage::tool(content, &call.id));

            round.push(ToolInvocationResult {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
                results: hits,
            });
        }

        Ok(json!({"messages": messages, "tool_results": [round]}))
    }

    /// Synthesizer node: draft the sub-task answer from the buffered tool
    /// output.
    async fn create_subtask_answer(&self, state: Value) -> Result<Value> {
        let view: SubtaskState = from_state(state)?;
        let mut messages = view.messages;

        let response = self
            .model
            .complete(ChatRequest::new(messages.clone()))
            .await
            .map_err(AgentError::ModelCall)?;
        let answer = response.content().unwrap_or_default().to_string();

        messages.push(ChatMessage::assistant(answer.clone()));
        info!(subtask = %view.subtask, "sub-task answer drafted");
        Ok(json!({"messages": messages, "subtask_answer": answer}))
    }

    /// Reflector node: judge the answer, bump the round counter, and on
    /// budget exhaustion pin the deterministic fallback answer.
    async fn reflect_subtask(&self, state: Value) -> Result<Value> {
        let view: SubtaskState = from_state(state)?;
        let mut messages = view.messages;

        messages.push(ChatMessage::user(&self.prompts.reflection_user));

        let parsed = self
            .model
            .parse(
                ChatRequest::new(messages.clone()),
                Reflection::response_format(),
            )
            .await
            .map_err(AgentError::from_reflection_parse)?;
        let reflection: Reflection = serde_json::from_value(parsed)
            .map_err(|e| AgentError::ReflectionParse(e.to_string()))?;

        let encoded =
            serde_json::to_string(&reflection).map_err(|e| AgentError::Graph(e.into()))?;
        messages.push(ChatMessage::assistant(encoded));

        let challenge_count = view.challenge_count + 1;
        info!(
            subtask = %view.subtask,
            round = challenge_count,
            completed = reflection.is_completed,
            "reflection recorded"
        );

        let mut update = json!({
            "messages": messages,
            "reflection_results": [reflection.clone()],
            "challenge_count": challenge_count,
            "is_completed": reflection.is_completed,
        });

        if challenge_count >= self.max_challenges && !reflection.is_completed {
            update["subtask_answer"] = json!(format!("no answer found for: {}", view.subtask));
        }

        Ok(update)
    }

    /// Summariser node: fuse the sub-task answers into the final reply.
    async fn create_answer(&self, state: Value) -> Result<Value> {
        let view: MainState = from_state(state)?;

        if view.subtask_results.len() != view.plan.len() {
            return Err(AgentError::Invariant(format!(
                "expected {} sub-task results, found {}",
                view.plan.len(),
                view.subtask_results.len()
            )));
        }
        for (idx, result) in view.subtask_results.iter().enumerate() {
            if result.description != view.plan[idx] {
                return Err(AgentError::Invariant(format!(
                    "sub-task result {} is out of plan order",
                    idx
                )));
            }
        }

        // Only description/answer pairs enter the prompt; tool output and
        // critique history would blow up its size.
        let pairs: Vec<(String, String)> = view
            .subtask_results
            .iter()
            .map(|r| (r.description.clone(), r.answer.clone()))
            .collect();

        let messages = vec![
            ChatMessage::system(&self.prompts.summary_system),
            ChatMessage::user(self.prompts.render_summary_user(
                &view.question,
                &view.plan,
                &pairs,
            )),
        ];

        let response = self
            .model
            .complete(ChatRequest::new(messages))
            .await
            .map_err(AgentError::ModelCall)?;
        let answer = response.content().unwrap_or_default().to_string();

        info!("final answer created");
        Ok(json!({"last_answer": answer}))
    }
}

/// Fan-out child node: seed and run the compiled sub-graph for one plan
/// entry, publishing its outcome as a single appended result.
async fn run_subtask(subgraph: &CompiledGraph, state: Value) -> Result<Value> {
    let view: MainState = from_state(state)?;
    let subtask = view
        .plan
        .get(view.current_step)
        .cloned()
        .ok_or_else(|| {
            AgentError::Invariant(format!(
                "fan-out step {} is outside a plan of {} entries",
                view.current_step,
                view.plan.len()
            ))
        })?;

    info!(step = view.current_step, subtask = %subtask, "executing sub-task");

    let seed = serde_json::to_value(SubtaskState {
        question: view.question,
        plan: view.plan,
        subtask: subtask.clone(),
        ..SubtaskState::default()
    })
    .map_err(|e| AgentError::Graph(e.into()))?;

    let final_state = subgraph.invoke(seed).await.map_err(AgentError::from_graph)?;
    let result: SubtaskState = from_state(final_state)?;

    let subtask_result = SubtaskResult {
        description: result.subtask,
        tool_results: result.tool_results,
        reflection_results: result.reflection_results,
        is_completed: result.is_completed,
        answer: result.subtask_answer,
        challenge_count: result.challenge_count,
    };

    Ok(json!({"subtask_results": [subtask_result]}))
}

/// Compile the sub-task loop: SELECT → EXEC → ANSWER → REFLECT with a
/// conditional back-edge to SELECT.
fn build_subtask_graph(
    core: Arc<AgentCore>,
    node_timeout: Option<Duration>,
) -> Result<CompiledGraph> {
    let mut graph = StateGraph::new(subtask_schema());

    let node_core = core.clone();
    graph.add_node("select_tools", &["messages"], move |state| {
        let core = node_core.clone();
        Box::pin(async move { core.select_tools(state).await.map_err(Into::into) })
    });

    let node_core = core.clone();
    graph.add_node(
        "execute_tools",
        &["messages", "tool_results"],
        move |state| {
            let core = node_core.clone();
            Box::pin(async move { core.execute_tools(state).await.map_err(Into::into) })
        },
    );

    let node_core = core.clone();
    graph.add_node(
        "create_subtask_answer",
        &["messages", "subtask_answer"],
        move |state| {
            let core = node_core.clone();
            Box::pin(async move { core.create_subtask_answer(state).await.map_err(Into::into) })
        },
    );

    let node_core = core.clone();
    graph.add_node(
        "reflect_subtask",
        &[
            "messages",
            "reflection_results",
            "challenge_count",
            "is_completed",
            "subtask_answer",
        ],
        move |state| {
            let core = node_core.clone();
            Box::pin(async move { core.reflect_subtask(state).await.map_err(Into::into) })
        },
    );

    graph.set_entry("select_tools");
    graph.add_edge("select_tools", "execute_tools");
    graph.add_edge("execute_tools", "create_subtask_answer");
    graph.add_edge("create_subtask_answer", "reflect_subtask");

    let max_challenges = core.max_challenges;
    graph.add_conditional_edge(
        "reflect_subtask",
        move |state| {
            let is_completed = state["is_completed"].as_bool().unwrap_or(false);
            let challenge_count = state["challenge_count"].as_u64().unwrap_or(0);
            if is_completed || challenge_count >= u64::from(max_challenges) {
                "end".into()
            } else {
                "continue".into()
            }
        },
        HashMap::from([
            ("continue".to_string(), "select_tools".to_string()),
            ("end".to_string(), END.to_string()),
        ]),
    );

    let mut compiled = graph.compile()?;
    if let Some(timeout) = node_timeout {
        compiled = compiled.with_node_timeout(timeout);
    }
    Ok(compiled)
}

/// Compile the main graph: plan, fan out over plan entries, join, fuse.
fn build_main_graph(core: Arc<AgentCore>, subgraph: Arc<CompiledGraph>) -> Result<CompiledGraph> {
    let mut graph = StateGraph::new(main_schema());

    let node_core = core.clone();
    graph.add_node("create_plan", &["plan"], move |state| {
        let core = node_core.clone();
        Box::pin(async move { core.create_plan(state).await.map_err(Into::into) })
    });

    graph.add_node("execute_subtask", &["subtask_results"], move |state| {
        let subgraph = subgraph.clone();
        Box::pin(async move { run_subtask(&subgraph, state).await.map_err(Into::into) })
    });

    let node_core = core;
    graph.add_node("create_answer", &["last_answer"], move |state| {
        let core = node_core.clone();
        Box::pin(async move { core.create_answer(state).await.map_err(Into::into) })
    });

    graph.set_entry("create_plan");
    graph.add_conditional_edge(
        "create_plan",
        |state| {
            let plan_len = state["plan"].as_array().map_or(0, |p| p.len());
            if plan_len == 0 {
                // Nothing to research; go straight to the summariser.
                return "summarize".into();
            }
            RouteResult::Fanout(
                (0..plan_len)
                    .map(|idx| {
                        Send::new(
                            "execute_subtask",
                            json!({
                                "question": state["question"],
                                "plan": state["plan"],
                                "current_step": idx,
                            }),
                        )
                    })
                    .collect(),
            )
        },
        HashMap::from([("summarize".to_string(), "create_answer".to_string())]),
    );
    graph.add_edge("execute_subtask", "create_answer");
    graph.add_edge("create_answer", END);

    Ok(graph.compile()?)
}

fn from_state<T: serde::de::DeserializeOwned>(state: Value) -> Result<T> {
    serde_json::from_value(state).map_err(|e| AgentError::Invariant(format!("malformed run state: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskgraph_core::llm::{ModelError, StructuredFormat};

    struct InertModel;

    #[async_trait::async_trait]
    impl ChatModel for InertModel {
        async fn complete(
            &self,
            _request: ChatRequest,
        ) -> std::result::Result<ChatMessage, ModelError> {
            Ok(ChatMessage::assistant(""))
        }

        async fn parse(
            &self,
            _request: ChatRequest,
            _format: StructuredFormat,
        ) -> std::result::Result<Value, ModelError> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn test_builder_defaults() {
        let builder = HelpdeskAgent::builder(
            Arc::new(InertModel),
            Arc::new(ToolRegistry::new()),
        );

        assert_eq!(builder.max_challenges, DEFAULT_MAX_CHALLENGES);
        assert!(builder.node_timeout.is_none());
    }

    #[test]
    fn test_builder_compiles_both_graphs() {
        let agent = HelpdeskAgent::builder(
            Arc::new(InertModel),
            Arc::new(ToolRegistry::new()),
        )
        .with_max_challenges(5)
        .with_node_timeout(Duration::from_secs(30))
        .build();

        assert!(agent.is_ok());
    }
}
