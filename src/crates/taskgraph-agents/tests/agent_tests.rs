//! End-to-end agent scenarios over a scripted model stub and static tools.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taskgraph_agents::{AgentError, AgentPrompts, HelpdeskAgent, Reflection};
use taskgraph_core::llm::{ChatModel, ChatRequest, ModelError, StructuredFormat, ToolDefinition};
use taskgraph_core::messages::{ChatMessage, ToolCall};
use tooling::{SearchHit, ToolHandler, ToolRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Plan,
    Select,
    Answer,
    Reflect,
    Summarize,
}

#[derive(Debug, Clone)]
struct RecordedCall {
    kind: CallKind,
    messages: Vec<ChatMessage>,
    temperature: f32,
    seed: i64,
}

impl RecordedCall {
    /// Sub-task markers present in this call's conversation.
    fn subtask_markers(&self) -> Vec<String> {
        self.messages
            .iter()
            .filter_map(|m| m.content())
            .filter_map(extract_subtask)
            .collect()
    }
}

/// Scripted behaviour of the stub model.
#[derive(Default)]
struct StubBehavior {
    /// Plan returned by the planner call.
    plan: Vec<String>,
    /// Reflection verdict once the script below runs dry.
    default_completed: bool,
    /// Per-call reflection verdicts, consumed front to back.
    reflection_script: Vec<bool>,
    /// Final answer returned by the summariser call.
    final_answer: String,
    /// Tool name the selector picks.
    select_tool: Option<String>,
    /// When set, the selector answers in prose without any tool call.
    withhold_tool_calls: bool,
    /// When set, the planner's structured completion fails.
    fail_plan: bool,
    /// Selector delay per sub-task, for completion-order tests.
    select_delays: HashMap<String, Duration>,
}

struct StubModel {
    prompts: AgentPrompts,
    behavior: StubBehavior,
    reflection_script: Mutex<VecDeque<bool>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl StubModel {
    fn new(behavior: StubBehavior) -> Self {
        Self {
            prompts: AgentPrompts::default(),
            reflection_script: Mutex::new(behavior.reflection_script.iter().copied().collect()),
            behavior,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, kind: CallKind, request: &ChatRequest) {
        self.calls.lock().unwrap().push(RecordedCall {
            kind,
            messages: request.messages.clone(),
            temperature: request.temperature,
            seed: request.seed,
        });
    }

    fn calls_of(&self, kind: CallKind) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.kind == kind)
            .cloned()
            .collect()
    }

    fn all_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn is_summary_request(&self, request: &ChatRequest) -> bool {
        request
            .messages
            .first()
            .and_then(|m| m.content())
            .map_or(false, |content| content == self.prompts.summary_system)
    }
}

/// Pull the sub-task name out of a rendered tool-selection prompt.
fn extract_subtask(content: &str) -> Option<String> {
    let marker = "Current sub-task: ";
    let start = content.find(marker)? + marker.len();
    let rest = &content[start..];
    let end = rest.find('\n').unwrap_or(rest.len());
    Some(rest[..end].trim().to_string())
}

#[async_trait]
impl ChatModel for StubModel {
    async fn complete(&self, request: ChatRequest) -> Result<ChatMessage, ModelError> {
        if !request.tools.is_empty() {
            self.record(CallKind::Select, &request);

            let subtask = request
                .messages
                .iter()
                .filter_map(|m| m.content())
                .find_map(extract_subtask)
                .unwrap_or_default();

            if let Some(delay) = self.behavior.select_delays.get(&subtask) {
                tokio::time::sleep(*delay).await;
            }

            if self.behavior.withhold_tool_calls {
                return Ok(ChatMessage::assistant("I do not need a tool for this."));
            }

            let tool = self
                .behavior
                .select_tool
                .clone()
                .unwrap_or_else(|| "kw_search".to_string());
            return Ok(ChatMessage::assistant_tool_calls(vec![ToolCall::new(
                uuid::Uuid::new_v4().to_string(),
                tool,
                json!({"query": subtask}),
            )]));
        }

        if self.is_summary_request(&request) {
            self.record(CallKind::Summarize, &request);
            return Ok(ChatMessage::assistant(self.behavior.final_answer.clone()));
        }

        self.record(CallKind::Answer, &request);
        let subtask = request
            .messages
            .iter()
            .filter_map(|m| m.content())
            .find_map(extract_subtask)
            .unwrap_or_default();
        Ok(ChatMessage::assistant(format!("draft for {subtask}")))
    }

    async fn parse(
        &self,
        request: ChatRequest,
        format: StructuredFormat,
    ) -> Result<Value, ModelError> {
        match format.name.as_str() {
            "plan" => {
                self.record(CallKind::Plan, &request);
                if self.behavior.fail_plan {
                    return Err(ModelError::Parse("structured response was empty".to_string()));
                }
                Ok(json!({"subtasks": self.behavior.plan}))
            }
            "reflection" => {
                self.record(CallKind::Reflect, &request);
                let is_completed = self
                    .reflection_script
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or(self.behavior.default_completed);
                let critique = if is_completed {
                    String::new()
                } else {
                    "insufficient evidence".to_string()
                };
                Ok(json!({"is_completed": is_completed, "critique": critique}))
            }
            other => Err(ModelError::Parse(format!("unexpected format '{other}'"))),
        }
    }
}

/// Tool that always returns the same hits.
struct StaticSearchTool {
    name: String,
    hits: Vec<SearchHit>,
}

#[async_trait]
impl ToolHandler for StaticSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(&self.name, "static search results").with_parameters(json!({
            "type": "object",
            "properties": {"query": {"type": "string"}},
            "required": ["query"]
        }))
    }

    async fn invoke(&self, _arguments: Value) -> tooling::Result<Vec<SearchHit>> {
        Ok(self.hits.clone())
    }
}

fn one_hit() -> Vec<SearchHit> {
    vec![SearchHit::new(
        "doc-404",
        3.2,
        "ERR-404: the requested resource was not found",
        json!({"section": "errors"}),
    )]
}

fn make_agent(behavior: StubBehavior) -> (HelpdeskAgent, Arc<StubModel>) {
    let model = Arc::new(StubModel::new(behavior));
    let registry = Arc::new(ToolRegistry::new().with_handler(Arc::new(StaticSearchTool {
        name: "kw_search".to_string(),
        hits: one_hit(),
    })));

    let agent = HelpdeskAgent::new(model.clone() as Arc<dyn ChatModel>, registry)
        .expect("agent should compile");
    (agent, model)
}

#[tokio::test]
async fn single_subtask_completes_in_one_round() {
    let (agent, model) = make_agent(StubBehavior {
        plan: vec!["look up ERR-404".to_string()],
        default_completed: true,
        final_answer: "ERR-404 means not found.".to_string(),
        ..StubBehavior::default()
    });

    let result = agent.run("what is ERR-404?").await.unwrap();

    assert_eq!(result.answer, "ERR-404 means not found.");
    assert_eq!(result.plan, vec!["look up ERR-404"]);
    assert_eq!(result.subtasks.len(), 1);

    let subtask = &result.subtasks[0];
    assert_eq!(subtask.description, "look up ERR-404");
    assert!(subtask.is_completed);
    assert_eq!(subtask.challenge_count, 1);
    assert_eq!(subtask.tool_results.len(), 1);
    assert_eq!(subtask.tool_results[0].len(), 1);
    assert_eq!(subtask.tool_results[0][0].name, "kw_search");
    assert_eq!(subtask.tool_results[0][0].results.len(), 1);
    assert_eq!(subtask.reflection_results.len(), 1);

    let kinds: Vec<CallKind> = model.all_calls().iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![
            CallKind::Plan,
            CallKind::Select,
            CallKind::Answer,
            CallKind::Reflect,
            CallKind::Summarize,
        ]
    );
}

#[tokio::test]
async fn two_subtasks_preserve_plan_order_and_determinism() {
    let behavior = || StubBehavior {
        plan: vec!["alpha-task".to_string(), "beta-task".to_string()],
        default_completed: true,
        final_answer: "combined answer".to_string(),
        ..StubBehavior::default()
    };

    let (agent, model) = make_agent(behavior());
    let first = agent.run("two-part question").await.unwrap();

    assert_eq!(first.subtasks.len(), 2);
    assert_eq!(first.subtasks[0].description, "alpha-task");
    assert_eq!(first.subtasks[1].description, "beta-task");
    assert_eq!(first.answer, "combined answer");

    // Pinned sampling on every call.
    for call in model.all_calls() {
        assert_eq!(call.temperature, 0.0);
        assert_eq!(call.seed, 0);
    }

    // A second run over identical inputs yields an identical result.
    let (agent, _) = make_agent(behavior());
    let second = agent.run("two-part question").await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn exhausted_budget_pins_the_fallback_answer() {
    let (agent, model) = make_agent(StubBehavior {
        plan: vec!["hopeless-task".to_string()],
        default_completed: false,
        final_answer: "nothing conclusive".to_string(),
        ..StubBehavior::default()
    });

    let result = agent.run("unanswerable question").await.unwrap();
    let subtask = &result.subtasks[0];

    assert!(!subtask.is_completed);
    assert_eq!(subtask.challenge_count, 3);
    assert_eq!(subtask.answer, "no answer found for: hopeless-task");
    assert_eq!(subtask.tool_results.len(), 3);
    assert_eq!(subtask.reflection_results.len(), 3);

    // The loop ran exactly three rounds, never a fourth.
    assert_eq!(model.calls_of(CallKind::Select).len(), 3);
    assert_eq!(model.calls_of(CallKind::Reflect).len(), 3);
}

#[tokio::test]
async fn selector_without_tool_calls_fails_the_run() {
    let (agent, _) = make_agent(StubBehavior {
        plan: vec!["some task".to_string()],
        withhold_tool_calls: true,
        ..StubBehavior::default()
    });

    let err = agent.run("question").await.unwrap_err();
    assert!(matches!(err, AgentError::NoToolSelected));
}

#[tokio::test]
async fn unregistered_tool_name_fails_the_run() {
    let (agent, _) = make_agent(StubBehavior {
        plan: vec!["some task".to_string()],
        select_tool: Some("not-registered".to_string()),
        ..StubBehavior::default()
    });

    let err = agent.run("question").await.unwrap_err();
    assert!(matches!(err, AgentError::UnknownTool(name) if name == "not-registered"));
}

#[tokio::test]
async fn failed_plan_parse_fails_the_run() {
    let (agent, _) = make_agent(StubBehavior {
        fail_plan: true,
        ..StubBehavior::default()
    });

    let err = agent.run("question").await.unwrap_err();
    assert!(matches!(err, AgentError::PlanParse(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn siblings_stay_isolated_and_ordered_under_delay() {
    let (agent, model) = make_agent(StubBehavior {
        plan: vec!["alpha-task".to_string(), "beta-task".to_string()],
        default_completed: true,
        final_answer: "joined".to_string(),
        select_delays: HashMap::from([("alpha-task".to_string(), Duration::from_millis(200))]),
        ..StubBehavior::default()
    });

    let result = agent.run("two-part question").await.unwrap();

    // Plan order survives even though sub-task 0 finished last.
    assert_eq!(result.subtasks[0].description, "alpha-task");
    assert_eq!(result.subtasks[1].description, "beta-task");

    // No conversation ever mixes two sub-tasks: each sub-graph call sees
    // exactly one sub-task marker, and beta's buffers carry no residue of
    // alpha's drafts.
    for call in model.all_calls() {
        let mut markers = call.subtask_markers();
        markers.dedup();
        assert!(markers.len() <= 1, "messages mixed sub-tasks: {markers:?}");

        if markers.as_slice() == ["beta-task"] {
            let has_alpha_draft = call
                .messages
                .iter()
                .filter_map(|m| m.content())
                .any(|c| c.contains("draft for alpha-task"));
            assert!(!has_alpha_draft);
        }
    }
}

#[tokio::test]
async fn retry_round_prunes_tool_traffic_but_keeps_critiques() {
    let (agent, model) = make_agent(StubBehavior {
        plan: vec!["needs-two-rounds".to_string()],
        reflection_script: vec![false, true],
        default_completed: true,
        final_answer: "eventually found".to_string(),
        ..StubBehavior::default()
    });

    let result = agent.run("question").await.unwrap();
    let subtask = &result.subtasks[0];
    assert!(subtask.is_completed);
    assert_eq!(subtask.challenge_count, 2);
    assert_eq!(subtask.tool_results.len(), 2);
    assert_eq!(subtask.reflection_results.len(), 2);

    let selects = model.calls_of(CallKind::Select);
    assert_eq!(selects.len(), 2);

    let retry = &selects[1];
    assert!(retry.messages.iter().all(|m| !m.is_tool()));
    assert!(retry.messages.iter().all(|m| !m.has_tool_calls()));

    // Every critique the reflector appended survives the prune, and it
    // round-trips losslessly through its JSON encoding.
    let critiques: Vec<Reflection> = retry
        .messages
        .iter()
        .filter(|m| m.role() == "assistant")
        .filter_map(|m| m.content())
        .filter_map(|c| serde_json::from_str(c).ok())
        .collect();
    assert_eq!(
        critiques,
        vec![Reflection {
            is_completed: false,
            critique: "insufficient evidence".to_string(),
        }]
    );

    // The retry instruction is the newest turn.
    let last = retry.messages.last().unwrap();
    assert_eq!(last.role(), "user");
    assert_eq!(last.content(), Some(AgentPrompts::default().retry_user.as_str()));
}

#[tokio::test]
async fn empty_plan_goes_straight_to_the_summariser() {
    let (agent, model) = make_agent(StubBehavior {
        plan: vec![],
        final_answer: "no research needed".to_string(),
        ..StubBehavior::default()
    });

    let result = agent.run("trivial question").await.unwrap();

    assert!(result.subtasks.is_empty());
    assert_eq!(result.answer, "no research needed");
    assert!(model.calls_of(CallKind::Select).is_empty());
    assert_eq!(model.calls_of(CallKind::Summarize).len(), 1);
}
