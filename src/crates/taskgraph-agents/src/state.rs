//! Run state of the main graph and the sub-task sub-graph.
//!
//! Both states live in the engine as JSON objects; the typed structs here
//! serialise in and out at the node boundaries. The schema functions
//! declare the merge rule per field:
//!
//! - `subtask_results`, `tool_results`, `reflection_results` are
//!   append-only, so fan-out children and critique rounds accumulate;
//! - `challenge_count` is a monotone counter;
//! - `messages` is replaced wholesale by each node, which is what lets
//!   the selector prune the buffer on retry;
//! - everything else is last-write-wins.

use crate::models::{Reflection, SubtaskResult, ToolInvocationResult};
use serde::{Deserialize, Serialize};
use taskgraph_core::messages::ChatMessage;
use taskgraph_core::state::{AppendReducer, MaxReducer, OverwriteReducer, StateSchema};

/// Top-level run state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MainState {
    /// The user's question.
    #[serde(default)]
    pub question: String,

    /// Sub-task descriptions, set once by the planner.
    #[serde(default)]
    pub plan: Vec<String>,

    /// Plan index owned by a fan-out child.
    #[serde(default)]
    pub current_step: usize,

    /// One result per plan entry, concatenated in plan order at the join.
    #[serde(default)]
    pub subtask_results: Vec<SubtaskResult>,

    /// The fused final answer, set once by the summariser.
    #[serde(default)]
    pub last_answer: String,
}

/// Per-sub-task loop state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubtaskState {
    /// The user's question, copied from the parent for context.
    #[serde(default)]
    pub question: String,

    /// The full plan, copied from the parent for context.
    #[serde(default)]
    pub plan: Vec<String>,

    /// The plan entry this loop is answering.
    #[serde(default)]
    pub subtask: String,

    /// Conversation buffer carried between loop iterations.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,

    /// Completed critique rounds.
    #[serde(default)]
    pub challenge_count: u32,

    /// Terminal flag set by the reflector.
    #[serde(default)]
    pub is_completed: bool,

    /// Tool invocations, one inner list per critique round.
    #[serde(default)]
    pub tool_results: Vec<Vec<ToolInvocationResult>>,

    /// One reflection per critique round.
    #[serde(default)]
    pub reflection_results: Vec<Reflection>,

    /// Last produced answer for the sub-task.
    #[serde(default)]
    pub subtask_answer: String,
}

/// Merge rules for [`MainState`].
pub fn main_schema() -> StateSchema {
    StateSchema::new()
        .with_field("question", Box::new(OverwriteReducer))
        .with_field("plan", Box::new(OverwriteReducer))
        .with_field("current_step", Box::new(OverwriteReducer))
        .with_field("subtask_results", Box::new(AppendReducer))
        .with_field("last_answer", Box::new(OverwriteReducer))
}

/// Merge rules for [`SubtaskState`].
pub fn subtask_schema() -> StateSchema {
    StateSchema::new()
        .with_field("question", Box::new(OverwriteReducer))
        .with_field("plan", Box::new(OverwriteReducer))
        .with_field("subtask", Box::new(OverwriteReducer))
        .with_field("messages", Box::new(OverwriteReducer))
        .with_field("challenge_count", Box::new(MaxReducer))
        .with_field("is_completed", Box::new(OverwriteReducer))
        .with_field("tool_results", Box::new(AppendReducer))
        .with_field("reflection_results", Box::new(AppendReducer))
        .with_field("subtask_answer", Box::new(OverwriteReducer))
}

/// Drop bulky tool traffic from a retry prompt.
///
/// Removes every tool message and every assistant message that carried
/// tool calls. The system prompt, the original user turn, the synthesized
/// answers, and the reflector's critiques all survive, which is exactly
/// the context the selector needs to pick a different tool.
pub fn prune_messages(messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    messages
        .into_iter()
        .filter(|message| !message.is_tool() && !message.has_tool_calls())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use taskgraph_core::messages::ToolCall;

    #[test]
    fn test_prune_drops_tool_traffic_only() {
        let messages = vec![
            ChatMessage::system("system"),
            ChatMessage::user("select a tool"),
            ChatMessage::assistant_tool_calls(vec![ToolCall::new(
                "c1",
                "keyword_search",
                json!({"query": "x"}),
            )]),
            ChatMessage::tool("bulky results", "c1"),
            ChatMessage::assistant("the answer"),
            ChatMessage::assistant("{\"is_completed\":false,\"critique\":\"thin\"}"),
        ];

        let pruned = prune_messages(messages);

        assert_eq!(pruned.len(), 4);
        assert!(pruned.iter().all(|m| !m.is_tool()));
        assert!(pruned.iter().all(|m| !m.has_tool_calls()));
        assert_eq!(pruned[3].content(), Some("{\"is_completed\":false,\"critique\":\"thin\"}"));
    }

    #[test]
    fn test_states_round_trip_through_value() {
        let state = SubtaskState {
            question: "q".to_string(),
            plan: vec!["a".to_string()],
            subtask: "a".to_string(),
            challenge_count: 2,
            is_completed: true,
            subtask_answer: "done".to_string(),
            ..SubtaskState::default()
        };

        let value = serde_json::to_value(&state).unwrap();
        let back: SubtaskState = serde_json::from_value(value).unwrap();
        assert_eq!(back.challenge_count, 2);
        assert!(back.is_completed);
        assert_eq!(back.subtask_answer, "done");
    }

    #[test]
    fn test_subtask_schema_appends_rounds() {
        let schema = subtask_schema();
        let mut state = serde_json::to_value(SubtaskState::default()).unwrap();

        schema
            .apply(&mut state, &json!({"tool_results": [[{"name": "t", "arguments": {}, "results": []}]]}))
            .unwrap();
        schema
            .apply(&mut state, &json!({"tool_results": [[{"name": "t", "arguments": {}, "results": []}]]}))
            .unwrap();

        assert_eq!(state["tool_results"].as_array().unwrap().len(), 2);
    }
}
