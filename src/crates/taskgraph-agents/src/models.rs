//! Data model of an agent run.
//!
//! The structured-output shapes ([`Plan`], [`Reflection`]) keep their JSON
//! schemas next to the types so the planner and reflector nodes request
//! exactly the shape they deserialise.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use taskgraph_core::llm::StructuredFormat;
use tooling::SearchHit;

/// Ordered sub-task descriptions produced by the planner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    /// Sub-tasks in execution order.
    pub subtasks: Vec<String>,
}

impl Plan {
    /// Response schema for the planner's structured completion.
    pub fn response_format() -> StructuredFormat {
        StructuredFormat::new(
            "plan",
            json!({
                "type": "object",
                "properties": {
                    "subtasks": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Sub-tasks that together resolve the question, in execution order"
                    }
                },
                "required": ["subtasks"],
                "additionalProperties": false
            }),
        )
    }
}

/// Structured self-critique of a sub-task answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reflection {
    /// True when the answer is judged sufficient.
    pub is_completed: bool,

    /// What is missing or should be retried when not completed.
    pub critique: String,
}

impl Reflection {
    /// Response schema for the reflector's structured completion.
    pub fn response_format() -> StructuredFormat {
        StructuredFormat::new(
            "reflection",
            json!({
                "type": "object",
                "properties": {
                    "is_completed": {
                        "type": "boolean",
                        "description": "Whether the answer fully covers the sub-task"
                    },
                    "critique": {
                        "type": "string",
                        "description": "What is missing, or empty when completed"
                    }
                },
                "required": ["is_completed", "critique"],
                "additionalProperties": false
            }),
        )
    }
}

/// One executed tool call with its results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolInvocationResult {
    /// Tool name.
    pub name: String,

    /// Arguments the model supplied.
    pub arguments: Value,

    /// Hits returned by the handler.
    pub results: Vec<SearchHit>,
}

/// Outcome of one sub-task loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubtaskResult {
    /// The plan entry this sub-task executed.
    pub description: String,

    /// Tool invocations, one inner list per critique round.
    pub tool_results: Vec<Vec<ToolInvocationResult>>,

    /// One reflection per critique round.
    pub reflection_results: Vec<Reflection>,

    /// Whether the loop ended by a completed reflection (as opposed to
    /// budget exhaustion).
    pub is_completed: bool,

    /// Final answer for the sub-task.
    pub answer: String,

    /// Number of critique rounds run.
    pub challenge_count: u32,
}

/// Result of a full agent run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentResult {
    /// The question the run answered.
    pub question: String,

    /// The plan the question was decomposed into.
    pub plan: Vec<String>,

    /// Per-plan-entry outcomes, in plan order.
    pub subtasks: Vec<SubtaskResult>,

    /// The fused, user-visible answer.
    pub answer: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_schema_requires_subtasks() {
        let format = Plan::response_format();
        assert_eq!(format.name, "plan");
        assert_eq!(format.schema["required"], json!(["subtasks"]));
    }

    #[test]
    fn test_reflection_round_trips_through_json() {
        let reflection = Reflection {
            is_completed: false,
            critique: "needs the resolution steps".to_string(),
        };

        let encoded = serde_json::to_string(&reflection).unwrap();
        let decoded: Reflection = serde_json::from_str(&encoded).unwrap();
        assert_eq!(reflection, decoded);
    }

    #[test]
    fn test_subtask_result_serialization() {
        let result = SubtaskResult {
            description: "look up ERR-404".to_string(),
            tool_results: vec![vec![ToolInvocationResult {
                name: "keyword_search".to_string(),
                arguments: json!({"query": "ERR-404"}),
                results: vec![SearchHit::new("doc-1", 1.0, "not found error", json!({}))],
            }]],
            reflection_results: vec![Reflection {
                is_completed: true,
                critique: String::new(),
            }],
            is_completed: true,
            answer: "ERR-404 means not found.".to_string(),
            challenge_count: 1,
        };

        let encoded = serde_json::to_value(&result).unwrap();
        let decoded: SubtaskResult = serde_json::from_value(encoded).unwrap();
        assert_eq!(result, decoded);
    }
}
