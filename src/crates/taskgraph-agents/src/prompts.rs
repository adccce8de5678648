//! Prompt templates for the agent's model calls.
//!
//! Templates are plain strings with `{question}`, `{plan}`, `{subtask}`,
//! and `{subtask_results}` placeholders, substituted by the render
//! helpers. All templates can be overridden at agent construction.

use serde::{Deserialize, Serialize};

/// The prompt set used by the planner, the sub-task loop, and the
/// summariser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPrompts {
    /// System prompt of the planner call.
    pub planner_system: String,

    /// User prompt template of the planner call (`{question}`).
    pub planner_user: String,

    /// System prompt shared by all sub-task loop calls.
    pub subtask_system: String,

    /// User prompt template of the first tool-selection call
    /// (`{question}`, `{plan}`, `{subtask}`).
    pub tool_selection_user: String,

    /// User prompt appended on a retry round.
    pub retry_user: String,

    /// User prompt appended before each reflection.
    pub reflection_user: String,

    /// System prompt of the final summariser call.
    pub summary_system: String,

    /// User prompt template of the final summariser call (`{question}`,
    /// `{plan}`, `{subtask_results}`).
    pub summary_user: String,
}

impl Default for AgentPrompts {
    fn default() -> Self {
        Self {
            planner_system: "You are a help desk planning assistant. Break the user's \
                question into the smallest set of independent research sub-tasks. \
                Each sub-task must be answerable with one or two searches."
                .to_string(),
            planner_user: "Question: {question}\n\nProduce the ordered list of sub-tasks \
                needed to answer it."
                .to_string(),
            subtask_system: "You are a help desk research assistant. You answer one \
                sub-task at a time using the available search tools, and you ground \
                every statement in retrieved documents."
                .to_string(),
            tool_selection_user: "Original question: {question}\nOverall plan:\n{plan}\n\n\
                Current sub-task: {subtask}\n\nSelect the tool and arguments best \
                suited to research this sub-task."
                .to_string(),
            retry_user: "The previous answer was judged insufficient. Select a \
                different tool or different arguments and try again."
                .to_string(),
            reflection_user: "Review your answer to the sub-task. Is it sufficient \
                and fully grounded in the retrieved documents? Report what is \
                missing if it is not."
                .to_string(),
            summary_system: "You are a help desk assistant writing the final reply. \
                Fuse the sub-task findings into one clear, complete answer to the \
                user's question."
                .to_string(),
            summary_user: "Question: {question}\nPlan:\n{plan}\n\nSub-task findings:\n\
                {subtask_results}\n\nWrite the final answer."
                .to_string(),
        }
    }
}

impl AgentPrompts {
    /// Render the planner user prompt.
    pub fn render_planner_user(&self, question: &str) -> String {
        self.planner_user.replace("{question}", question)
    }

    /// Render the first-round tool selection prompt.
    pub fn render_tool_selection_user(
        &self,
        question: &str,
        plan: &[String],
        subtask: &str,
    ) -> String {
        self.tool_selection_user
            .replace("{question}", question)
            .replace("{plan}", &render_list(plan))
            .replace("{subtask}", subtask)
    }

    /// Render the summariser user prompt over (description, answer) pairs.
    pub fn render_summary_user(
        &self,
        question: &str,
        plan: &[String],
        results: &[(String, String)],
    ) -> String {
        let rendered_results = results
            .iter()
            .map(|(description, answer)| format!("- {}: {}", description, answer))
            .collect::<Vec<_>>()
            .join("\n");

        self.summary_user
            .replace("{question}", question)
            .replace("{plan}", &render_list(plan))
            .replace("{subtask_results}", &rendered_results)
    }
}

fn render_list(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| format!("{}. {}", idx + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}
