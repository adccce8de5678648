//! Chat message types shared by the engine, the model clients, and the
//! agents.
//!
//! A [`ChatMessage`] is a tagged sum over the four conversation roles.
//! Serialization uses `role` as the tag, so a message serialises directly
//! into the chat-completion wire shape:
//!
//! ```json
//! {"role": "assistant", "tool_calls": [{"id": "call_1", "name": "search", "arguments": {"query": "ERR-404"}}]}
//! {"role": "tool", "content": "...", "tool_call_id": "call_1"}
//! ```
//!
//! Code that builds conversations must keep the pairing invariant: every
//! tool message is preceded by an assistant message whose `tool_calls`
//! contains the matching id.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Provider-assigned call id, echoed back on the tool message.
    pub id: String,

    /// Registered tool name.
    pub name: String,

    /// Arguments matching the tool's declared parameter schema.
    pub arguments: Value,
}

impl ToolCall {
    /// Create a tool call.
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// One turn of a conversation, tagged by role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatMessage {
    /// Instructions that frame the conversation.
    System {
        /// Message text.
        content: String,
    },

    /// End-user (or orchestrator-injected) input.
    User {
        /// Message text.
        content: String,
    },

    /// Model output: text, tool calls, or both.
    Assistant {
        /// Response text, absent on pure tool-call turns.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,

        /// Tool invocations requested by the model.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },

    /// Result of one tool invocation, linked back by call id.
    Tool {
        /// Stringified tool output.
        content: String,

        /// Id of the [`ToolCall`] this answers.
        tool_call_id: String,
    },
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    /// Create a plain assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// Create an assistant message carrying only tool calls.
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant {
            content: None,
            tool_calls,
        }
    }

    /// Create a tool result message.
    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    /// Role tag as it appears on the wire.
    pub fn role(&self) -> &'static str {
        match self {
            Self::System { .. } => "system",
            Self::User { .. } => "user",
            Self::Assistant { .. } => "assistant",
            Self::Tool { .. } => "tool",
        }
    }

    /// Message text, if this role carries any.
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::System { content } | Self::User { content } | Self::Tool { content, .. } => {
                Some(content)
            }
            Self::Assistant { content, .. } => content.as_deref(),
        }
    }

    /// True for tool result messages.
    pub fn is_tool(&self) -> bool {
        matches!(self, Self::Tool { .. })
    }

    /// True for assistant messages that request at least one tool call.
    pub fn has_tool_calls(&self) -> bool {
        matches!(self, Self::Assistant { tool_calls, .. } if !tool_calls.is_empty())
    }

    /// Tool calls on an assistant message, empty otherwise.
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}
