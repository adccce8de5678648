//! Chat-completion wire format shared by both provider paths.
//!
//! Both the direct and the tenant endpoints speak the same body format;
//! they differ only in URL shape and auth headers. This module holds the
//! serde types for that body plus the conversions between the wire shapes
//! and the crate-level [`ChatMessage`] type. The one mismatch to bridge:
//! tool-call arguments are a JSON *string* on the wire but a parsed
//! [`serde_json::Value`] everywhere else.

use crate::error::{LlmError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use taskgraph_core::llm::{ChatRequest, StructuredFormat};
use taskgraph_core::messages::{ChatMessage, ToolCall};

/// Request body for `chat/completions`.
#[derive(Debug, Serialize)]
pub struct CompletionBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<WireMessage>,
    pub temperature: f32,
    pub seed: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<Value>,
}

impl CompletionBody {
    /// Build a body from a request, optionally pinning a model id and a
    /// structured response format.
    pub fn new(
        model: Option<&str>,
        request: &ChatRequest,
        format: Option<&StructuredFormat>,
    ) -> Self {
        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .tools
                    .iter()
                    .map(|tool| {
                        json!({
                            "type": "function",
                            "function": {
                                "name": tool.name,
                                "description": tool.description,
                                "parameters": tool.parameters,
                            }
                        })
                    })
                    .collect(),
            )
        };

        let response_format = format.map(|f| {
            json!({
                "type": "json_schema",
                "json_schema": {
                    "name": f.name,
                    "schema": f.schema,
                    "strict": true,
                }
            })
        });

        Self {
            model: model.map(str::to_string),
            messages: request.messages.iter().map(WireMessage::from).collect(),
            temperature: request.temperature,
            seed: request.seed,
            tools,
            response_format,
        }
    }
}

/// A message as serialised on the wire.
#[derive(Debug, Serialize)]
pub struct WireMessage {
    pub role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: WireFunction,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireFunction {
    pub name: String,
    /// JSON-encoded argument object.
    pub arguments: String,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        match message {
            ChatMessage::System { content } => Self {
                role: "system",
                content: Some(content.clone()),
                tool_calls: None,
                tool_call_id: None,
            },
            ChatMessage::User { content } => Self {
                role: "user",
                content: Some(content.clone()),
                tool_calls: None,
                tool_call_id: None,
            },
            ChatMessage::Assistant {
                content,
                tool_calls,
            } => Self {
                role: "assistant",
                content: content.clone(),
                tool_calls: if tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        tool_calls
                            .iter()
                            .map(|call| WireToolCall {
                                id: call.id.clone(),
                                kind: "function".to_string(),
                                function: WireFunction {
                                    name: call.name.clone(),
                                    arguments: call.arguments.to_string(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: None,
            },
            ChatMessage::Tool {
                content,
                tool_call_id,
            } => Self {
                role: "tool",
                content: Some(content.clone()),
                tool_calls: None,
                tool_call_id: Some(tool_call_id.clone()),
            },
        }
    }
}

/// Response body of `chat/completions`.
#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default)]
    pub refusal: Option<String>,
}

impl CompletionResponse {
    fn into_first_message(self) -> Result<ResponseMessage> {
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| LlmError::InvalidResponse("response carried no choices".to_string()))
    }

    /// Convert the first choice into an assistant [`ChatMessage`].
    pub fn into_assistant_message(self) -> Result<ChatMessage> {
        let message = self.into_first_message()?;

        let tool_calls = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                let arguments: Value =
                    serde_json::from_str(&call.function.arguments).map_err(|e| {
                        LlmError::InvalidResponse(format!(
                            "tool call '{}' carried invalid arguments: {}",
                            call.function.name, e
                        ))
                    })?;
                Ok(ToolCall::new(call.id, call.function.name, arguments))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ChatMessage::Assistant {
            content: message.content,
            tool_calls,
        })
    }

    /// Extract the structured payload of the first choice.
    pub fn into_parsed_value(self) -> Result<Value> {
        let message = self.into_first_message()?;

        if let Some(refusal) = message.refusal {
            return Err(LlmError::NullParse(format!("model refused: {refusal}")));
        }

        let content = message
            .content
            .filter(|c| !c.is_empty() && c != "null")
            .ok_or_else(|| LlmError::NullParse("structured response was empty".to_string()))?;

        serde_json::from_str(&content)
            .map_err(|e| LlmError::NullParse(format!("structured response was not JSON: {e}")))
    }
}

/// Request body for the embeddings endpoint.
#[derive(Debug, Serialize)]
pub struct EmbeddingBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub input: String,
}

/// Response body of the embeddings endpoint.
#[derive(Debug, Deserialize)]
pub struct EmbeddingResponse {
    pub data: Vec<EmbeddingRow>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingRow {
    pub embedding: Vec<f32>,
}

impl EmbeddingResponse {
    /// Extract the first embedding vector.
    pub fn into_vector(self) -> Result<Vec<f32>> {
        self.data
            .into_iter()
            .next()
            .map(|row| row.embedding)
            .ok_or_else(|| LlmError::InvalidResponse("embedding response was empty".to_string()))
    }
}
