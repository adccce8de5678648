//! Model client traits and request types.
//!
//! The engine is an orchestration framework, not an LLM client library: it
//! defines the [`ChatModel`] trait and the request shapes, and provider
//! crates (or test stubs) implement them. Two operations cover everything
//! the agents need: a plain completion, which may answer in text or request
//! tool calls, and a structured completion constrained to a declared JSON
//! schema.
//!
//! Requests pin `temperature` and `seed` (both default to 0) so a fixed
//! (model, prompt) pair yields reproducible output. Implementations must
//! forward both unchanged.

use crate::messages::ChatMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by model client implementations.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Transport failure, provider error status, or call timeout.
    #[error("model call failed: {0}")]
    Call(String),

    /// Structured completion returned nothing or did not match the schema.
    #[error("structured parse failed: {0}")]
    Parse(String),
}

/// A tool advertised to the model for function calling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    /// Tool name as invoked by the model.
    pub name: String,

    /// Natural-language description the model selects by.
    pub description: String,

    /// JSON schema of the argument object.
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a definition with an empty parameter schema.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    /// Attach the parameter schema.
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Response schema for structured completions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredFormat {
    /// Schema name reported to the provider.
    pub name: String,

    /// JSON schema the completion must satisfy.
    pub schema: Value,
}

impl StructuredFormat {
    /// Create a named schema format.
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// A chat completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Conversation so far.
    pub messages: Vec<ChatMessage>,

    /// Tools advertised for this call. Empty disables function calling.
    pub tools: Vec<ToolDefinition>,

    /// Sampling temperature, pinned to 0 by default.
    pub temperature: f32,

    /// Sampling seed, pinned to 0 by default.
    pub seed: i64,
}

impl ChatRequest {
    /// Create a request with pinned deterministic sampling.
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
            temperature: 0.0,
            seed: 0,
        }
    }

    /// Advertise tools for this call.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Override the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Override the sampling seed.
    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = seed;
        self
    }
}

/// Chat-based language model client.
///
/// Implementations must be `Send + Sync`; agents share them as
/// `Arc<dyn ChatModel>` across concurrent sub-graphs. Apart from any HTTP
/// connection pool they own, implementations are expected to be stateless.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Plain completion. Returns the assistant message, which may carry
    /// text content, tool calls, or both.
    async fn complete(&self, request: ChatRequest) -> Result<ChatMessage, ModelError>;

    /// Structured completion constrained to `format`. Returns the parsed
    /// value; a null or non-conforming result is a [`ModelError::Parse`].
    async fn parse(&self, request: ChatRequest, format: StructuredFormat)
        -> Result<Value, ModelError>;

    /// Embed a text into a vector. Only needed by semantic-search tooling;
    /// the default declines.
    async fn embed(&self, _input: &str) -> Result<Vec<f32>, ModelError> {
        Err(ModelError::Call(
            "this model client does not support embeddings".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoModel;

    #[async_trait]
    impl ChatModel for EchoModel {
        async fn complete(&self, request: ChatRequest) -> Result<ChatMessage, ModelError> {
            let last = request
                .messages
                .last()
                .and_then(|m| m.content())
                .unwrap_or("")
                .to_string();
            Ok(ChatMessage::assistant(last))
        }

        async fn parse(
            &self,
            _request: ChatRequest,
            format: StructuredFormat,
        ) -> Result<Value, ModelError> {
            Ok(json!({"format": format.name}))
        }
    }

    #[tokio::test]
    async fn test_trait_object_usage() {
        let model: std::sync::Arc<dyn ChatModel> = std::sync::Arc::new(EchoModel);

        let reply = model
            .complete(ChatRequest::new(vec![ChatMessage::user("hello")]))
            .await
            .unwrap();
        assert_eq!(reply.content(), Some("hello"));

        let parsed = model
            .parse(
                ChatRequest::new(vec![]),
                StructuredFormat::new("plan", json!({"type": "object"})),
            )
            .await
            .unwrap();
        assert_eq!(parsed["format"], "plan");

        let err = model.embed("text").await.unwrap_err();
        assert!(matches!(err, ModelError::Call(_)));
    }

    #[test]
    fn test_request_defaults_are_pinned() {
        let request = ChatRequest::new(vec![]);
        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.seed, 0);
        assert!(request.tools.is_empty());
    }
}
