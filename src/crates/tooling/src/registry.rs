//! Tool handler trait and the process-wide registry.
//!
//! A [`ToolHandler`] advertises a [`ToolDefinition`] (name, description,
//! JSON parameter schema) and executes parsed arguments into a list of
//! [`SearchHit`]s. The [`ToolRegistry`] maps names to handlers and
//! dispatches the model's tool calls; it is populated once at startup and
//! read-only afterwards, so agents share it as `Arc<ToolRegistry>` without
//! locking.

use crate::error::{Result, ToolError};
use crate::hits::SearchHit;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use taskgraph_core::llm::ToolDefinition;
use taskgraph_core::messages::ToolCall;
use tracing::info;

/// An invocable tool.
///
/// Handlers must be pure with respect to orchestrator state: side effects
/// stay inside their own backend.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Schema advertised to the model and used for argument validation.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with parsed arguments.
    async fn invoke(&self, arguments: Value) -> Result<Vec<SearchHit>>;
}

/// Name-to-handler mapping with dispatch.
#[derive(Default)]
pub struct ToolRegistry {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its advertised name.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        self.handlers.insert(handler.definition().name, handler);
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with_handler(mut self, handler: Arc<dyn ToolHandler>) -> Self {
        self.register(handler);
        self
    }

    /// Definitions of every registered tool, for provider advertisement.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> =
            self.handlers.values().map(|h| h.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Look up a handler by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.handlers.get(name)
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True when no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Execute one tool call from the model.
    pub async fn dispatch(&self, call: &ToolCall) -> Result<Vec<SearchHit>> {
        let handler = self
            .handlers
            .get(&call.name)
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;

        info!(tool = %call.name, "dispatching tool call");
        handler.invoke(call.arguments.clone()).await
    }
}
