//! Semantic search over a vector store backend.
//!
//! The query is embedded through the shared model client, then matched
//! against a collection by nearest-neighbour lookup. Useful where keyword
//! search misses paraphrases.

use crate::error::{Result, ToolError};
use crate::hits::SearchHit;
use crate::registry::ToolHandler;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use taskgraph_core::llm::{ChatModel, ToolDefinition};
use tracing::info;

const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, Deserialize)]
struct SemanticArgs {
    query: String,
}

/// Nearest-neighbour query against a vector store
/// (`{base}/collections/{collection}/points/query`).
pub struct SemanticSearchTool {
    model: Arc<dyn ChatModel>,
    base_url: String,
    collection: String,
    top_k: usize,
    client: Client,
}

impl SemanticSearchTool {
    /// Create a tool embedding queries with `model` and searching the
    /// given collection.
    pub fn new(
        model: Arc<dyn ChatModel>,
        base_url: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            model,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
            top_k: DEFAULT_TOP_K,
            client: Client::new(),
        }
    }

    /// Override the number of hits returned.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

#[async_trait]
impl ToolHandler for SemanticSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "semantic_search",
            "Search past questions and answers by meaning. Finds paraphrases and similar questions that keyword search misses.",
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Natural-language query"
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }))
    }

    async fn invoke(&self, arguments: Value) -> Result<Vec<SearchHit>> {
        let args: SemanticArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        info!(query = %args.query, "semantic search");

        let vector = self
            .model
            .embed(&args.query)
            .await
            .map_err(|e| ToolError::Embedding(e.to_string()))?;

        let body = json!({
            "query": vector,
            "limit": self.top_k,
            "with_payload": true,
        });

        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/query",
                self.base_url, self.collection
            ))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::Backend { status, body });
        }

        let parsed: Value = response.json().await?;
        let points = parsed["result"]["points"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        info!(hits = points.len(), "semantic search finished");
        Ok(points.iter().map(SearchHit::from_point).collect())
    }
}
