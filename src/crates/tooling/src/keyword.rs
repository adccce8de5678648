//! Keyword search over a full-text index backend.

use crate::error::{Result, ToolError};
use crate::hits::SearchHit;
use crate::registry::ToolHandler;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use taskgraph_core::llm::ToolDefinition;
use tracing::info;

const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, Deserialize)]
struct KeywordArgs {
    query: String,
}

/// Full-text match query against a search index (`{base}/{index}/_search`).
pub struct KeywordSearchTool {
    base_url: String,
    index: String,
    top_k: usize,
    client: Client,
}

impl KeywordSearchTool {
    /// Create a tool querying the given index.
    pub fn new(base_url: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            index: index.into(),
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
impl ToolHandler for KeywordSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "keyword_search",
            "Search the document index by keywords. Best for exact terms such as error codes or product names.",
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Keywords to search for"
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }))
    }

    async fn invoke(&self, arguments: Value) -> Result<Vec<SearchHit>> {
        let args: KeywordArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        info!(query = %args.query, "keyword search");

        let body = json!({
            "query": {"match": {"content": args.query}},
            "size": self.top_k,
        });

        let response = self
            .client
            .post(format!("{}/{}/_search", self.base_url, self.index))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::Backend { status, body });
        }

        let parsed: Value = response.json().await?;
        let rows = parsed["hits"]["hits"].as_array().cloned().unwrap_or_default();

        info!(hits = rows.len(), "keyword search finished");
        Ok(rows.iter().map(SearchHit::from_index_hit).collect())
    }
}
