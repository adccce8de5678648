//! Normalised search results.
//!
//! Every tool handler returns [`SearchHit`] values regardless of which
//! backend produced them, so the agent can fold tool output into prompts
//! without caring whether it came from the keyword index, the vector
//! store, or the sandbox.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One result produced by a tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    /// Backend-specific identifier of the hit (document id, point id, ...).
    pub source: String,

    /// Relevance score as reported by the backend.
    pub score: f64,

    /// Text payload of the hit.
    pub content: String,

    /// Remaining backend fields, kept for diagnostics.
    pub metadata: Value,
}

impl SearchHit {
    /// Create a hit directly.
    pub fn new(
        source: impl Into<String>,
        score: f64,
        content: impl Into<String>,
        metadata: Value,
    ) -> Self {
        Self {
            source: source.into(),
            score,
            content: content.into(),
            metadata,
        }
    }

    /// Build a hit from a keyword-index response row
    /// (`{"_id", "_score", "_source": {"content", ...}}`).
    pub fn from_index_hit(row: &Value) -> Self {
        let mut metadata = row.get("_source").cloned().unwrap_or(Value::Null);
        let content = metadata
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if let Some(fields) = metadata.as_object_mut() {
            fields.remove("content");
        }

        Self {
            source: row
                .get("_id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            score: row.get("_score").and_then(Value::as_f64).unwrap_or(0.0),
            content,
            metadata,
        }
    }

    /// Build a hit from a vector-store point
    /// (`{"id", "score", "payload": {"content", ...}}`).
    pub fn from_point(point: &Value) -> Self {
        let mut metadata = point.get("payload").cloned().unwrap_or(Value::Null);
        let content = metadata
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if let Some(fields) = metadata.as_object_mut() {
            fields.remove("content");
        }

        let source = match point.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => String::new(),
        };

        Self {
            source,
            score: point.get("score").and_then(Value::as_f64).unwrap_or(0.0),
            content,
            metadata,
        }
    }
}
