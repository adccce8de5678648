//! Direct provider client.
//!
//! Talks to an API-key endpoint (`{api_base}/chat/completions`,
//! `{api_base}/embeddings`) with bearer authentication and canonical model
//! identifiers.

use crate::config::Settings;
use crate::error::{LlmError, Result};
use crate::wire::{CompletionBody, CompletionResponse, EmbeddingBody, EmbeddingResponse};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use taskgraph_core::llm::{ChatModel, ChatRequest, ModelError, StructuredFormat};
use taskgraph_core::messages::ChatMessage;
use tracing::debug;

/// Client for the direct provider path.
#[derive(Clone)]
pub struct DirectClient {
    api_key: String,
    api_base: String,
    model_id: String,
    embedding_model_id: String,
    client: Client,
}

impl DirectClient {
    /// Create a client from validated settings.
    pub fn new(settings: &Settings) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| LlmError::Config("direct provider requires api_key".to_string()))?;

        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(LlmError::Http)?;

        Ok(Self {
            api_key,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            model_id: settings.model_id.clone(),
            embedding_model_id: settings.embedding_model_id.clone(),
            client,
        })
    }

    async fn post_completion(&self, body: &CompletionBody) -> Result<CompletionResponse> {
        debug!(model = %self.model_id, "sending chat completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status, body));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ChatModel for DirectClient {
    async fn complete(&self, request: ChatRequest) -> std::result::Result<ChatMessage, ModelError> {
        let body = CompletionBody::new(Some(&self.model_id), &request, None);
        let response = self.post_completion(&body).await?;
        Ok(response.into_assistant_message()?)
    }

    async fn parse(
        &self,
        request: ChatRequest,
        format: StructuredFormat,
    ) -> std::result::Result<Value, ModelError> {
        let body = CompletionBody::new(Some(&self.model_id), &request, Some(&format));
        let response = self.post_completion(&body).await?;
        Ok(response.into_parsed_value()?)
    }

    async fn embed(&self, input: &str) -> std::result::Result<Vec<f32>, ModelError> {
        let body = EmbeddingBody {
            model: Some(self.embedding_model_id.clone()),
            input: input.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::Http)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status, body).into());
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(LlmError::Http)?;
        Ok(parsed.into_vector()?)
    }
}
