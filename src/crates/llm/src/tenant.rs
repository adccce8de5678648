//! Tenant provider client.
//!
//! Talks to a tenant-scoped endpoint where models are addressed by
//! deployment name in the URL path and an `api-version` query parameter:
//!
//! ```text
//! {endpoint}/openai/deployments/{deployment}/chat/completions?api-version=...
//! {endpoint}/openai/deployments/{embedding_deployment}/embeddings?api-version=...
//! ```
//!
//! Authentication uses the `api-key` header. The request body is the same
//! as on the direct path, with the model field omitted since the
//! deployment name already pins it.

use crate::config::Settings;
use crate::error::{LlmError, Result};
use crate::wire::{CompletionBody, CompletionResponse, EmbeddingBody, EmbeddingResponse};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use taskgraph_core::llm::{ChatModel, ChatRequest, ModelError, StructuredFormat};
use taskgraph_core::messages::ChatMessage;
use tracing::debug;

/// Client for the tenant provider path.
#[derive(Clone)]
pub struct TenantClient {
    api_key: String,
    endpoint: String,
    deployment_id: String,
    embedding_deployment_id: Option<String>,
    api_version: String,
    client: Client,
}

impl TenantClient {
    /// Create a client from validated settings.
    pub fn new(settings: &Settings) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| LlmError::Config("tenant provider requires api_key".to_string()))?;
        let endpoint = settings
            .tenant_endpoint
            .clone()
            .ok_or_else(|| LlmError::Config("tenant provider requires tenant_endpoint".to_string()))?;
        let deployment_id = settings.tenant_deployment_id.clone().ok_or_else(|| {
            LlmError::Config("tenant provider requires tenant_deployment_id".to_string())
        })?;

        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(LlmError::Http)?;

        Ok(Self {
            api_key,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            deployment_id,
            embedding_deployment_id: settings.tenant_embedding_deployment_id.clone(),
            api_version: settings.tenant_api_version.clone(),
            client,
        })
    }

    fn deployment_url(&self, deployment: &str, operation: &str) -> String {
        format!(
            "{}/openai/deployments/{}/{}",
            self.endpoint, deployment, operation
        )
    }

    async fn post_completion(&self, body: &CompletionBody) -> Result<CompletionResponse> {
        debug!(deployment = %self.deployment_id, "sending chat completion request");

        let response = self
            .client
            .post(self.deployment_url(&self.deployment_id, "chat/completions"))
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", &self.api_key)
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
impl ChatModel for TenantClient {
    async fn complete(&self, request: ChatRequest) -> std::result::Result<ChatMessage, ModelError> {
        let body = CompletionBody::new(None, &request, None);
        let response = self.post_completion(&body).await?;
        Ok(response.into_assistant_message()?)
    }

    async fn parse(
        &self,
        request: ChatRequest,
        format: StructuredFormat,
    ) -> std::result::Result<Value, ModelError> {
        let body = CompletionBody::new(None, &request, Some(&format));
        let response = self.post_completion(&body).await?;
        Ok(response.into_parsed_value()?)
    }

    async fn embed(&self, input: &str) -> std::result::Result<Vec<f32>, ModelError> {
        let deployment = self.embedding_deployment_id.clone().ok_or_else(|| {
            ModelError::Call(
                "tenant provider has no tenant_embedding_deployment_id configured".to_string(),
            )
        })?;

        let body = EmbeddingBody {
            model: None,
            input: input.to_string(),
        };

        let response = self
            .client
            .post(self.deployment_url(&deployment, "embeddings"))
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", &self.api_key)
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
