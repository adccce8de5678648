//! # llm
//!
//! Model provider implementations for taskgraph.
//!
//! This crate provides concrete implementations of the
//! [`ChatModel`](taskgraph_core::llm::ChatModel) trait:
//!
//! - [`DirectClient`] for API-key endpoints with canonical model names;
//! - [`TenantClient`] for tenant-scoped endpoints where the model
//!   identifier is a deployment name.
//!
//! Both clients speak the chat-completions wire format (plain completions
//! with tool advertisement, structured completions with a JSON-schema
//! response format, embeddings) and forward the pinned temperature and
//! seed of every request unchanged.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::{client_from_settings, Settings};
//! use taskgraph_core::llm::{ChatModel, ChatRequest};
//! use taskgraph_core::messages::ChatMessage;
//!
//! let settings = Settings::from_env()?;
//! let client = client_from_settings(&settings)?;
//!
//! let reply = client
//!     .complete(ChatRequest::new(vec![ChatMessage::user("Hello!")]))
//!     .await?;
//! ```

pub mod config;
pub mod direct;
pub mod error;
pub mod tenant;
pub mod wire;

pub use config::{Provider, Settings};
pub use direct::DirectClient;
pub use error::{LlmError, Result};
pub use tenant::TenantClient;

use std::sync::Arc;
use taskgraph_core::llm::ChatModel;

/// Build the model client selected by `settings.provider`.
pub fn client_from_settings(settings: &Settings) -> Result<Arc<dyn ChatModel>> {
    settings.validate()?;
    let client: Arc<dyn ChatModel> = match settings.provider {
        Provider::Direct => Arc::new(DirectClient::new(settings)?),
        Provider::Tenant => Arc::new(TenantClient::new(settings)?),
    };
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_selects_provider() {
        let direct = Settings {
            api_key: Some("sk-test".to_string()),
            ..Settings::default()
        };
        assert!(client_from_settings(&direct).is_ok());

        let tenant = Settings {
            provider: Provider::Tenant,
            api_key: Some("key".to_string()),
            tenant_endpoint: Some("https://tenant.example.com".to_string()),
            tenant_deployment_id: Some("chat-prod".to_string()),
            ..Settings::default()
        };
        assert!(client_from_settings(&tenant).is_ok());
    }

    #[test]
    fn test_factory_rejects_invalid_settings() {
        assert!(client_from_settings(&Settings::default()).is_err());
    }
}
