//! Provider configuration.
//!
//! [`Settings`] covers both provider paths: a *direct* endpoint addressed
//! by API key and model id, and a *tenant* endpoint addressed by deployment
//! names with an `api-version` query parameter. `from_env` mirrors the
//! usual `.env` driven setup; the struct also derives `Deserialize` for
//! file-driven configuration.

use crate::error::{LlmError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL_ID: &str = "gpt-4o-2024-08-06";
const DEFAULT_EMBEDDING_MODEL_ID: &str = "text-embedding-3-small";
const DEFAULT_TENANT_API_VERSION: &str = "2024-12-01-preview";

/// Which provider path to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// API-key endpoint with canonical model names.
    #[default]
    Direct,

    /// Tenant-scoped endpoint where the model identifier is a deployment
    /// name.
    Tenant,
}

/// Configuration for the model clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Provider path selection.
    #[serde(default)]
    pub provider: Provider,

    /// API key (direct: bearer token; tenant: `api-key` header).
    pub api_key: Option<String>,

    /// Base URL for the direct provider.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model identifier for the direct provider.
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Embedding model identifier for the direct provider.
    #[serde(default = "default_embedding_model_id")]
    pub embedding_model_id: String,

    /// Tenant endpoint, e.g. `https://my-tenant.example.com`.
    pub tenant_endpoint: Option<String>,

    /// Chat deployment name on the tenant endpoint.
    pub tenant_deployment_id: Option<String>,

    /// Embedding deployment name on the tenant endpoint.
    pub tenant_embedding_deployment_id: Option<String>,

    /// API version query parameter for the tenant endpoint.
    #[serde(default = "default_tenant_api_version")]
    pub tenant_api_version: String,

    /// Retry budget for the sub-task critique loop.
    #[serde(default = "default_max_challenges")]
    pub max_challenges: u32,

    /// HTTP request timeout.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: Provider::Direct,
            api_key: None,
            api_base: default_api_base(),
            model_id: default_model_id(),
            embedding_model_id: default_embedding_model_id(),
            tenant_endpoint: None,
            tenant_deployment_id: None,
            tenant_embedding_deployment_id: None,
            tenant_api_version: default_tenant_api_version(),
            max_challenges: default_max_challenges(),
            timeout: default_timeout(),
        }
    }
}

impl Settings {
    /// Load settings from environment variables.
    ///
    /// Recognised variables: `PROVIDER`, `API_KEY`, `API_BASE`, `MODEL_ID`,
    /// `EMBEDDING_MODEL_ID`, `TENANT_ENDPOINT`, `TENANT_DEPLOYMENT_ID`,
    /// `TENANT_EMBEDDING_DEPLOYMENT_ID`, `TENANT_API_VERSION`,
    /// `MAX_CHALLENGES`. When `PROVIDER` is unset, a populated
    /// `TENANT_ENDPOINT` selects the tenant path.
    pub fn from_env() -> Result<Self> {
        let mut settings = Self {
            api_key: env_opt("API_KEY"),
            tenant_endpoint: env_opt("TENANT_ENDPOINT"),
            tenant_deployment_id: env_opt("TENANT_DEPLOYMENT_ID"),
            tenant_embedding_deployment_id: env_opt("TENANT_EMBEDDING_DEPLOYMENT_ID"),
            ..Self::default()
        };

        if let Some(base) = env_opt("API_BASE") {
            settings.api_base = base;
        }
        if let Some(model) = env_opt("MODEL_ID") {
            settings.model_id = model;
        }
        if let Some(model) = env_opt("EMBEDDING_MODEL_ID") {
            settings.embedding_model_id = model;
        }
        if let Some(version) = env_opt("TENANT_API_VERSION") {
            settings.tenant_api_version = version;
        }
        if let Some(raw) = env_opt("MAX_CHALLENGES") {
            settings.max_challenges = raw
                .parse()
                .map_err(|_| LlmError::Config(format!("MAX_CHALLENGES is not a number: {raw}")))?;
        }

        settings.provider = match env_opt("PROVIDER").as_deref() {
            Some("direct") => Provider::Direct,
            Some("tenant") => Provider::Tenant,
            Some(other) => {
                return Err(LlmError::Config(format!("unknown provider '{other}'")));
            }
            None if settings.tenant_endpoint.is_some() => Provider::Tenant,
            None => Provider::Direct,
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Check that the selected provider path has its required fields.
    pub fn validate(&self) -> Result<()> {
        match self.provider {
            Provider::Direct => {
                if self.api_key.is_none() {
                    return Err(LlmError::Config(
                        "direct provider requires api_key".to_string(),
                    ));
                }
            }
            Provider::Tenant => {
                if self.api_key.is_none() {
                    return Err(LlmError::Config(
                        "tenant provider requires api_key".to_string(),
                    ));
                }
                if self.tenant_endpoint.is_none() || self.tenant_deployment_id.is_none() {
                    return Err(LlmError::Config(
                        "tenant provider requires tenant_endpoint and tenant_deployment_id"
                            .to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

fn default_embedding_model_id() -> String {
    DEFAULT_EMBEDDING_MODEL_ID.to_string()
}

fn default_tenant_api_version() -> String {
    DEFAULT_TENANT_API_VERSION.to_string()
}

fn default_max_challenges() -> u32 {
    3
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}
