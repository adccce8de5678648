//! Code execution against a sandbox backend.
//!
//! Submits a snippet to an isolated execution service and wraps its stdout
//! as a single hit, with stderr and the exit code kept in the metadata.

use crate::error::{Result, ToolError};
use crate::hits::SearchHit;
use crate::registry::ToolHandler;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use taskgraph_core::llm::ToolDefinition;
use tracing::info;

#[derive(Debug, Deserialize)]
struct SandboxArgs {
    code: String,
}

#[derive(Debug, Deserialize)]
struct SandboxResponse {
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
    #[serde(default)]
    exit_code: i32,
}

/// Executes code in a sandbox service (`{base}/execute`).
pub struct CodeSandboxTool {
    base_url: String,
    client: Client,
}

impl CodeSandboxTool {
    /// Create a tool against the given sandbox service.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ToolHandler for CodeSandboxTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "run_code",
            "Execute a Python snippet in an isolated sandbox and return its output. Use for calculations and data inspection.",
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Python source to execute"
                }
            },
            "required": ["code"],
            "additionalProperties": false
        }))
    }

    async fn invoke(&self, arguments: Value) -> Result<Vec<SearchHit>> {
        let args: SandboxArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        info!(bytes = args.code.len(), "submitting code to sandbox");

        let response = self
            .client
            .post(format!("{}/execute", self.base_url))
            .json(&json!({"code": args.code}))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::Backend { status, body });
        }

        let run: SandboxResponse = response.json().await?;
        if run.exit_code != 0 {
            return Err(ToolError::Execution(format!(
                "sandbox exited with {}: {}",
                run.exit_code, run.stderr
            )));
        }

        Ok(vec![SearchHit::new(
            "sandbox",
            1.0,
            run.stdout,
            json!({"stderr": run.stderr, "exit_code": run.exit_code}),
        )])
    }
}
