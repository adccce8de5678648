//! Run the help desk agent against live backends.
//!
//! Expects provider settings in the environment (see `llm::Settings`) and
//! the search backends on their default local ports:
//!
//! ```text
//! API_KEY=... cargo run --example helpdesk -- "How do I fix ERR-404?"
//! ```

use anyhow::Result;
use llm::{client_from_settings, Settings};
use std::sync::Arc;
use taskgraph_agents::HelpdeskAgent;
use tooling::{KeywordSearchTool, SemanticSearchTool, ToolRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let question = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "What does ERR-404 mean and how do I fix it?".to_string());

    let settings = Settings::from_env()?;
    let model = client_from_settings(&settings)?;

    let registry = Arc::new(
        ToolRegistry::new()
            .with_handler(Arc::new(KeywordSearchTool::new(
                "http://localhost:9200",
                "documents",
            )))
            .with_handler(Arc::new(SemanticSearchTool::new(
                model.clone(),
                "http://localhost:6333",
                "documents",
            ))),
    );

    let agent = HelpdeskAgent::builder(model, registry)
        .with_max_challenges(settings.max_challenges)
        .build()?;

    let result = agent.run(&question).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
