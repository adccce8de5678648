//! # taskgraph-agents
//!
//! A plan-and-execute help desk agent built on the taskgraph engine.
//!
//! Given a question, the agent plans an ordered list of research
//! sub-tasks, runs every sub-task concurrently through a bounded
//! tool-use and self-critique loop, and fuses the sub-task answers into
//! one reply. Results come back as a typed [`models::AgentResult`]; any
//! failure aborts the whole run with a typed [`error::AgentError`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use taskgraph_agents::HelpdeskAgent;
//! use tooling::{KeywordSearchTool, ToolRegistry};
//!
//! let registry = Arc::new(
//!     ToolRegistry::new()
//!         .with_handler(Arc::new(KeywordSearchTool::new("http://localhost:9200", "documents"))),
//! );
//!
//! let agent = HelpdeskAgent::new(model, registry)?;
//! let result = agent.run("How do I fix ERR-404?").await?;
//! println!("{}", result.answer);
//! ```

pub mod agent;
pub mod error;
pub mod models;
pub mod prompts;
pub mod state;

pub use agent::{HelpdeskAgent, HelpdeskAgentBuilder, DEFAULT_MAX_CHALLENGES};
pub use error::AgentError;
pub use models::{AgentResult, Plan, Reflection, SubtaskResult, ToolInvocationResult};
pub use prompts::AgentPrompts;
