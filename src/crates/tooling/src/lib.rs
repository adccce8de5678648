//! # tooling
//!
//! Tool registry and concrete tool handlers for taskgraph agents.
//!
//! A [`ToolHandler`] advertises its name, description, and argument schema
//! for provider-side function calling, and executes parsed arguments into
//! normalised [`SearchHit`]s. The [`ToolRegistry`] dispatches the model's
//! tool calls to handlers by name and is read-only after initialisation.
//!
//! Bundled handlers:
//!
//! - [`KeywordSearchTool`]: full-text match query against a search index;
//! - [`SemanticSearchTool`]: embedding plus nearest-neighbour lookup
//!   against a vector store;
//! - [`CodeSandboxTool`]: snippet execution in an isolated sandbox
//!   service.

pub mod error;
pub mod hits;
pub mod keyword;
pub mod registry;
pub mod sandbox;
pub mod semantic;

pub use error::{Result, ToolError};
pub use hits::SearchHit;
pub use keyword::KeywordSearchTool;
pub use registry::{ToolHandler, ToolRegistry};
pub use sandbox::CodeSandboxTool;
pub use semantic::SemanticSearchTool;
