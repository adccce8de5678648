//! State schema and reducer system for graph workflows.
//!
//! Graph state is a JSON object. Each field of the state has a merge rule
//! (a *reducer*) that decides how a node's delta combines with the current
//! value. Reducers are what make concurrent fan-out branches composable:
//! every branch returns a small delta, and the engine folds the deltas into
//! the shared state in a deterministic order at the super-step barrier.
//!
//! Three reducers cover the patterns this engine needs:
//!
//! | Reducer | Behavior | Use case |
//! |---------|----------|----------|
//! | [`OverwriteReducer`] | last write wins | plain values, answers |
//! | [`AppendReducer`] | concatenate arrays | accumulated results, message logs |
//! | [`MaxReducer`] | keep the larger number | counters that must not regress |
//!
//! # Example
//!
//! ```rust
//! use taskgraph_core::state::{AppendReducer, OverwriteReducer, StateSchema};
//! use serde_json::json;
//!
//! let mut schema = StateSchema::new();
//! schema.add_field("answer", Box::new(OverwriteReducer));
//! schema.add_field("results", Box::new(AppendReducer));
//!
//! let mut state = json!({"answer": "", "results": [1]});
//! schema.apply(&mut state, &json!({"answer": "done", "results": [2]})).unwrap();
//!
//! assert_eq!(state["answer"], "done");
//! assert_eq!(state["results"], json!([1, 2]));
//! ```

use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur while merging state.
#[derive(Debug, Error)]
pub enum StateError {
    /// State or update was not a JSON object.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A reducer received incompatible value types.
    #[error("reducer error: {0}")]
    Reducer(String),
}

pub type Result<T> = std::result::Result<T, StateError>;

/// Merge rule for a single state field.
pub trait Reducer: Send + Sync {
    /// Combine the current value (possibly `Null` when unset) with an update.
    fn reduce(&self, current: &Value, update: &Value) -> Result<Value>;

    /// Human-readable name, used in error messages.
    fn name(&self) -> &str;
}

/// Replaces the current value with the update.
#[derive(Debug, Clone)]
pub struct OverwriteReducer;

impl Reducer for OverwriteReducer {
    fn reduce(&self, _current: &Value, update: &Value) -> Result<Value> {
        Ok(update.clone())
    }

    fn name(&self) -> &str {
        "overwrite"
    }
}

/// Concatenates array updates onto the current array.
///
/// A `Null` current value is treated as an empty array, so append fields do
/// not need to be pre-seeded. A non-array update is pushed as one element.
#[derive(Debug, Clone)]
pub struct AppendReducer;

impl Reducer for AppendReducer {
    fn reduce(&self, current: &Value, update: &Value) -> Result<Value> {
        match (current, update) {
            (Value::Array(curr), Value::Array(upd)) => {
                let mut merged = curr.clone();
                merged.extend_from_slice(upd);
                Ok(Value::Array(merged))
            }
            (Value::Null, Value::Array(upd)) => Ok(Value::Array(upd.clone())),
            (Value::Array(curr), single) => {
                let mut merged = curr.clone();
                merged.push(single.clone());
                Ok(Value::Array(merged))
            }
            (Value::Null, single) => Ok(Value::Array(vec![single.clone()])),
            _ => Err(StateError::Reducer(
                "append reducer requires array values".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        "append"
    }
}

/// Keeps the maximum of the current and updated integer values.
///
/// Used for monotone counters: a stale or out-of-order write can never move
/// the value backwards.
#[derive(Debug, Clone)]
pub struct MaxReducer;

impl Reducer for MaxReducer {
    fn reduce(&self, current: &Value, update: &Value) -> Result<Value> {
        match (current, update) {
            (Value::Number(a), Value::Number(b)) => {
                match (a.as_i64(), b.as_i64()) {
                    (Some(a), Some(b)) => Ok(Value::Number(a.max(b).into())),
                    _ => Err(StateError::Reducer(
                        "max reducer requires integer values".to_string(),
                    )),
                }
            }
            (Value::Null, Value::Number(_)) => Ok(update.clone()),
            _ => Err(StateError::Reducer(
                "max reducer requires integer values".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        "max"
    }
}

/// Per-field merge rules for a graph's state.
///
/// Fields without an explicit reducer fall back to overwrite semantics.
#[derive(Default)]
pub struct StateSchema {
    fields: HashMap<String, Box<dyn Reducer>>,
}

impl StateSchema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reducer for a field.
    pub fn add_field(&mut self, field: impl Into<String>, reducer: Box<dyn Reducer>) {
        self.fields.insert(field.into(), reducer);
    }

    /// Builder-style variant of [`add_field`](Self::add_field).
    pub fn with_field(mut self, field: impl Into<String>, reducer: Box<dyn Reducer>) -> Self {
        self.add_field(field, reducer);
        self
    }

    /// Apply a node delta to the state in place.
    ///
    /// Every key in `update` is merged through its field reducer; keys
    /// without a registered reducer overwrite.
    pub fn apply(&self, state: &mut Value, update: &Value) -> Result<()> {
        let state_obj = state
            .as_object_mut()
            .ok_or_else(|| StateError::InvalidState("state must be an object".to_string()))?;

        let update_obj = update
            .as_object()
            .ok_or_else(|| StateError::InvalidState("update must be an object".to_string()))?;

        for (field, update_value) in update_obj {
            let current = state_obj.get(field).cloned().unwrap_or(Value::Null);

            let merged = match self.fields.get(field) {
                Some(reducer) => reducer.reduce(&current, update_value).map_err(|e| {
                    StateError::Reducer(format!("field '{}' ({}): {}", field, reducer.name(), e))
                })?,
                None => update_value.clone(),
            };

            state_obj.insert(field.clone(), merged);
        }

        Ok(())
    }
}
