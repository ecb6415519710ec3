pub mod task;
pub mod user;

pub use task::{Task, TaskInput, TaskListQuery, TaskUpdate};
pub use user::{User, UserUpdate};

use crate::error::AppError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Turns a raw JSON object into a typed partial update, refusing any key outside `allowed`.
///
/// The whole request is rejected when a single key is not allowed, so nothing is written.
pub fn parse_update<T: DeserializeOwned>(
    body: Map<String, Value>,
    allowed: &[&str],
) -> Result<T, AppError> {
    if !body.keys().all(|key| allowed.contains(&key.as_str())) {
        return Err(AppError::BadRequest("Invalid updates".into()));
    }
    serde_json::from_value(Value::Object(body)).map_err(|e| AppError::BadRequest(e.to_string()))
}
