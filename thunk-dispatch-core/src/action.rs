//! Notifications, action identifiers and handler return shapes

use std::fmt;

use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ThunkError, ThunkResult};

/// Prefix of every reactive action type.
pub const THUNK_ON_PREFIX: &str = "@thunkOn";

/// Prefix of every plain action type.
pub const ACTION_PREFIX: &str = "@action";

/// Build an action type from a prefix and a model path.
///
/// ```
/// use thunk_dispatch_core::action::{action_type_for, THUNK_ON_PREFIX};
///
/// let path = vec!["todos".to_string(), "onAdd".to_string()];
/// assert_eq!(action_type_for(THUNK_ON_PREFIX, &path), "@thunkOn.todos.onAdd");
/// ```
pub fn action_type_for(prefix: &str, path: &[String]) -> String {
    format!("{}.{}", prefix, path.join("."))
}

/// A message sent through the store's dispatch channel.
///
/// Start notifications carry only a payload. Success notifications carry a
/// `result`, fail notifications an `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub action_type: String,
    pub payload: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ThunkError>,
}

impl Notification {
    /// Create a notification with only a type and payload.
    pub fn new(action_type: impl Into<String>, payload: Value) -> Self {
        Self {
            action_type: action_type.into(),
            payload,
            result: None,
            error: None,
        }
    }

    /// Create a notification carrying a successful result.
    pub fn with_result(action_type: impl Into<String>, payload: Value, result: Value) -> Self {
        Self {
            result: Some(result),
            ..Self::new(action_type, payload)
        }
    }

    /// Create a notification carrying a failure.
    pub fn with_error(action_type: impl Into<String>, payload: Value, error: ThunkError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(action_type, payload)
        }
    }

    /// The notification as a JSON object (`{type, payload, result?, error?}`).
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// The four identifiers of a lifecycle-wrapped action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LifecycleTypes {
    pub action_type: String,
    pub start_type: String,
    pub success_type: String,
    pub fail_type: String,
}

impl LifecycleTypes {
    /// Derive the identifiers for a reactive action at `path`.
    pub fn for_path(path: &[String]) -> Self {
        let action_type = action_type_for(THUNK_ON_PREFIX, path);
        Self {
            start_type: format!("{action_type}(start)"),
            success_type: format!("{action_type}(success)"),
            fail_type: format!("{action_type}(fail)"),
            action_type,
        }
    }

    /// Whether `action_type` is one of these four identifiers.
    pub fn contains(&self, action_type: &str) -> bool {
        self.action_type == action_type
            || self.start_type == action_type
            || self.success_type == action_type
            || self.fail_type == action_type
    }
}

/// What a handler (and therefore an action creator) hands back.
///
/// A synchronous failure is the `Err` side of [`ThunkResult`]; a deferred
/// failure is a `Pending` future resolving to `Err`.
pub enum ThunkReturn {
    /// The result is available now.
    Ready(Value),
    /// The result settles later.
    Pending(BoxFuture<'static, ThunkResult<Value>>),
}

impl ThunkReturn {
    /// Whether the result is still deferred.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// The ready value, if any.
    pub fn ready(self) -> Option<Value> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Pending(_) => None,
        }
    }

    /// Wait for the result, whichever shape it has.
    pub async fn settle(self) -> ThunkResult<Value> {
        match self {
            Self::Ready(value) => Ok(value),
            Self::Pending(future) => future.await,
        }
    }
}

impl fmt::Debug for ThunkReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

impl From<Value> for ThunkReturn {
    fn from(value: Value) -> Self {
        Self::Ready(value)
    }
}
