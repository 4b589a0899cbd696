//! Failure values carried by reactive actions

use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// Result type returned by handlers and action creators.
pub type ThunkResult<T> = Result<T, ThunkError>;

/// A failure raised by a reactive action handler.
///
/// The same value travels in the `error` field of the fail notifications and
/// back to the caller, so it is cheap to clone. Two errors compare equal when
/// they are the same failure: messages and values compare by content, wrapped
/// sources by identity.
#[derive(Debug, Clone, Error)]
pub enum ThunkError {
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Source(Arc<dyn std::error::Error + Send + Sync>),

    #[error("rejected with {0}")]
    Value(Value),

    #[error("store was dropped before the action could run")]
    StoreDropped,

    /// Targets were declared but the payload cannot carry them.
    #[error("cannot attach resolved targets to a {0} payload")]
    PayloadNotObject(&'static str),
}

impl ThunkError {
    /// Create an error from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Wrap any error type.
    pub fn source<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Source(Arc::new(error))
    }

    /// Reject with an arbitrary JSON value.
    pub fn value(value: Value) -> Self {
        Self::Value(value)
    }
}

impl PartialEq for ThunkError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Message(a), Self::Message(b)) => a == b,
            (Self::Source(a), Self::Source(b)) => Arc::ptr_eq(a, b),
            (Self::Value(a), Self::Value(b)) => a == b,
            (Self::StoreDropped, Self::StoreDropped) => true,
            (Self::PayloadNotObject(a), Self::PayloadNotObject(b)) => a == b,
            _ => false,
        }
    }
}

impl Serialize for ThunkError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(value) => value.serialize(serializer),
            other => serializer.collect_str(other),
        }
    }
}
