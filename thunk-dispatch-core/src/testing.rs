//! Test utilities for stores and reactive actions
//!
//! - [`RecordingMiddleware`]: records everything a [`Store`](crate::Store) dispatches
//! - [`RecordingStore`]: a reducer-less [`StoreHandle`] that only records
//! - [`DispatchLog`]: the shared record both of them write to
//! - Assertion macros for verifying dispatched notifications by type pattern
//!
//! # Example
//!
//! ```ignore
//! use thunk_dispatch::testing::RecordingMiddleware;
//! use thunk_dispatch::assert_dispatched;
//!
//! let recorder = RecordingMiddleware::new();
//! let log = recorder.log();
//! let store = Store::builder(model).middleware(recorder).build();
//!
//! store.action_creator("@action.todos.add").unwrap().call(json!("docs"))?;
//!
//! assert_dispatched!(log.notifications(), "@thunkOn.audit.onAdd(success)");
//! ```

use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::action::{Notification, ThunkReturn};
use crate::error::ThunkResult;
use crate::store::{lock, Middleware, StoreHandle, Thunk};

#[derive(Debug, Default)]
struct Recorded {
    notifications: Vec<Notification>,
    state_changes: Vec<bool>,
    invocations: Vec<String>,
}

/// Shared record of dispatched notifications and handler invocations.
///
/// Cloning yields another handle to the same record.
#[derive(Debug, Clone, Default)]
pub struct DispatchLog {
    inner: Arc<Mutex<Recorded>>,
}

impl DispatchLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, notification: &Notification) {
        lock(&self.inner).notifications.push(notification.clone());
    }

    pub fn record_state_change(&self, changed: bool) {
        lock(&self.inner).state_changes.push(changed);
    }

    pub fn record_invocation(&self, action_type: &str) {
        lock(&self.inner).invocations.push(action_type.to_string());
    }

    /// Every notification, in dispatch order.
    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.inner).notifications.clone()
    }

    /// The type of every notification, in dispatch order.
    pub fn types(&self) -> Vec<String> {
        lock(&self.inner)
            .notifications
            .iter()
            .map(|n| n.action_type.clone())
            .collect()
    }

    /// Whether each reduced notification changed state.
    ///
    /// Only filled in by [`RecordingMiddleware`].
    pub fn state_changes(&self) -> Vec<bool> {
        lock(&self.inner).state_changes.clone()
    }

    /// Types of the handlers run through [`StoreHandle::invoke`].
    pub fn invocations(&self) -> Vec<String> {
        lock(&self.inner).invocations.clone()
    }

    /// How many notifications of exactly `action_type` were dispatched.
    pub fn count(&self, action_type: &str) -> usize {
        lock(&self.inner)
            .notifications
            .iter()
            .filter(|n| n.action_type == action_type)
            .count()
    }

    /// Take all notifications, leaving the log empty.
    pub fn drain(&self) -> Vec<Notification> {
        let mut recorded = lock(&self.inner);
        recorded.state_changes.clear();
        recorded.invocations.clear();
        std::mem::take(&mut recorded.notifications)
    }

    pub fn clear(&self) {
        self.drain();
    }
}

/// Middleware that writes every notification into a [`DispatchLog`].
#[derive(Debug, Clone, Default)]
pub struct RecordingMiddleware {
    log: DispatchLog,
}

impl RecordingMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the record, usable after the middleware moved into a store.
    pub fn log(&self) -> DispatchLog {
        self.log.clone()
    }
}

impl Middleware for RecordingMiddleware {
    fn before(&self, notification: &Notification) {
        self.log.record(notification);
    }

    fn after(&self, _notification: &Notification, state_changed: bool) {
        self.log.record_state_change(state_changed);
    }

    fn before_invoke(&self, action_type: &str) {
        self.log.record_invocation(action_type);
    }
}

/// A store without reducers or listeners.
///
/// Records dispatches and invocations and serves a fixed state tree. Bind it
/// into [`References`](crate::References) to exercise an action creator in
/// isolation.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use serde_json::json;
/// use thunk_dispatch_core::testing::RecordingStore;
/// use thunk_dispatch_core::{Notification, References, StoreHandle};
///
/// let references = References::new();
/// let store = Arc::new(RecordingStore::new(json!({"n": 1})));
/// references.bind(&store);
///
/// references.current_store().unwrap().dispatch(Notification::new("ping", json!(null)));
/// assert_eq!(store.log().types(), vec!["ping"]);
/// ```
#[derive(Debug, Default)]
pub struct RecordingStore {
    state: Mutex<Value>,
    log: DispatchLog,
}

impl RecordingStore {
    pub fn new(state: Value) -> Self {
        Self {
            state: Mutex::new(state),
            log: DispatchLog::new(),
        }
    }

    pub fn log(&self) -> DispatchLog {
        self.log.clone()
    }

    /// Replace the state served by [`StoreHandle::get_state`].
    pub fn set_state(&self, state: Value) {
        *lock(&self.state) = state;
    }
}

impl StoreHandle for RecordingStore {
    fn dispatch(&self, notification: Notification) -> Notification {
        self.log.record(&notification);
        notification
    }

    fn invoke(&self, action_type: &str, thunk: Thunk<'_>) -> ThunkResult<ThunkReturn> {
        self.log.record_invocation(action_type);
        thunk()
    }

    fn get_state(&self) -> Value {
        lock(&self.state).clone()
    }
}

/// Assert that a notification whose type matches a glob pattern was dispatched.
///
/// # Example
///
/// ```ignore
/// use thunk_dispatch::assert_dispatched;
///
/// let notifications = log.notifications();
/// assert_dispatched!(notifications, "@thunkOn.audit.onAdd(success)");
/// assert_dispatched!(notifications, "@action.todos.*");
/// ```
#[macro_export]
macro_rules! assert_dispatched {
    ($notifications:expr, $pattern:expr) => {{
        let notifications = &$notifications;
        assert!(
            notifications
                .iter()
                .any(|n| $crate::logger::glob_match($pattern, &n.action_type)),
            "Expected notification matching `{}` to be dispatched, but got: {:?}",
            $pattern,
            notifications
                .iter()
                .map(|n| n.action_type.as_str())
                .collect::<Vec<_>>()
        );
    }};
}

/// Assert that no notification whose type matches a glob pattern was dispatched.
///
/// # Example
///
/// ```ignore
/// use thunk_dispatch::assert_not_dispatched;
///
/// assert_not_dispatched!(log.notifications(), "*(fail)");
/// ```
#[macro_export]
macro_rules! assert_not_dispatched {
    ($notifications:expr, $pattern:expr) => {{
        let notifications = &$notifications;
        assert!(
            !notifications
                .iter()
                .any(|n| $crate::logger::glob_match($pattern, &n.action_type)),
            "Expected no notification matching `{}` to be dispatched, but got: {:?}",
            $pattern,
            notifications
                .iter()
                .map(|n| n.action_type.as_str())
                .collect::<Vec<_>>()
        );
    }};
}

/// Find the first notification whose type matches a glob pattern.
///
/// # Example
///
/// ```ignore
/// use thunk_dispatch::find_dispatched;
///
/// let notifications = log.notifications();
/// let failed = find_dispatched!(notifications, "*(fail)").unwrap();
/// assert!(failed.error.is_some());
/// ```
#[macro_export]
macro_rules! find_dispatched {
    ($notifications:expr, $pattern:expr) => {
        $notifications
            .iter()
            .find(|n| $crate::logger::glob_match($pattern, &n.action_type))
    };
}

/// Count the notifications whose type matches a glob pattern.
///
/// # Example
///
/// ```ignore
/// use thunk_dispatch::count_dispatched;
///
/// assert_eq!(count_dispatched!(log.notifications(), "@thunkOn.*"), 4);
/// ```
#[macro_export]
macro_rules! count_dispatched {
    ($notifications:expr, $pattern:expr) => {
        $notifications
            .iter()
            .filter(|n| $crate::logger::glob_match($pattern, &n.action_type))
            .count()
    };
}
