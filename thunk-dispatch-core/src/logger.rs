//! Action logging with pattern-based filtering and in-memory storage
//!
//! Provides configurable notification logging using glob patterns to
//! include/exclude specific action types. Supports both tracing output and an
//! in-memory ring buffer that can be inspected while the store runs.
//!
//! # Example
//!
//! ```ignore
//! use thunk_dispatch_core::logger::{ActionLogConfig, ActionLoggerConfig, ActionLoggerMiddleware};
//!
//! // Only reactive actions, tracing only
//! let middleware = ActionLoggerMiddleware::new(ActionLoggerConfig::new(Some("@thunkOn.*"), None));
//!
//! // Keep the last 100 entries in memory
//! let middleware = ActionLoggerMiddleware::with_log(ActionLogConfig::default());
//! let log = middleware.log().unwrap();
//!
//! let store = Store::builder(model).middleware(middleware).build();
//! for entry in log.lock().unwrap().recent(10) {
//!     println!("{}: {}", entry.elapsed_display(), entry.summary);
//! }
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::action::{Notification, ThunkReturn};
use crate::error::ThunkResult;
use crate::store::{lock, Middleware};

/// Longest payload summary kept in a log entry.
const SUMMARY_LIMIT: usize = 120;

/// Configuration for action logging with glob pattern filtering.
///
/// Patterns support:
/// - `*` matches any sequence of characters
/// - `?` matches any single character
/// - Literal text matches exactly
///
/// # Examples
///
/// - `@thunkOn.*` matches every lifecycle notification of every reactive action
/// - `*(fail)` matches only failures
/// - `@action.todos.*` matches the plain actions of the `todos` model
#[derive(Debug, Clone)]
pub struct ActionLoggerConfig {
    /// If non-empty, only log actions matching these patterns
    pub include_patterns: Vec<String>,
    /// Exclude actions matching these patterns (applied after include)
    pub exclude_patterns: Vec<String>,
}

impl Default for ActionLoggerConfig {
    fn default() -> Self {
        Self {
            include_patterns: Vec::new(),
            // Start notifications are implied by the terminal ones
            exclude_patterns: vec!["*(start)".to_string()],
        }
    }
}

impl ActionLoggerConfig {
    /// Create a new config from comma-separated pattern strings
    ///
    /// # Arguments
    /// - `include`: comma-separated glob patterns (or None for all)
    /// - `exclude`: comma-separated glob patterns (or None for default excludes)
    ///
    /// # Example
    /// ```
    /// use thunk_dispatch_core::logger::ActionLoggerConfig;
    ///
    /// let config = ActionLoggerConfig::new(Some("@thunkOn.*"), Some("*(start)"));
    /// assert!(config.should_log("@thunkOn.audit.onAdd(success)"));
    /// assert!(!config.should_log("@thunkOn.audit.onAdd(start)"));
    /// assert!(!config.should_log("@action.todos.add"));
    /// ```
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Self {
        let include_patterns = include.map(split_patterns).unwrap_or_default();

        let exclude_patterns = exclude
            .map(split_patterns)
            .unwrap_or_else(|| Self::default().exclude_patterns);

        Self {
            include_patterns,
            exclude_patterns,
        }
    }

    /// Create a config with specific pattern vectors
    pub fn with_patterns(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self {
            include_patterns: include,
            exclude_patterns: exclude,
        }
    }

    /// Check if an action type should be logged based on include/exclude patterns
    pub fn should_log(&self, action_type: &str) -> bool {
        if !self.include_patterns.is_empty()
            && !self
                .include_patterns
                .iter()
                .any(|p| glob_match(p, action_type))
        {
            return false;
        }

        !self
            .exclude_patterns
            .iter()
            .any(|p| glob_match(p, action_type))
    }
}

fn split_patterns(patterns: &str) -> Vec<String> {
    patterns
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

// ============================================================================
// In-Memory Action Log
// ============================================================================

/// What produced a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A notification went through dispatch
    Dispatch,
    /// A reactive action's handler was invoked
    Invoke,
}

/// An entry in the action log
#[derive(Debug, Clone)]
pub struct ActionLogEntry {
    pub kind: EntryKind,
    pub action_type: String,
    /// Payload (and result or error) rendered as compact JSON
    pub summary: String,
    pub timestamp: Instant,
    /// Sequence number for ordering
    pub sequence: u64,
    /// Whether the notification changed state, `None` for invocations
    pub state_changed: Option<bool>,
}

impl ActionLogEntry {
    pub fn new(kind: EntryKind, action_type: &str, summary: String, sequence: u64) -> Self {
        Self {
            kind,
            action_type: action_type.to_string(),
            summary,
            timestamp: Instant::now(),
            sequence,
            state_changed: None,
        }
    }

    /// Time since this entry was logged
    pub fn elapsed(&self) -> std::time::Duration {
        self.timestamp.elapsed()
    }

    /// Format the elapsed time for display (e.g., "2.3s", "150ms")
    pub fn elapsed_display(&self) -> String {
        let elapsed = self.elapsed();
        if elapsed.as_secs() >= 1 {
            format!("{:.1}s", elapsed.as_secs_f64())
        } else {
            format!("{}ms", elapsed.as_millis())
        }
    }
}

/// Configuration for the action log ring buffer
#[derive(Debug, Clone)]
pub struct ActionLogConfig {
    /// Maximum number of entries to keep
    pub capacity: usize,
    pub filter: ActionLoggerConfig,
}

impl Default for ActionLogConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            filter: ActionLoggerConfig::default(),
        }
    }
}

impl ActionLogConfig {
    /// Create with custom capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Create with custom capacity and filter
    pub fn new(capacity: usize, filter: ActionLoggerConfig) -> Self {
        Self { capacity, filter }
    }
}

/// In-memory ring buffer of recent notifications and invocations
///
/// Older entries are discarded once capacity is reached.
#[derive(Debug, Clone)]
pub struct ActionLog {
    entries: VecDeque<ActionLogEntry>,
    config: ActionLogConfig,
    next_sequence: u64,
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::new(ActionLogConfig::default())
    }
}

impl ActionLog {
    pub fn new(config: ActionLogConfig) -> Self {
        Self {
            entries: VecDeque::with_capacity(config.capacity),
            config,
            next_sequence: 0,
        }
    }

    /// Log a notification (if it passes the filter)
    ///
    /// Returns the entry if it was logged, None if filtered out.
    pub fn log(&mut self, notification: &Notification) -> Option<&ActionLogEntry> {
        self.push(
            EntryKind::Dispatch,
            &notification.action_type,
            summarize(notification),
        )
        .map(|entry| &*entry)
    }

    /// Log a notification once reducers ran, together with their outcome.
    pub fn log_reduced(&mut self, notification: &Notification, state_changed: bool) -> Option<&ActionLogEntry> {
        let entry = self.push(
            EntryKind::Dispatch,
            &notification.action_type,
            summarize(notification),
        )?;
        entry.state_changed = Some(state_changed);
        Some(&*entry)
    }

    /// Log a handler invocation (if it passes the filter)
    pub fn log_invoke(&mut self, action_type: &str) -> Option<&ActionLogEntry> {
        self.push(EntryKind::Invoke, action_type, String::new())
            .map(|entry| &*entry)
    }

    fn push(&mut self, kind: EntryKind, action_type: &str, summary: String) -> Option<&mut ActionLogEntry> {
        if !self.config.filter.should_log(action_type) {
            return None;
        }

        let entry = ActionLogEntry::new(kind, action_type, summary, self.next_sequence);
        self.next_sequence += 1;

        if self.entries.len() >= self.config.capacity {
            self.entries.pop_front();
        }

        self.entries.push_back(entry);
        self.entries.back_mut()
    }

    /// Get all entries (oldest first)
    pub fn entries(&self) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter()
    }

    /// Get the most recent N entries (newest first)
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter().rev().take(count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn config(&self) -> &ActionLogConfig {
        &self.config
    }
}

fn summarize(notification: &Notification) -> String {
    let mut summary = notification.payload.to_string();
    if let Some(result) = &notification.result {
        summary.push_str(" => ");
        summary.push_str(&result.to_string());
    }
    if let Some(error) = &notification.error {
        summary.push_str(" !! ");
        summary.push_str(&error.to_string());
    }
    if summary.chars().count() > SUMMARY_LIMIT {
        summary = summary.chars().take(SUMMARY_LIMIT).collect();
        summary.push('…');
    }
    summary
}

/// Action log shared between the middleware and whoever reads it.
pub type SharedActionLog = Arc<Mutex<ActionLog>>;

// ============================================================================
// Middleware
// ============================================================================

/// Middleware that logs notifications with configurable pattern filtering.
///
/// Supports two modes:
/// - **Tracing only** (default): logs via `tracing::debug!()`
/// - **With storage**: also stores entries in a shared [`ActionLog`]
///
/// Stored notifications are written in `after`, so each entry carries the
/// state change of its own dispatch even when dispatches overlap.
#[derive(Debug, Clone)]
pub struct ActionLoggerMiddleware {
    config: ActionLoggerConfig,
    log: Option<SharedActionLog>,
    active: bool,
}

impl ActionLoggerMiddleware {
    /// Create a new action logger middleware with tracing only
    pub fn new(config: ActionLoggerConfig) -> Self {
        Self {
            config,
            log: None,
            active: true,
        }
    }

    /// Create middleware with in-memory storage
    pub fn with_log(config: ActionLogConfig) -> Self {
        Self {
            config: config.filter.clone(),
            log: Some(Arc::new(Mutex::new(ActionLog::new(config)))),
            active: true,
        }
    }

    /// Create with no filtering (logs everything), tracing only
    pub fn log_all() -> Self {
        Self::new(ActionLoggerConfig::with_patterns(vec![], vec![]))
    }

    /// Set whether the middleware is active.
    ///
    /// When inactive all hooks are no-ops.
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Handle to the action log (if storage is enabled)
    pub fn log(&self) -> Option<SharedActionLog> {
        self.log.clone()
    }

    pub fn config(&self) -> &ActionLoggerConfig {
        &self.config
    }
}

impl Middleware for ActionLoggerMiddleware {
    fn before(&self, notification: &Notification) {
        if !self.active || !self.config.should_log(&notification.action_type) {
            return;
        }
        match &notification.error {
            Some(error) => tracing::debug!(
                action = %notification.action_type,
                error = %error,
                "action"
            ),
            None => tracing::debug!(action = %notification.action_type, "action"),
        }
    }

    fn after(&self, notification: &Notification, state_changed: bool) {
        if !self.active {
            return;
        }
        if let Some(log) = &self.log {
            lock(log).log_reduced(notification, state_changed);
        }
    }

    fn before_invoke(&self, action_type: &str) {
        if !self.active {
            return;
        }
        if self.config.should_log(action_type) {
            tracing::debug!(action = %action_type, "invoke");
        }
        if let Some(log) = &self.log {
            lock(log).log_invoke(action_type);
        }
    }

    fn after_invoke(&self, action_type: &str, result: &ThunkResult<ThunkReturn>) {
        if !self.active || !self.config.should_log(action_type) {
            return;
        }
        match result {
            Ok(ThunkReturn::Pending(_)) => tracing::trace!(action = %action_type, "handler pending"),
            Ok(ThunkReturn::Ready(_)) => tracing::trace!(action = %action_type, "handler returned"),
            Err(error) => tracing::trace!(action = %action_type, error = %error, "handler raised"),
        }
    }
}

/// Simple glob pattern matching supporting `*` and `?`.
///
/// - `*` matches zero or more characters
/// - `?` matches exactly one character
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    glob_match_impl(&pattern, &text)
}

fn glob_match_impl(pattern: &[char], text: &[char]) -> bool {
    let mut pi = 0;
    let mut ti = 0;
    let mut star_pi = None;
    let mut star_ti = 0;

    while ti < text.len() {
        if pi < pattern.len() && (pattern[pi] == '?' || pattern[pi] == text[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < pattern.len() && pattern[pi] == '*' {
            star_pi = Some(pi);
            star_ti = ti;
            pi += 1;
        } else if let Some(spi) = star_pi {
            pi = spi + 1;
            star_ti += 1;
            ti = star_ti;
        } else {
            return false;
        }
    }

    while pi < pattern.len() && pattern[pi] == '*' {
        pi += 1;
    }

    pi == pattern.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ThunkError;
    use serde_json::json;

    #[test]
    fn test_glob_match_lifecycle_types() {
        assert!(glob_match("@thunkOn.*", "@thunkOn.audit.onAdd"));
        assert!(glob_match("*(fail)", "@thunkOn.audit.onAdd(fail)"));
        assert!(!glob_match("*(fail)", "@thunkOn.audit.onAdd(success)"));
        assert!(glob_match("@action.todos.???", "@action.todos.add"));
        assert!(!glob_match("@action.todos.???", "@action.todos.remove"));
        assert!(glob_match("*", ""));
    }

    #[test]
    fn test_config_default_skips_start() {
        let config = ActionLoggerConfig::default();
        assert!(!config.should_log("@thunkOn.audit.onAdd(start)"));
        assert!(config.should_log("@thunkOn.audit.onAdd(success)"));
        assert!(config.should_log("@action.todos.add"));
    }

    #[test]
    fn test_config_include_and_exclude() {
        let config = ActionLoggerConfig::new(Some("@thunkOn.*, @action.todos.*"), Some("*(fail)"));
        assert!(config.should_log("@thunkOn.audit.onAdd"));
        assert!(config.should_log("@action.todos.add"));
        assert!(!config.should_log("@thunkOn.audit.onAdd(fail)"));
        assert!(!config.should_log("@action.user.login"));
    }

    #[test]
    fn test_config_empty_exclude_logs_all() {
        let config = ActionLoggerConfig::new(None, Some(""));
        assert!(config.exclude_patterns.is_empty());
        assert!(config.should_log("@thunkOn.x(start)"));
    }

    #[test]
    fn test_action_log_capacity() {
        let mut log = ActionLog::new(ActionLogConfig::with_capacity(2));
        for n in 0..3 {
            log.log(&Notification::new(format!("@action.n{n}"), json!(n)));
        }

        let types: Vec<_> = log.entries().map(|e| e.action_type.as_str()).collect();
        assert_eq!(types, vec!["@action.n1", "@action.n2"]);
        assert_eq!(log.recent(1).next().unwrap().sequence, 2);
    }

    #[test]
    fn test_action_log_filtering() {
        let mut log = ActionLog::default();
        assert!(log.log(&Notification::new("@thunkOn.a(start)", json!(null))).is_none());
        assert!(log.is_empty());

        let entry = log
            .log(&Notification::with_error("@thunkOn.a(fail)", json!(1), ThunkError::msg("boom")))
            .unwrap();
        assert_eq!(entry.kind, EntryKind::Dispatch);
        assert_eq!(entry.summary, "1 !! boom");
    }

    #[test]
    fn test_summary_is_truncated() {
        let long = "x".repeat(500);
        let summary = summarize(&Notification::new("a", json!(long)));
        assert_eq!(summary.chars().count(), SUMMARY_LIMIT + 1);
        assert!(summary.ends_with('…'));
    }

    #[test]
    fn test_middleware_records_state_changed() {
        let middleware = ActionLoggerMiddleware::with_log(ActionLogConfig::default());
        let log = middleware.log().unwrap();

        let notification = Notification::with_result("@thunkOn.a", json!(null), json!(2));
        middleware.before(&notification);
        middleware.after(&notification, false);
        middleware.before_invoke("@thunkOn.b");

        let log = log.lock().unwrap();
        let entries: Vec<_> = log.entries().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].summary, "null => 2");
        assert_eq!(entries[0].state_changed, Some(false));
        assert_eq!(entries[1].kind, EntryKind::Invoke);
    }

    #[test]
    fn test_overlapping_dispatches_keep_their_state_change() {
        let middleware = ActionLoggerMiddleware::with_log(ActionLogConfig::default());
        let log = middleware.log().unwrap();

        let first = Notification::new("@action.first", json!(1));
        let second = Notification::new("@action.second", json!(2));
        middleware.before(&first);
        middleware.before(&second);
        middleware.after(&first, true);
        middleware.after(&second, false);

        let log = log.lock().unwrap();
        let logged: Vec<_> = log
            .entries()
            .map(|e| (e.action_type.as_str(), e.state_changed))
            .collect();
        assert_eq!(
            logged,
            vec![("@action.first", Some(true)), ("@action.second", Some(false))]
        );
    }

    #[test]
    fn test_log_reduced_respects_filter() {
        let mut log = ActionLog::default();
        let start = Notification::new("@thunkOn.a(start)", json!(null));
        assert!(log.log_reduced(&start, true).is_none());

        let entry = log
            .log_reduced(&Notification::new("@action.a", json!(null)), true)
            .unwrap();
        assert_eq!(entry.state_changed, Some(true));
        assert_eq!(log.config().capacity, 100);
    }

    #[test]
    fn test_inactive_middleware() {
        let middleware = ActionLoggerMiddleware::with_log(ActionLogConfig::default()).active(false);
        assert!(!middleware.is_active());
        let notification = Notification::new("@action.a", json!(null));
        middleware.before(&notification);
        middleware.after(&notification, true);
        middleware.before_invoke("@thunkOn.b");
        assert!(middleware.log().unwrap().lock().unwrap().is_empty());
    }

    #[test]
    fn test_log_all_has_no_filter() {
        let middleware = ActionLoggerMiddleware::log_all();
        assert!(middleware.is_active());
        assert!(middleware.log().is_none());
        assert!(middleware.config().include_patterns.is_empty());
        assert!(middleware.config().exclude_patterns.is_empty());
        assert!(middleware.config().should_log("@thunkOn.a(start)"));

        let filtered = ActionLoggerMiddleware::new(ActionLoggerConfig::default());
        assert!(!filtered.config().should_log("@thunkOn.a(start)"));
    }
}
