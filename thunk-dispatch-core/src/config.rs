//! Store configuration

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::logger::ActionLoggerConfig;

/// Environment variable holding comma-separated include patterns for the action logger.
pub const LOG_INCLUDE_ENV: &str = "THUNK_DISPATCH_LOG";
/// Environment variable holding comma-separated exclude patterns for the action logger.
pub const LOG_EXCLUDE_ENV: &str = "THUNK_DISPATCH_LOG_EXCLUDE";

/// Values handed untouched to every reactive action through its helpers.
///
/// Typically an API client or some other service the handlers need. The value
/// is type-erased; handlers recover it with [`Injections::get`].
///
/// ```
/// use thunk_dispatch_core::config::Injections;
///
/// struct Api { base_url: &'static str }
///
/// let injections = Injections::new(Api { base_url: "https://example.test" });
/// assert_eq!(injections.get::<Api>().unwrap().base_url, "https://example.test");
/// assert!(injections.get::<String>().is_none());
/// ```
#[derive(Clone, Default)]
pub struct Injections(Option<Arc<dyn Any + Send + Sync>>);

impl Injections {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Some(Arc::new(value)))
    }

    /// Borrow the injected value as `T`.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.as_deref()?.downcast_ref::<T>()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

impl fmt::Debug for Injections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injections")
            .field("present", &self.0.is_some())
            .finish()
    }
}

/// Configuration for [`StoreBuilder`](crate::store::StoreBuilder).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Name used in log output.
    pub name: String,
    /// Passed through to every reactive action.
    pub injections: Injections,
    /// Install an action logger with this filter.
    pub log: Option<ActionLoggerConfig>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "thunk-dispatch".to_string(),
            injections: Injections::default(),
            log: None,
        }
    }
}

impl StoreConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the injections.
    pub fn with_injections(mut self, injections: Injections) -> Self {
        self.injections = injections;
        self
    }

    /// Enable action logging.
    pub fn with_log(mut self, log: ActionLoggerConfig) -> Self {
        self.log = Some(log);
        self
    }

    /// Default config with action logging taken from the environment.
    ///
    /// Logging is enabled when either [`LOG_INCLUDE_ENV`] or
    /// [`LOG_EXCLUDE_ENV`] is set.
    pub fn from_env() -> Self {
        let include = std::env::var(LOG_INCLUDE_ENV).ok();
        let exclude = std::env::var(LOG_EXCLUDE_ENV).ok();
        Self::default().with_log_patterns(include.as_deref(), exclude.as_deref())
    }

    fn with_log_patterns(mut self, include: Option<&str>, exclude: Option<&str>) -> Self {
        if include.is_some() || exclude.is_some() {
            self.log = Some(ActionLoggerConfig::new(include, exclude));
        }
        self
    }
}
