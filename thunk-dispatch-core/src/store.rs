//! Centralized state store with reducer pattern

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use serde_json::Value;

use crate::action::{Notification, ThunkReturn};
use crate::config::StoreConfig;
use crate::error::ThunkResult;
use crate::listener;
use crate::logger::ActionLoggerMiddleware;
use crate::model::{traverse, Model, Plugin, RegisteredReducer};
use crate::path;
use crate::registry::{ActionCreator, ActionTree, Internals, PluginsState};
use crate::thunk_on::{RegisteredAction, ThunkOnPlugin};

/// A handler invocation passed through [`StoreHandle::invoke`].
pub type Thunk<'a> = Box<dyn FnOnce() -> ThunkResult<ThunkReturn> + 'a>;

/// The store operations reactive actions rely on.
///
/// [`Store`] is the standard implementation. Anything implementing this trait
/// can be bound into [`References`], which is how tests and hot-reload swap
/// the store a reactive action talks to.
pub trait StoreHandle: Send + Sync {
    /// Send a notification to reducers, middleware and listeners.
    fn dispatch(&self, notification: Notification) -> Notification;

    /// Run a handler so that middleware can observe the call itself.
    fn invoke(&self, action_type: &str, thunk: Thunk<'_>) -> ThunkResult<ThunkReturn>;

    /// The full state tree.
    fn get_state(&self) -> Value;
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

struct Shared {
    store: RwLock<Option<Weak<dyn StoreHandle>>>,
    internals: RwLock<Internals>,
    plugins_state: RwLock<PluginsState>,
}

/// Registries plus a rebindable pointer to the current store.
///
/// Owned by the store. Action creators keep only a [`WeakReferences`], so the
/// registries that hold the creators never keep the store alive.
#[derive(Clone)]
pub struct References {
    shared: Arc<Shared>,
}

impl Default for References {
    fn default() -> Self {
        Self::new()
    }
}

impl References {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                store: RwLock::new(None),
                internals: RwLock::new(Internals::default()),
                plugins_state: RwLock::new(PluginsState::default()),
            }),
        }
    }

    /// Point reactive actions at `store`. Later calls resolve to it.
    pub fn bind<S: StoreHandle + 'static>(&self, store: &Arc<S>) {
        let store: Arc<dyn StoreHandle> = store.clone();
        *write(&self.shared.store) = Some(Arc::downgrade(&store));
    }

    /// The store currently bound, if it is still alive.
    pub fn current_store(&self) -> Option<Arc<dyn StoreHandle>> {
        read(&self.shared.store).as_ref()?.upgrade()
    }

    pub fn internals(&self) -> RwLockReadGuard<'_, Internals> {
        read(&self.shared.internals)
    }

    pub fn internals_mut(&self) -> RwLockWriteGuard<'_, Internals> {
        write(&self.shared.internals)
    }

    pub fn plugins_state(&self) -> RwLockReadGuard<'_, PluginsState> {
        read(&self.shared.plugins_state)
    }

    pub fn plugins_state_mut(&self) -> RwLockWriteGuard<'_, PluginsState> {
        write(&self.shared.plugins_state)
    }

    pub fn downgrade(&self) -> WeakReferences {
        WeakReferences {
            shared: Arc::downgrade(&self.shared),
        }
    }
}

impl std::fmt::Debug for References {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("References")
            .field("bound", &self.current_store().is_some())
            .finish()
    }
}

/// Non-owning counterpart of [`References`].
#[derive(Clone)]
pub struct WeakReferences {
    shared: Weak<Shared>,
}

impl std::fmt::Debug for WeakReferences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakReferences")
            .field("alive", &(self.shared.strong_count() > 0))
            .finish()
    }
}

impl WeakReferences {
    pub fn upgrade(&self) -> Option<References> {
        self.shared.upgrade().map(|shared| References { shared })
    }

    /// Shortcut for upgrading and resolving the bound store.
    pub fn current_store(&self) -> Option<Arc<dyn StoreHandle>> {
        self.upgrade()?.current_store()
    }
}

/// Middleware trait for intercepting notifications and handler invocations
///
/// Implement this trait to add logging, persistence, or other
/// cross-cutting concerns to your store.
///
/// Hooks take `&self` and may run on several threads at once; keep any
/// recorded state behind your own lock. The store holds no lock while a hook
/// runs, so a hook may dispatch to the store again.
pub trait Middleware: Send + Sync {
    /// Called before the notification reaches the reducers
    fn before(&self, notification: &Notification);

    /// Called after the notification was reduced
    fn after(&self, notification: &Notification, state_changed: bool);

    /// Called before a reactive action's handler runs
    fn before_invoke(&self, _action_type: &str) {}

    /// Called once the handler returned (a pending result has not settled yet)
    fn after_invoke(&self, _action_type: &str, _result: &ThunkResult<ThunkReturn>) {}
}

/// A no-op middleware that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMiddleware;

impl Middleware for NoopMiddleware {
    fn before(&self, _notification: &Notification) {}
    fn after(&self, _notification: &Notification, _state_changed: bool) {}
}

/// Middleware that logs notifications (for debugging)
#[derive(Debug, Clone, Default)]
pub struct LoggingMiddleware {
    /// Whether to log before dispatch
    pub log_before: bool,
    /// Whether to log after dispatch
    pub log_after: bool,
}

impl LoggingMiddleware {
    /// Create a new logging middleware with default settings (log after only)
    pub fn new() -> Self {
        Self {
            log_before: false,
            log_after: true,
        }
    }

    /// Create a logging middleware that logs both before and after
    pub fn verbose() -> Self {
        Self {
            log_before: true,
            log_after: true,
        }
    }
}

impl Middleware for LoggingMiddleware {
    fn before(&self, notification: &Notification) {
        if self.log_before {
            tracing::debug!(action = %notification.action_type, "Dispatching action");
        }
    }

    fn after(&self, notification: &Notification, state_changed: bool) {
        if self.log_after {
            tracing::debug!(
                action = %notification.action_type,
                state_changed = state_changed,
                "Action processed"
            );
        }
    }

    fn before_invoke(&self, action_type: &str) {
        if self.log_before {
            tracing::debug!(action = %action_type, "Invoking handler");
        }
    }
}

/// Compose multiple middleware into a single middleware
#[derive(Default)]
pub struct ComposedMiddleware {
    middlewares: Vec<Box<dyn Middleware>>,
}

impl std::fmt::Debug for ComposedMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposedMiddleware")
            .field("middlewares_count", &self.middlewares.len())
            .finish()
    }
}

impl ComposedMiddleware {
    /// Create a new composed middleware
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    /// Add a middleware to the composition
    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Box::new(middleware));
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

impl Middleware for ComposedMiddleware {
    fn before(&self, notification: &Notification) {
        for middleware in &self.middlewares {
            middleware.before(notification);
        }
    }

    fn after(&self, notification: &Notification, state_changed: bool) {
        // Call in reverse order for proper nesting
        for middleware in self.middlewares.iter().rev() {
            middleware.after(notification, state_changed);
        }
    }

    fn before_invoke(&self, action_type: &str) {
        for middleware in &self.middlewares {
            middleware.before_invoke(action_type);
        }
    }

    fn after_invoke(&self, action_type: &str, result: &ThunkResult<ThunkReturn>) {
        for middleware in self.middlewares.iter().rev() {
            middleware.after_invoke(action_type, result);
        }
    }
}

/// Centralized state store
///
/// Holds the state tree, the reducers of the model's plain actions and the
/// registries reactive actions are recorded in. All methods take `&self`;
/// the store is shared behind an `Arc` and may be re-entered from handlers
/// and listeners.
///
/// # Example
/// ```ignore
/// let model = Model::new()
///     .state("count", json!(0))
///     .action("increment", |state, _| {
///         state["count"] = json!(state["count"].as_i64().unwrap_or(0) + 1);
///         true
///     })
///     .thunk_on(
///         "onIncrement",
///         ReactiveAction::sync(|_, _, helpers| Ok(helpers.get_store_state()["count"].clone()))
///             .targets(["@action.increment"]),
///     );
///
/// let store = Store::builder(model).build();
/// store.action_creator("@action.increment").unwrap().call(json!(null))?;
/// assert_eq!(store.state(), json!({"count": 1}));
/// ```
pub struct Store {
    name: String,
    state: Mutex<Value>,
    reducers: HashMap<String, RegisteredReducer>,
    middleware: ComposedMiddleware,
    references: References,
}

impl Store {
    /// Start building a store from a model.
    pub fn builder(model: Model) -> StoreBuilder {
        StoreBuilder::new(model)
    }

    /// Dispatch a notification to the store
    pub fn dispatch(&self, notification: Notification) -> Notification {
        StoreHandle::dispatch(self, notification)
    }

    /// A snapshot of the current state
    pub fn state(&self) -> Value {
        lock(&self.state).clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up any registered action creator by type.
    pub fn action_creator(&self, action_type: &str) -> Option<ActionCreator> {
        self.references
            .internals()
            .action_creator_dict
            .get(action_type)
            .cloned()
    }

    /// Plain action creators by model path.
    pub fn action_creators(&self) -> ActionTree {
        self.references.internals().action_creators.clone()
    }

    /// Reactive action creators by model path.
    pub fn listener_action_creators(&self) -> ActionTree {
        self.references
            .plugins_state()
            .listener
            .listener_action_creators
            .clone()
    }

    /// The reactive action creator registered at a model path.
    pub fn listener_action_creator(&self, path: &[String]) -> Option<ActionCreator> {
        self.references
            .plugins_state()
            .listener
            .listener_action_creators
            .creator(path)
            .cloned()
    }

    /// Registered reactive actions in registration order.
    pub fn listener_definitions(&self) -> Vec<RegisteredAction> {
        self.references
            .plugins_state()
            .listener
            .listener_definitions
            .clone()
    }

    pub fn references(&self) -> &References {
        &self.references
    }

    fn reduce(&self, notification: &Notification) -> bool {
        let Some(registered) = self.reducers.get(&notification.action_type) else {
            return false;
        };

        let mut state = lock(&self.state);
        match path::get_mut(&registered.parent_path, &mut state) {
            Some(slice) => (registered.reducer)(slice, &notification.payload),
            None => {
                tracing::warn!(
                    store = %self.name,
                    action = %notification.action_type,
                    "no state at the action's model path"
                );
                false
            }
        }
    }
}

impl StoreHandle for Store {
    fn dispatch(&self, notification: Notification) -> Notification {
        self.middleware.before(&notification);
        let changed = self.reduce(&notification);
        self.middleware.after(&notification, changed);

        listener::notify(&self.references, &notification);
        notification
    }

    fn invoke(&self, action_type: &str, thunk: Thunk<'_>) -> ThunkResult<ThunkReturn> {
        self.middleware.before_invoke(action_type);
        let result = thunk();
        self.middleware.after_invoke(action_type, &result);
        result
    }

    fn get_state(&self) -> Value {
        self.state()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.name)
            .field("reducers", &self.reducers.len())
            .finish()
    }
}

/// Builder for [`Store`].
///
/// The thunk-on plugin is always installed first; plugins added here are
/// consulted after it.
pub struct StoreBuilder {
    model: Model,
    config: StoreConfig,
    plugins: Vec<Box<dyn Plugin>>,
    middleware: ComposedMiddleware,
}

impl StoreBuilder {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            config: StoreConfig::default(),
            plugins: Vec::new(),
            middleware: ComposedMiddleware::new(),
        }
    }

    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn plugin<P: Plugin + 'static>(mut self, plugin: P) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.add(middleware);
        self
    }

    /// Walk the model and create the store.
    pub fn build(self) -> Arc<Store> {
        let references = References::new();

        let mut plugins: Vec<Box<dyn Plugin>> = vec![Box::new(ThunkOnPlugin::new(
            self.config.injections.clone(),
        ))];
        plugins.extend(self.plugins);

        let traversal = traverse(&self.model, &plugins, &references);

        let mut middleware = ComposedMiddleware::new();
        if let Some(log) = self.config.log.clone() {
            middleware.add(ActionLoggerMiddleware::new(log));
        }
        if !self.middleware.is_empty() {
            middleware.add(self.middleware);
        }

        let store = Arc::new(Store {
            name: self.config.name,
            state: Mutex::new(traversal.initial_state),
            reducers: traversal.reducers,
            middleware,
            references: references.clone(),
        });
        references.bind(&store);

        tracing::debug!(
            store = %store.name,
            actions = store.reducers.len(),
            reactive_actions = references.plugins_state().listener.listener_definitions.len(),
            "store created"
        );
        store
    }
}
