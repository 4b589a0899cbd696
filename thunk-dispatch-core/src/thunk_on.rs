//! Reactive actions: handlers wrapped in a start/success/fail lifecycle
//!
//! A [`ReactiveAction`] placed in a [`Model`](crate::model::Model) is turned
//! into an [`ActionCreator`] when the store is built. Calling the creator
//!
//! 1. dispatches `{type: "<type>(start)", payload}`,
//! 2. runs the handler through [`StoreHandle::invoke`],
//! 3. dispatches `{type: "<type>(success)", payload, result}` then
//!    `{type, payload, result}` once the result is available, or
//!    `{type: "<type>(fail)", payload, error}` then `{type, payload, error}`
//!    if the handler failed.
//!
//! The combined `type` is `@thunkOn.` followed by the dot-joined model path.
//! A handler may answer synchronously ([`ThunkReturn::Ready`] or `Err`) or
//! with a future ([`ThunkReturn::Pending`]); in the latter case the terminal
//! notifications are sent when the returned future settles.
//!
//! # Example
//!
//! ```ignore
//! let on_todo_added = ReactiveAction::future(|_actions, target, helpers| async move {
//!     let api = helpers.injections().get::<Api>().cloned();
//!     api.record(&target["payload"]).await?;
//!     Ok(json!("recorded"))
//! })
//! .targets(["@action.todos.add"]);
//!
//! let model = Model::new()
//!     .model("todos", Model::new().state("items", json!([])).action("add", add_todo))
//!     .model("audit", Model::new().thunk_on("onTodoAdded", on_todo_added));
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::Value;

use crate::action::{LifecycleTypes, Notification, ThunkReturn};
use crate::config::Injections;
use crate::error::{ThunkError, ThunkResult};
use crate::model::{ModelNode, Plugin, VisitorResult};
use crate::path::{self, Meta};
use crate::registry::{ActionCreator, ActionTree};
use crate::store::{References, StoreHandle, WeakReferences};

/// Payload key that receives a copy of the declared targets.
pub const RESOLVED_TARGETS_KEY: &str = "resolvedTargets";

type HandlerFn = dyn Fn(ActionTree, Value, Helpers) -> ThunkResult<ThunkReturn> + Send + Sync;

/// A handler together with the action types it reacts to.
///
/// The handler receives the plain action creators of its parent model, the
/// payload, and the [`Helpers`].
#[derive(Clone)]
pub struct ReactiveAction {
    handler: Arc<HandlerFn>,
    resolved_targets: Option<Vec<String>>,
}

impl ReactiveAction {
    /// Wrap a handler that picks its own return shape.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(ActionTree, Value, Helpers) -> ThunkResult<ThunkReturn> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            resolved_targets: None,
        }
    }

    /// Wrap a handler that always answers synchronously.
    pub fn sync<F>(handler: F) -> Self
    where
        F: Fn(ActionTree, Value, Helpers) -> ThunkResult<Value> + Send + Sync + 'static,
    {
        Self::new(move |actions, payload, helpers| {
            handler(actions, payload, helpers).map(ThunkReturn::Ready)
        })
    }

    /// Wrap an async handler. Its result is always pending.
    pub fn future<F, Fut>(handler: F) -> Self
    where
        F: Fn(ActionTree, Value, Helpers) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ThunkResult<Value>> + Send + 'static,
    {
        Self::new(move |actions, payload, helpers| {
            Ok(ThunkReturn::Pending(handler(actions, payload, helpers).boxed()))
        })
    }

    /// Declare the action types this reactive action listens to.
    ///
    /// An empty list still counts as declared: invocations then carry an
    /// empty `resolvedTargets`.
    pub fn targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resolved_targets = Some(targets.into_iter().map(Into::into).collect());
        self
    }

    /// The declared targets, `None` if [`targets`](Self::targets) was never called.
    pub fn resolved_targets(&self) -> Option<&[String]> {
        self.resolved_targets.as_deref()
    }

    /// Whether a notification of `action_type` should fire this action.
    pub fn listens_to(&self, action_type: &str) -> bool {
        self.resolved_targets
            .iter()
            .flatten()
            .any(|t| t == action_type)
    }
}

impl fmt::Debug for ReactiveAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveAction")
            .field("resolved_targets", &self.resolved_targets)
            .finish_non_exhaustive()
    }
}

/// Record of a registered reactive action.
#[derive(Debug, Clone)]
pub struct RegisteredAction {
    pub action_type: String,
    pub action_name: String,
    pub parent: Vec<String>,
    pub path: Vec<String>,
    pub definition: ReactiveAction,
}

/// The part of [`Meta`] handlers get to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperMeta {
    pub key: String,
    pub parent: Vec<String>,
    pub path: Vec<String>,
}

/// Helper state fixed when the reactive action is registered.
#[derive(Debug)]
pub struct HelperContext {
    meta: HelperMeta,
    injections: Injections,
    references: WeakReferences,
}

impl HelperContext {
    pub fn new(meta: &Meta, references: &References, injections: Injections) -> Arc<Self> {
        Arc::new(Self {
            meta: HelperMeta {
                key: meta.key.clone(),
                parent: meta.parent_path.clone(),
                path: meta.path.clone(),
            },
            injections,
            references: references.downgrade(),
        })
    }
}

/// Third argument of every handler.
///
/// `dispatch` and `get_store_state` talk to the store that was current when
/// the call started. `get_state` and `get_store_actions` read whatever is
/// current at the time they are called.
#[derive(Clone)]
pub struct Helpers {
    context: Arc<HelperContext>,
    store: Arc<dyn StoreHandle>,
}

impl Helpers {
    /// State of the model that declares this reactive action.
    pub fn get_state(&self) -> Option<Value> {
        let state = self.context.references.current_store()?.get_state();
        path::get(&self.context.meta.parent, &state).cloned()
    }

    /// The whole state tree.
    pub fn get_store_state(&self) -> Value {
        self.store.get_state()
    }

    /// All plain action creators.
    pub fn get_store_actions(&self) -> ActionTree {
        self.context
            .references
            .upgrade()
            .map(|references| references.internals().action_creators.clone())
            .unwrap_or_default()
    }

    pub fn dispatch(&self, notification: Notification) -> Notification {
        self.store.dispatch(notification)
    }

    pub fn injections(&self) -> &Injections {
        &self.context.injections
    }

    pub fn meta(&self) -> &HelperMeta {
        &self.context.meta
    }
}

impl fmt::Debug for Helpers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Helpers")
            .field("meta", &self.context.meta)
            .finish_non_exhaustive()
    }
}

/// Calls a reactive action's handler with fresh helpers.
pub struct ThunkHandler {
    definition: ReactiveAction,
    context: Arc<HelperContext>,
}

impl ThunkHandler {
    pub fn new(definition: ReactiveAction, context: Arc<HelperContext>) -> Self {
        Self {
            definition,
            context,
        }
    }

    /// Run the handler against the current store.
    ///
    /// Declared targets are copied into the payload first, so the caller sees
    /// the extended payload afterwards. With targets declared, a payload that
    /// is not a JSON object fails with [`ThunkError::PayloadNotObject`]
    /// before the handler runs.
    pub fn call(&self, payload: &mut Value) -> ThunkResult<ThunkReturn> {
        let references = self
            .context
            .references
            .upgrade()
            .ok_or(ThunkError::StoreDropped)?;
        let store = references
            .current_store()
            .ok_or(ThunkError::StoreDropped)?;

        if let Some(targets) = self.definition.resolved_targets() {
            let kind = json_kind(payload);
            let object = payload
                .as_object_mut()
                .ok_or(ThunkError::PayloadNotObject(kind))?;
            object.insert(RESOLVED_TARGETS_KEY.to_string(), Value::from(targets.to_vec()));
        }

        let actions = references
            .internals()
            .action_creators
            .subtree(&self.context.meta.parent)
            .cloned()
            .unwrap_or_default();
        let helpers = Helpers {
            context: Arc::clone(&self.context),
            store,
        };

        (self.definition.handler)(actions, payload.clone(), helpers)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Build the lifecycle action creator for a reactive action at `meta`.
pub fn create_action_creator(
    meta: &Meta,
    references: &References,
    handler: ThunkHandler,
) -> ActionCreator {
    let types = LifecycleTypes::for_path(&meta.path);
    let references = references.downgrade();
    let handler = Arc::new(handler);

    ActionCreator::with_lifecycle(types.clone(), move |payload| {
        run_lifecycle(&types, &references, &handler, payload)
    })
}

fn run_lifecycle(
    types: &LifecycleTypes,
    references: &WeakReferences,
    handler: &ThunkHandler,
    mut payload: Value,
) -> ThunkResult<ThunkReturn> {
    let Some(store) = references.current_store() else {
        tracing::warn!(action = %types.action_type, "store dropped, reactive action not run");
        return Err(ThunkError::StoreDropped);
    };

    tracing::debug!(action = %types.action_type, "reactive action started");
    store.dispatch(Notification::new(&types.start_type, payload.clone()));

    let outcome = store.invoke(&types.action_type, Box::new(|| handler.call(&mut payload)));

    match outcome {
        Ok(ThunkReturn::Ready(result)) => {
            dispatch_success(store.as_ref(), types, &payload, &result);
            Ok(ThunkReturn::Ready(result))
        }
        Ok(ThunkReturn::Pending(future)) => {
            let types = types.clone();
            let references = references.clone();
            Ok(ThunkReturn::Pending(
                async move {
                    let settled = future.await;
                    match references.current_store() {
                        Some(store) => match &settled {
                            Ok(result) => dispatch_success(store.as_ref(), &types, &payload, result),
                            Err(error) => dispatch_failure(store.as_ref(), &types, &payload, error),
                        },
                        None => tracing::warn!(
                            action = %types.action_type,
                            "store dropped before the reactive action settled"
                        ),
                    }
                    settled
                }
                .boxed(),
            ))
        }
        Err(error) => {
            dispatch_failure(store.as_ref(), types, &payload, &error);
            Err(error)
        }
    }
}

fn dispatch_success(store: &dyn StoreHandle, types: &LifecycleTypes, payload: &Value, result: &Value) {
    tracing::debug!(action = %types.action_type, "reactive action succeeded");
    store.dispatch(Notification::with_result(
        &types.success_type,
        payload.clone(),
        result.clone(),
    ));
    store.dispatch(Notification::with_result(
        &types.action_type,
        payload.clone(),
        result.clone(),
    ));
}

fn dispatch_failure(
    store: &dyn StoreHandle,
    types: &LifecycleTypes,
    payload: &Value,
    error: &ThunkError,
) {
    tracing::debug!(action = %types.action_type, error = %error, "reactive action failed");
    store.dispatch(Notification::with_error(
        &types.fail_type,
        payload.clone(),
        error.clone(),
    ));
    store.dispatch(Notification::with_error(
        &types.action_type,
        payload.clone(),
        error.clone(),
    ));
}

/// Wrap `definition` and record it in the registries.
pub fn register(
    definition: &ReactiveAction,
    meta: &Meta,
    references: &References,
    injections: Injections,
) -> ActionCreator {
    let context = HelperContext::new(meta, references, injections);
    let handler = ThunkHandler::new(definition.clone(), context);
    let creator = create_action_creator(meta, references, handler);

    references
        .internals_mut()
        .action_creator_dict
        .insert(creator.action_type().to_string(), creator.clone());

    {
        let mut plugins_state = references.plugins_state_mut();
        let listener = &mut plugins_state.listener;
        listener.listener_definitions.push(RegisteredAction {
            action_type: creator.action_type().to_string(),
            action_name: meta.key.clone(),
            parent: meta.parent_path.clone(),
            path: meta.path.clone(),
            definition: definition.clone(),
        });
        listener
            .listener_action_creators
            .set(&meta.path, creator.clone());
    }

    tracing::debug!(
        action = %creator.action_type(),
        targets = definition.resolved_targets().map_or(0, <[String]>::len),
        "reactive action registered"
    );
    creator
}

/// Plugin that registers every [`ModelNode::ThunkOn`] it is shown.
#[derive(Debug, Clone, Default)]
pub struct ThunkOnPlugin {
    injections: Injections,
}

impl ThunkOnPlugin {
    pub fn new(injections: Injections) -> Self {
        Self { injections }
    }
}

impl Plugin for ThunkOnPlugin {
    fn name(&self) -> &'static str {
        "thunk-on"
    }

    fn model_visitor(
        &self,
        node: &ModelNode,
        meta: &Meta,
        references: &References,
    ) -> VisitorResult {
        match node {
            ModelNode::ThunkOn(definition) => {
                register(definition, meta, references, self.injections.clone());
                VisitorResult::Terminal
            }
            _ => VisitorResult::Default,
        }
    }
}
