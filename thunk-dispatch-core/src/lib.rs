//! Core types for thunk-dispatch
//!
//! This crate provides a centralized state store built from a declarative
//! model, plus *reactive actions*: handlers that run whenever one of their
//! target actions is dispatched and whose every run is wrapped in
//! start/success/fail notifications.
//!
//! # Core Concepts
//!
//! - **Model**: a tree of state leaves, plain actions, reactive actions and nested models
//! - **Store**: state container that reduces plain actions and fires listeners
//! - **ReactiveAction**: handler plus target action types (`thunkOn`)
//! - **ActionCreator**: callable registered for every action, looked up by type
//! - **Middleware**: hooks around every dispatch and handler invocation
//!
//! # Basic Example
//!
//! ```ignore
//! use serde_json::json;
//! use thunk_dispatch_core::prelude::*;
//!
//! let model = Model::new()
//!     .model(
//!         "todos",
//!         Model::new().state("items", json!([])).action("add", |todos, payload| {
//!             todos["items"].as_array_mut().map(|items| items.push(payload.clone()));
//!             true
//!         }),
//!     )
//!     .model(
//!         "audit",
//!         Model::new().thunk_on(
//!             "onAdd",
//!             ReactiveAction::sync(|_, target, _| Ok(target["payload"].clone()))
//!                 .targets(["@action.todos.add"]),
//!         ),
//!     );
//!
//! let store = Store::builder(model).build();
//! store.action_creator("@action.todos.add").unwrap().call(json!("write docs"))?;
//! // dispatched: @action.todos.add, @thunkOn.audit.onAdd(start),
//! //             @thunkOn.audit.onAdd(success), @thunkOn.audit.onAdd
//! ```
//!
//! # Async Handlers
//!
//! A handler built with [`ReactiveAction::future`] returns a future. Calling
//! its creator returns [`ThunkReturn::Pending`]; the success or fail
//! notifications are dispatched when the caller drives it to completion.
//! Listeners fired by the store are spawned on the ambient tokio runtime.
//!
//! ```ignore
//! let on_add = ReactiveAction::future(|_, target, _| async move {
//!     let id = save_remote(&target["payload"]).await?;
//!     Ok(json!(id))
//! })
//! .targets(["@action.todos.add"]);
//! ```

pub mod action;
pub mod config;
pub mod error;
mod listener;
pub mod logger;
pub mod model;
pub mod path;
pub mod registry;
pub mod store;
pub mod testing;
pub mod thunk_on;

// Action exports
pub use action::{
    action_type_for, LifecycleTypes, Notification, ThunkReturn, ACTION_PREFIX, THUNK_ON_PREFIX,
};
pub use error::{ThunkError, ThunkResult};

// Model exports
pub use model::{ActionReducer, Model, ModelNode, Plugin, VisitorResult};
pub use path::Meta;
pub use registry::{ActionCreator, ActionNode, ActionTree, Internals, ListenerState, PluginsState};

// Store exports
pub use config::{Injections, StoreConfig};
pub use store::{
    ComposedMiddleware, LoggingMiddleware, Middleware, NoopMiddleware, References, Store,
    StoreBuilder, StoreHandle, Thunk, WeakReferences,
};

// Reactive action exports
pub use thunk_on::{
    HelperMeta, Helpers, ReactiveAction, RegisteredAction, ThunkOnPlugin, RESOLVED_TARGETS_KEY,
};

// Logging exports
pub use logger::{ActionLog, ActionLogConfig, ActionLoggerConfig, ActionLoggerMiddleware};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::action::{Notification, ThunkReturn};
    pub use crate::config::{Injections, StoreConfig};
    pub use crate::error::{ThunkError, ThunkResult};
    pub use crate::logger::{ActionLoggerConfig, ActionLoggerMiddleware};
    pub use crate::model::{Model, Plugin, VisitorResult};
    pub use crate::registry::{ActionCreator, ActionTree};
    pub use crate::store::{Middleware, Store, StoreHandle};
    pub use crate::thunk_on::{Helpers, ReactiveAction};
}
