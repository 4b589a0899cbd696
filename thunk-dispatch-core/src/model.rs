//! Model definitions and the traversal that turns them into a store
//!
//! A [`Model`] is a tree of named nodes: state leaves, plain actions, reactive
//! actions and nested models. Building a store walks the tree once. Each node
//! is first offered to the registered [`Plugin`]s; if none of them claims it,
//! default handling applies.
//!
//! ```ignore
//! use serde_json::json;
//! use thunk_dispatch_core::prelude::*;
//!
//! let model = Model::new().model(
//!     "todos",
//!     Model::new()
//!         .state("items", json!([]))
//!         .action("add", |todos, payload| {
//!             todos["items"].as_array_mut().map(|items| items.push(payload.clone()));
//!             true
//!         }),
//! );
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::action::{action_type_for, Notification, ThunkReturn, ACTION_PREFIX};
use crate::error::ThunkError;
use crate::path::{self, Meta};
use crate::registry::ActionCreator;
use crate::store::References;
use crate::thunk_on::ReactiveAction;

/// Reducer of a plain action.
///
/// Receives the state of the model that declares the action and the payload.
/// Returns `true` if the state changed.
pub type ActionReducer = Arc<dyn Fn(&mut Value, &Value) -> bool + Send + Sync>;

/// A node of a [`Model`].
#[derive(Clone)]
pub enum ModelNode {
    State(Value),
    Action(ActionReducer),
    ThunkOn(ReactiveAction),
    Model(Model),
}

impl fmt::Debug for ModelNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State(value) => f.debug_tuple("State").field(value).finish(),
            Self::Action(_) => f.write_str("Action(..)"),
            Self::ThunkOn(definition) => f.debug_tuple("ThunkOn").field(definition).finish(),
            Self::Model(model) => f.debug_tuple("Model").field(model).finish(),
        }
    }
}

/// An ordered tree of model nodes.
#[derive(Debug, Clone, Default)]
pub struct Model {
    entries: Vec<(String, ModelNode)>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, replacing any node with the same key in place.
    pub fn insert(mut self, key: impl Into<String>, node: ModelNode) -> Self {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = node,
            None => self.entries.push((key, node)),
        }
        self
    }

    /// Add a state leaf.
    pub fn state(self, key: impl Into<String>, value: Value) -> Self {
        self.insert(key, ModelNode::State(value))
    }

    /// Add a plain action.
    pub fn action<F>(self, key: impl Into<String>, reducer: F) -> Self
    where
        F: Fn(&mut Value, &Value) -> bool + Send + Sync + 'static,
    {
        self.insert(key, ModelNode::Action(Arc::new(reducer)))
    }

    /// Add a reactive action.
    pub fn thunk_on(self, key: impl Into<String>, definition: ReactiveAction) -> Self {
        self.insert(key, ModelNode::ThunkOn(definition))
    }

    /// Nest a model.
    pub fn model(self, key: impl Into<String>, model: Model) -> Self {
        self.insert(key, ModelNode::Model(model))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &ModelNode)> {
        self.entries.iter().map(|(k, node)| (k.as_str(), node))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What a plugin tells the traversal after looking at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitorResult {
    /// The plugin ignored the node; ask the next plugin, then apply defaults.
    Default,
    /// The plugin handled the node; do not treat it as ordinary data.
    Terminal,
}

/// Extension point invoked for every node during store creation.
pub trait Plugin: Send + Sync {
    /// Plugin name for logging.
    fn name(&self) -> &'static str;

    /// Inspect a node. `meta` locates it in the model.
    fn model_visitor(&self, node: &ModelNode, meta: &Meta, references: &References)
        -> VisitorResult;
}

/// A plain action's reducer together with the slice it applies to.
#[derive(Clone)]
pub(crate) struct RegisteredReducer {
    pub parent_path: Vec<String>,
    pub reducer: ActionReducer,
}

/// Output of [`traverse`].
pub(crate) struct Traversal {
    pub initial_state: Value,
    pub reducers: HashMap<String, RegisteredReducer>,
}

/// Walk `model` depth-first, offering each node to `plugins` before applying
/// default handling.
pub(crate) fn traverse(
    model: &Model,
    plugins: &[Box<dyn Plugin>],
    references: &References,
) -> Traversal {
    let mut traversal = Traversal {
        initial_state: Value::Object(Map::new()),
        reducers: HashMap::new(),
    };
    visit(model, &Meta::root(), plugins, references, &mut traversal);
    traversal
}

fn visit(
    model: &Model,
    parent: &Meta,
    plugins: &[Box<dyn Plugin>],
    references: &References,
    traversal: &mut Traversal,
) {
    for (key, node) in model.entries() {
        let meta = parent.child(key);

        let claimed = plugins.iter().find(|plugin| {
            plugin.model_visitor(node, &meta, references) == VisitorResult::Terminal
        });
        if let Some(plugin) = claimed {
            tracing::trace!(plugin = plugin.name(), path = %meta.path.join("."), "node claimed");
            continue;
        }

        match node {
            ModelNode::State(value) => {
                path::set(&meta.path, &mut traversal.initial_state, value.clone());
            }
            ModelNode::Action(reducer) => {
                register_action(&meta, reducer, references, traversal);
            }
            ModelNode::Model(child) => {
                path::set(
                    &meta.path,
                    &mut traversal.initial_state,
                    Value::Object(Map::new()),
                );
                visit(child, &meta, plugins, references, traversal);
            }
            ModelNode::ThunkOn(_) => {
                tracing::warn!(
                    path = %meta.path.join("."),
                    "reactive action left unhandled, no plugin claimed it"
                );
            }
        }
    }
}

fn register_action(
    meta: &Meta,
    reducer: &ActionReducer,
    references: &References,
    traversal: &mut Traversal,
) {
    let action_type = action_type_for(ACTION_PREFIX, &meta.path);
    let weak = references.downgrade();
    let creator = ActionCreator::new(action_type.clone(), {
        let action_type = action_type.clone();
        move |payload: Value| {
            let store = weak
                .upgrade()
                .and_then(|references| references.current_store())
                .ok_or(ThunkError::StoreDropped)?;
            store.dispatch(Notification::new(action_type.clone(), payload.clone()));
            Ok(ThunkReturn::Ready(payload))
        }
    });

    {
        let mut internals = references.internals_mut();
        internals
            .action_creator_dict
            .insert(action_type.clone(), creator.clone());
        internals.action_creators.set(&meta.path, creator);
    }

    traversal.reducers.insert(
        action_type,
        RegisteredReducer {
            parent_path: meta.parent_path.clone(),
            reducer: Arc::clone(reducer),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let model = Model::new()
            .state("a", json!(1))
            .state("b", json!(2))
            .state("a", json!(3));

        let keys: Vec<_> = model.entries().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert!(matches!(model.entries().next(), Some((_, ModelNode::State(v))) if *v == json!(3)));
    }

    #[test]
    fn test_traverse_defaults() {
        let model = Model::new().state("user", json!(null)).model(
            "todos",
            Model::new()
                .state("items", json!([]))
                .action("add", |_, _| true),
        );
        let references = References::new();

        let traversal = traverse(&model, &[], &references);

        assert_eq!(
            traversal.initial_state,
            json!({"user": null, "todos": {"items": []}})
        );
        let reducer = &traversal.reducers["@action.todos.add"];
        assert_eq!(reducer.parent_path, path(&["todos"]));

        let internals = references.internals();
        assert!(internals.action_creator_dict.contains_key("@action.todos.add"));
        let creator = internals
            .action_creators
            .creator(&path(&["todos", "add"]))
            .unwrap();
        assert_eq!(creator.action_type(), "@action.todos.add");
    }

    struct ClaimState {
        seen: Mutex<Vec<Vec<String>>>,
    }

    impl Plugin for ClaimState {
        fn name(&self) -> &'static str {
            "claim-state"
        }

        fn model_visitor(&self, node: &ModelNode, meta: &Meta, _: &References) -> VisitorResult {
            self.seen.lock().unwrap().push(meta.path.clone());
            match node {
                ModelNode::State(_) => VisitorResult::Terminal,
                _ => VisitorResult::Default,
            }
        }
    }

    #[test]
    fn test_plugin_claims_skip_defaults() {
        let model = Model::new()
            .state("hidden", json!(1))
            .model("nested", Model::new().state("also_hidden", json!(2)));
        let plugin = ClaimState {
            seen: Mutex::new(Vec::new()),
        };
        let plugins: Vec<Box<dyn Plugin>> = vec![Box::new(plugin)];

        let traversal = traverse(&model, &plugins, &References::new());

        assert_eq!(traversal.initial_state, json!({"nested": {}}));
    }

    #[test]
    fn test_plain_creator_without_store() {
        let model = Model::new().action("ping", |_, _| false);
        let references = References::new();
        traverse(&model, &[], &references);

        let creator = references.internals().action_creator_dict["@action.ping"].clone();
        assert_eq!(creator.call(json!(1)).unwrap_err(), ThunkError::StoreDropped);
    }
}
