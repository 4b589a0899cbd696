//! Action creators and the registries that address them

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::action::{LifecycleTypes, ThunkReturn};
use crate::error::ThunkResult;
use crate::thunk_on::RegisteredAction;

type CreatorFn = dyn Fn(Value) -> ThunkResult<ThunkReturn> + Send + Sync;

/// A callable that dispatches one kind of action.
///
/// Plain action creators dispatch `{type, payload}`. Reactive action creators
/// additionally carry [`LifecycleTypes`] and emit the start/success/fail
/// sequence around their handler.
#[derive(Clone)]
pub struct ActionCreator {
    action_type: String,
    lifecycle: Option<LifecycleTypes>,
    call: Arc<CreatorFn>,
}

impl ActionCreator {
    /// Create a plain action creator.
    pub fn new<F>(action_type: impl Into<String>, call: F) -> Self
    where
        F: Fn(Value) -> ThunkResult<ThunkReturn> + Send + Sync + 'static,
    {
        Self {
            action_type: action_type.into(),
            lifecycle: None,
            call: Arc::new(call),
        }
    }

    /// Create a lifecycle-wrapped action creator.
    pub fn with_lifecycle<F>(types: LifecycleTypes, call: F) -> Self
    where
        F: Fn(Value) -> ThunkResult<ThunkReturn> + Send + Sync + 'static,
    {
        Self {
            action_type: types.action_type.clone(),
            lifecycle: Some(types),
            call: Arc::new(call),
        }
    }

    /// Invoke the creator.
    pub fn call(&self, payload: Value) -> ThunkResult<ThunkReturn> {
        (self.call)(payload)
    }

    /// The combined action type.
    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    /// Lifecycle identifiers, for reactive action creators.
    pub fn lifecycle(&self) -> Option<&LifecycleTypes> {
        self.lifecycle.as_ref()
    }

    pub fn start_type(&self) -> Option<&str> {
        self.lifecycle.as_ref().map(|t| t.start_type.as_str())
    }

    pub fn success_type(&self) -> Option<&str> {
        self.lifecycle.as_ref().map(|t| t.success_type.as_str())
    }

    pub fn fail_type(&self) -> Option<&str> {
        self.lifecycle.as_ref().map(|t| t.fail_type.as_str())
    }
}

impl fmt::Debug for ActionCreator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionCreator")
            .field("action_type", &self.action_type)
            .field("lifecycle", &self.lifecycle.is_some())
            .finish()
    }
}

/// A node of an [`ActionTree`].
#[derive(Debug, Clone)]
pub enum ActionNode {
    Creator(ActionCreator),
    Tree(ActionTree),
}

/// Action creators arranged by model path.
#[derive(Debug, Clone, Default)]
pub struct ActionTree {
    children: BTreeMap<String, ActionNode>,
}

impl ActionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct child by key.
    pub fn child(&self, key: &str) -> Option<&ActionNode> {
        self.children.get(key)
    }

    /// The subtree at `path`. The empty path yields `self`.
    pub fn subtree(&self, path: &[String]) -> Option<&ActionTree> {
        path.iter().try_fold(self, |tree, segment| match tree.child(segment)? {
            ActionNode::Tree(subtree) => Some(subtree),
            ActionNode::Creator(_) => None,
        })
    }

    /// The creator at `path`.
    pub fn creator(&self, path: &[String]) -> Option<&ActionCreator> {
        let (last, parents) = path.split_last()?;
        match self.subtree(parents)?.child(last)? {
            ActionNode::Creator(creator) => Some(creator),
            ActionNode::Tree(_) => None,
        }
    }

    /// Place `creator` at `path`, creating intermediate subtrees.
    ///
    /// A creator standing where a subtree is needed is replaced. The empty
    /// path addresses no slot and is ignored.
    pub fn set(&mut self, path: &[String], creator: ActionCreator) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };

        let mut tree = self;
        for segment in parents {
            let node = tree
                .children
                .entry(segment.clone())
                .or_insert_with(|| ActionNode::Tree(ActionTree::new()));
            if let ActionNode::Creator(_) = node {
                *node = ActionNode::Tree(ActionTree::new());
            }
            let ActionNode::Tree(subtree) = node else {
                return;
            };
            tree = subtree;
        }
        tree.children
            .insert(last.clone(), ActionNode::Creator(creator));
    }

    /// Every creator in the tree, depth-first in key order.
    pub fn creators(&self) -> Vec<&ActionCreator> {
        let mut out = Vec::new();
        self.collect_creators(&mut out);
        out
    }

    fn collect_creators<'a>(&'a self, out: &mut Vec<&'a ActionCreator>) {
        for node in self.children.values() {
            match node {
                ActionNode::Creator(creator) => out.push(creator),
                ActionNode::Tree(tree) => tree.collect_creators(out),
            }
        }
    }

    /// Keys of the direct children.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// Registries of plain action creators.
#[derive(Debug, Default)]
pub struct Internals {
    /// Every creator by action type, reactive ones included.
    pub action_creator_dict: HashMap<String, ActionCreator>,
    /// Plain action creators by model path.
    pub action_creators: ActionTree,
}

/// State owned by the listener subsystem.
#[derive(Debug, Default)]
pub struct ListenerState {
    /// Reactive actions in registration order.
    pub listener_definitions: Vec<RegisteredAction>,
    /// Reactive action creators by model path.
    pub listener_action_creators: ActionTree,
}

/// State managed by plugins.
#[derive(Debug, Default)]
pub struct PluginsState {
    pub listener: ListenerState,
}
