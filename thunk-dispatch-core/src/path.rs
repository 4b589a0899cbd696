//! Model paths and path-based access to the state tree

use serde_json::{Map, Value};

/// Where a node sits in the model tree.
///
/// `path` always equals `parent_path` followed by `key`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    pub key: String,
    pub path: Vec<String>,
    pub parent_path: Vec<String>,
}

impl Meta {
    /// Meta of the model root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Meta of the child named `key`.
    pub fn child(&self, key: impl Into<String>) -> Self {
        let key = key.into();
        let mut path = self.path.clone();
        path.push(key.clone());
        Self {
            key,
            path,
            parent_path: self.path.clone(),
        }
    }
}

/// Read the value at `path`. An empty path yields the whole tree.
///
/// Missing segments and non-object intermediates yield `None`.
pub fn get<'a>(path: &[String], tree: &'a Value) -> Option<&'a Value> {
    path.iter()
        .try_fold(tree, |current, segment| current.as_object()?.get(segment))
}

/// Mutable counterpart of [`get`].
pub fn get_mut<'a>(path: &[String], tree: &'a mut Value) -> Option<&'a mut Value> {
    path.iter().try_fold(tree, |current, segment| {
        current.as_object_mut()?.get_mut(segment)
    })
}

/// Write `value` at `path`, creating intermediate objects as needed.
///
/// Intermediates that are not objects are replaced. Writing at the empty path
/// replaces the whole tree.
pub fn set(path: &[String], tree: &mut Value, value: Value) {
    let Some((last, parents)) = path.split_last() else {
        *tree = value;
        return;
    };

    let mut current = tree;
    for segment in parents {
        current = object_entry(current, segment);
    }
    ensure_object(current).insert(last.clone(), value);
}

fn object_entry<'a>(value: &'a mut Value, key: &str) -> &'a mut Value {
    ensure_object(value)
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()))
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}
