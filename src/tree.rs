use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use arbitrary::{Arbitrary, Unstructured};
use indexmap::IndexMap;
use serde_json::Number;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Label used for the tree root in diagnostic paths.
pub(crate) const ROOT_LABEL: &str = "(root)";

/// A tree vertex: an insertion-ordered mapping from string keys to values.
///
/// A `Node` is a shared handle. Cloning it clones the handle, not the
/// contents, so the same node can appear in several places in a tree and
/// mutations through one handle are visible through all of them. That is
/// what makes in-place merging observable to the caller, and what makes
/// circular references representable in the first place.
#[derive(Clone, Default)]
pub struct Node(Rc<RefCell<IndexMap<String, Value>>>);

/// A tree value: either a scalar or a nested sub-node.
///
/// `Null` counts as a scalar, not as a sub-node.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Node(Node),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JsonTreeError {
    #[error("expected a JSON object at {path}, got {kind}")]
    NotAnObject { path: String, kind: String },
    #[error("arrays cannot be represented as tree values (at {path})")]
    ArrayValue { path: String },
    #[error("tree contains a circular reference through {path}")]
    Cycle { path: String },
}

pub fn json_type(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::String(_) => "string",
        JsonValue::Number(_) => "number",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
        JsonValue::Null => "null",
    }
}

impl Node {
    pub fn new() -> Self {
        Node(Rc::new(RefCell::new(IndexMap::new())))
    }

    /// Reference identity. Two structurally equal but distinct nodes are
    /// not the same node.
    pub fn ptr_eq(a: &Node, b: &Node) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.0.borrow_mut().insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.borrow().contains_key(key)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.borrow_mut().shift_remove(key)
    }

    /// The node's keys in insertion order, as a snapshot.
    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Removes every key while keeping the node itself alive, so other
    /// holders of this handle see an emptied node rather than a dangling
    /// one.
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    /// Builds a tree from a JSON object. Arrays have no tree counterpart
    /// and are rejected.
    pub fn from_json(json: &JsonValue) -> Result<Node, JsonTreeError> {
        match json {
            JsonValue::Object(map) => {
                let mut path = vec![ROOT_LABEL.to_string()];
                from_json_map(map, &mut path)
            }
            other => Err(JsonTreeError::NotAnObject {
                path: ROOT_LABEL.to_string(),
                kind: json_type(other).to_string(),
            }),
        }
    }

    /// Renders the tree as a JSON object. Fails if the tree contains a
    /// circular reference, since JSON cannot express one.
    pub fn to_json(&self) -> Result<JsonValue, JsonTreeError> {
        let mut stack = vec![self.clone()];
        let mut path = vec![ROOT_LABEL.to_string()];
        let map = to_json_map(self, &mut stack, &mut path)?;
        Ok(JsonValue::Object(map))
    }
}

fn from_json_map(
    map: &serde_json::Map<String, JsonValue>,
    path: &mut Vec<String>,
) -> Result<Node, JsonTreeError> {
    let node = Node::new();
    for (key, json) in map {
        let value = match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => Value::Number(n.clone()),
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Object(inner) => {
                path.push(key.clone());
                let sub = from_json_map(inner, path)?;
                path.pop();
                Value::Node(sub)
            }
            JsonValue::Array(_) => {
                path.push(key.clone());
                return Err(JsonTreeError::ArrayValue { path: path.join(".") });
            }
        };
        node.insert(key.clone(), value);
    }
    Ok(node)
}

fn to_json_map(
    node: &Node,
    stack: &mut Vec<Node>,
    path: &mut Vec<String>,
) -> Result<serde_json::Map<String, JsonValue>, JsonTreeError> {
    let mut map = serde_json::Map::new();
    for key in node.keys() {
        let value = match node.get(&key) {
            Some(value) => value,
            None => continue,
        };
        let json = match value {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(b),
            Value::Number(n) => JsonValue::Number(n),
            Value::String(s) => JsonValue::String(s),
            Value::Node(sub) => {
                if stack.iter().any(|ancestor| Node::ptr_eq(ancestor, &sub)) {
                    path.push(key);
                    return Err(JsonTreeError::Cycle { path: path.join(".") });
                }
                stack.push(sub.clone());
                path.push(key.clone());
                let inner = to_json_map(&sub, stack, path)?;
                path.pop();
                stack.pop();
                JsonValue::Object(inner)
            }
        };
        map.insert(key, json);
    }
    Ok(map)
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Trees may be cyclic, so render identity and size instead of
        // recursing into the contents.
        write!(f, "Node({:p}, {} keys)", Rc::as_ptr(&self.0), self.len())
    }
}

impl Value {
    /// The identity comparison the merge uses to decide whether two values
    /// conflict: scalars compare by value, sub-nodes by reference identity.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Node(a), Value::Node(b)) => Node::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Node(_) => "node",
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(Number::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<Node> for Value {
    fn from(value: Node) -> Self {
        Value::Node(value)
    }
}

// Fuzzing builds trees bottom-up, so generated trees are always acyclic.
impl<'a> Arbitrary<'a> for Node {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Node> {
        let node = Node::new();
        let len = u.int_in_range(0..=6)?;
        for _ in 0..len {
            let key: String = u.arbitrary()?;
            let value: Value = u.arbitrary()?;
            node.insert(key, value);
        }
        Ok(node)
    }
}

impl<'a> Arbitrary<'a> for Value {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Value> {
        Ok(match u.int_in_range(0u8..=4)? {
            0 => Value::Null,
            1 => Value::Bool(u.arbitrary()?),
            2 => Value::Number(Number::from(u.arbitrary::<i32>()?)),
            3 => Value::String(u.arbitrary()?),
            _ => Value::Node(u.arbitrary()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_round_trip() {
        let json = json!({"a": 1, "b": {"c": true, "d": null}, "e": "text"});
        let node = Node::from_json(&json).unwrap();
        assert_eq!(node.to_json().unwrap(), json);
    }

    #[test]
    fn rejects_non_object_root() {
        let error = Node::from_json(&json!([1, 2])).unwrap_err();
        assert_eq!(
            error,
            JsonTreeError::NotAnObject {
                path: "(root)".to_string(),
                kind: "array".to_string()
            }
        );
    }

    #[test]
    fn rejects_nested_arrays() {
        let error = Node::from_json(&json!({"a": {"b": [1]}})).unwrap_err();
        assert_eq!(
            error,
            JsonTreeError::ArrayValue {
                path: "(root).a.b".to_string()
            }
        );
    }

    #[test]
    fn to_json_reports_cycles() {
        let root = Node::new();
        let child = Node::new();
        child.insert("back", Value::Node(root.clone()));
        root.insert("child", Value::Node(child));
        let error = root.to_json().unwrap_err();
        assert_eq!(
            error,
            JsonTreeError::Cycle {
                path: "(root).child.back".to_string()
            }
        );
    }

    #[test]
    fn same_compares_nodes_by_identity() {
        let a = Node::from_json(&json!({"k": 1})).unwrap();
        let b = Node::from_json(&json!({"k": 1})).unwrap();
        assert!(!Value::Node(a.clone()).same(&Value::Node(b)));
        assert!(Value::Node(a.clone()).same(&Value::Node(a)));
    }

    #[test]
    fn same_compares_scalars_by_value() {
        assert!(Value::from(1).same(&Value::from(1)));
        assert!(!Value::from(1).same(&Value::from(2)));
        assert!(!Value::from(1).same(&Value::from("1")));
        assert!(Value::Null.same(&Value::Null));
        assert!(!Value::Null.same(&Value::from(false)));
    }

    #[test]
    fn clear_keeps_the_handle_alive() {
        let node = Node::from_json(&json!({"a": 1, "b": 2})).unwrap();
        let alias = node.clone();
        node.clear();
        assert!(alias.is_empty());
        assert!(Node::ptr_eq(&node, &alias));
    }
}
