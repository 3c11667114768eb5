//! In-memory container backed by a JSON-like tree.
//!
//! JSON objects become groups (children keep document order); numbers,
//! booleans and rectangular nested arrays become leaves with an inferred
//! shape. Integers stay integers unless mixed with floats.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use super::{Container, ContainerError, LeafArray, LeafData, NodePath, NodeType};

#[derive(Debug, Clone, PartialEq)]
enum MemoryNode {
    Group(IndexMap<String, MemoryNode>),
    Leaf(LeafArray),
}

/// A container held entirely in memory.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct MemoryContainer {
    root: MemoryNode,
}

impl MemoryContainer {
    /// Build a container from a JSON tree. The root must be an object.
    pub fn from_json(value: &Value) -> Result<Self, ContainerError> {
        if !value.is_object() {
            return Err(ContainerError::NotAGroup {
                path: NodePath::root().to_string(),
            });
        }
        let root = node_from_json(value, &NodePath::root())?;
        Ok(Self { root })
    }

    fn lookup(&self, path: &NodePath) -> Result<&MemoryNode, ContainerError> {
        let mut current = &self.root;
        for segment in path.segments() {
            current = match current {
                MemoryNode::Group(children) => {
                    children
                        .get(segment)
                        .ok_or_else(|| ContainerError::NotFound {
                            path: path.to_string(),
                        })?
                }
                MemoryNode::Leaf(_) => {
                    return Err(ContainerError::NotFound {
                        path: path.to_string(),
                    })
                }
            };
        }
        Ok(current)
    }
}

impl TryFrom<Value> for MemoryContainer {
    type Error = ContainerError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        MemoryContainer::from_json(&value)
    }
}

impl Container for MemoryContainer {
    fn node_type(&self, path: &NodePath) -> Result<NodeType, ContainerError> {
        Ok(match self.lookup(path)? {
            MemoryNode::Group(_) => NodeType::Group,
            MemoryNode::Leaf(_) => NodeType::Leaf,
        })
    }

    fn list_children(&self, path: &NodePath) -> Result<Vec<(String, NodePath)>, ContainerError> {
        match self.lookup(path)? {
            MemoryNode::Group(children) => Ok(children
                .keys()
                .map(|name| (name.clone(), path.join(name)))
                .collect()),
            MemoryNode::Leaf(_) => Err(ContainerError::NotAGroup {
                path: path.to_string(),
            }),
        }
    }

    fn read_leaf(&self, path: &NodePath) -> Result<LeafArray, ContainerError> {
        match self.lookup(path)? {
            MemoryNode::Leaf(array) => Ok(array.clone()),
            MemoryNode::Group(_) => Err(ContainerError::NotALeaf {
                path: path.to_string(),
            }),
        }
    }

    fn has_child(&self, path: &NodePath, name: &str) -> Result<bool, ContainerError> {
        match self.lookup(path) {
            Ok(MemoryNode::Group(children)) => Ok(children.contains_key(name)),
            Ok(MemoryNode::Leaf(_)) => Err(ContainerError::NotAGroup {
                path: path.to_string(),
            }),
            Err(ContainerError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// JSON → node conversion
// ---------------------------------------------------------------------------

fn node_from_json(value: &Value, path: &NodePath) -> Result<MemoryNode, ContainerError> {
    match value {
        Value::Object(map) => {
            let mut children = IndexMap::with_capacity(map.len());
            for (name, child) in map {
                if name.is_empty() || name.contains('/') {
                    return Err(ContainerError::Malformed {
                        path: path.to_string(),
                        message: format!("invalid child name `{name}`"),
                    });
                }
                children.insert(name.clone(), node_from_json(child, &path.join(name))?);
            }
            Ok(MemoryNode::Group(children))
        }
        _ => leaf_from_json(value, path).map(MemoryNode::Leaf),
    }
}

/// Scalar element collected while flattening a nested array.
enum Element {
    Float(f64),
    Int(i64),
    Bool(bool),
}

fn leaf_from_json(value: &Value, path: &NodePath) -> Result<LeafArray, ContainerError> {
    let malformed = |message: String| ContainerError::Malformed {
        path: path.to_string(),
        message,
    };

    let shape = infer_shape(value);
    let mut elements = Vec::new();
    collect_elements(value, &shape, &mut elements).map_err(malformed)?;

    let data = if elements.iter().all(|e| matches!(e, Element::Bool(_))) && !elements.is_empty() {
        LeafData::Bool(
            elements
                .iter()
                .map(|e| matches!(e, Element::Bool(true)))
                .collect(),
        )
    } else if elements.iter().any(|e| matches!(e, Element::Bool(_))) {
        return Err(malformed("booleans mixed with numbers".to_string()));
    } else if !elements.is_empty() && elements.iter().all(|e| matches!(e, Element::Int(_))) {
        LeafData::Int(
            elements
                .iter()
                .filter_map(|e| match e {
                    Element::Int(i) => Some(*i),
                    _ => None,
                })
                .collect(),
        )
    } else {
        LeafData::Float(
            elements
                .iter()
                .filter_map(|e| match e {
                    Element::Float(f) => Some(*f),
                    Element::Int(i) => Some(*i as f64),
                    Element::Bool(_) => None,
                })
                .collect(),
        )
    };

    LeafArray::new(shape, data).map_err(|e| match e {
        ContainerError::Malformed { message, .. } => malformed(message),
        other => other,
    })
}

/// Shape implied by following the first element of every nesting level.
fn infer_shape(value: &Value) -> Vec<usize> {
    let mut shape = Vec::new();
    let mut current = value;
    while let Value::Array(items) = current {
        shape.push(items.len());
        match items.first() {
            Some(first) => current = first,
            None => break,
        }
    }
    shape
}

fn collect_elements(value: &Value, shape: &[usize], out: &mut Vec<Element>) -> Result<(), String> {
    match (value, shape.split_first()) {
        (Value::Array(items), Some((&n, rest))) => {
            if items.len() != n {
                return Err(format!("ragged array: expected {n} elements, found {}", items.len()));
            }
            for item in items {
                collect_elements(item, rest, out)?;
            }
            Ok(())
        }
        (Value::Array(_), None) => Err("ragged array: unexpected nesting".to_string()),
        (_, Some(_)) => Err("ragged array: expected a nested array".to_string()),
        (Value::Bool(b), None) => {
            out.push(Element::Bool(*b));
            Ok(())
        }
        (Value::Number(n), None) => {
            match n.as_i64() {
                Some(i) => out.push(Element::Int(i)),
                None => out.push(Element::Float(n.as_f64().unwrap_or(f64::NAN))),
            }
            Ok(())
        }
        (other, None) => Err(format!("unsupported leaf value: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> MemoryContainer {
        MemoryContainer::from_json(&json!({
            "job": {
                "1": { "sp": { "energy": -76.1 } },
                "0": { "sp": { "energy": -75.9 } }
            },
            "matrix": [[1, 2, 3], [4, 5, 6]],
            "flags": [true, false],
            "mixed": [1, 2.5]
        }))
        .unwrap()
    }

    #[test]
    fn test_children_keep_storage_order() {
        let container = sample();
        let job = NodePath::root().join("job");
        let names: Vec<String> = container
            .list_children(&job)
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["1", "0"]);
        assert_eq!(container.has_child(&job, "0"), Ok(true));
        assert_eq!(container.has_child(&job, "2"), Ok(false));
        assert_eq!(container.has_child(&job.join("9"), "sp"), Ok(false));
        assert!(container.has_child(&NodePath::root().join("matrix"), "x").is_err());
    }

    #[test]
    fn test_leaf_shape_inference() {
        let container = sample();
        let matrix = container.read_leaf(&NodePath::root().join("matrix")).unwrap();
        assert_eq!(matrix.shape(), &[2, 3]);
        assert_eq!(matrix.data(), &LeafData::Int(vec![1, 2, 3, 4, 5, 6]));

        let flags = container.read_leaf(&NodePath::root().join("flags")).unwrap();
        assert_eq!(flags.data(), &LeafData::Bool(vec![true, false]));

        let mixed = container.read_leaf(&NodePath::root().join("mixed")).unwrap();
        assert_eq!(mixed.data(), &LeafData::Float(vec![1.0, 2.5]));

        let energy_path = NodePath::root().join("job").join("0").join("sp").join("energy");
        let energy = container.read_leaf(&energy_path).unwrap();
        assert_eq!(energy.shape(), &[] as &[usize]);
        assert_eq!(energy.item(), Some(-75.9));
    }

    #[test]
    fn test_node_types_and_errors() {
        let container = sample();
        assert_eq!(
            container.node_type(&NodePath::root().join("job")).unwrap(),
            NodeType::Group
        );
        assert_eq!(
            container.node_type(&NodePath::root().join("matrix")).unwrap(),
            NodeType::Leaf
        );
        assert!(matches!(
            container.read_leaf(&NodePath::root().join("job")),
            Err(ContainerError::NotALeaf { .. })
        ));
        assert!(matches!(
            container.list_children(&NodePath::root().join("matrix")),
            Err(ContainerError::NotAGroup { .. })
        ));
        assert!(matches!(
            container.node_type(&NodePath::root().join("missing")),
            Err(ContainerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_ragged_and_invalid_leaves_rejected() {
        assert!(MemoryContainer::from_json(&json!({ "a": [[1, 2], [3]] })).is_err());
        assert!(MemoryContainer::from_json(&json!({ "a": "text" })).is_err());
        assert!(MemoryContainer::from_json(&json!({ "a": [true, 1] })).is_err());
        assert!(MemoryContainer::from_json(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_deserialize_from_json_text() {
        let container: MemoryContainer =
            serde_json::from_str(r#"{"structure": {"coordinates": [[0.0, 0.0, 0.1]]}}"#).unwrap();
        let coords = container
            .read_leaf(&NodePath::root().join("structure").join("coordinates"))
            .unwrap();
        assert_eq!(coords.shape(), &[1, 3]);
    }
}
