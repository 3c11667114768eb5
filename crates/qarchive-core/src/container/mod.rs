//! Read interface to the hierarchical container file.
//!
//! The binding engine never opens or closes a file. It walks a [`Container`]
//! through [`NodePath`] handles: groups are listed, leaves are read into a
//! [`LeafArray`]. Backends (HDF5 readers, JSON dumps, the in-memory tree used
//! by tests) implement the trait and own the file lifetime.

mod memory;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use memory::MemoryContainer;

/// Failures reported by a container backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContainerError {
    #[error("no node at {path}")]
    NotFound { path: String },

    #[error("node at {path} is not a group")]
    NotAGroup { path: String },

    #[error("node at {path} is not a leaf")]
    NotALeaf { path: String },

    #[error("malformed node at {path}: {message}")]
    Malformed { path: String, message: String },
}

/// Whether a node holds named children or an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Group,
    Leaf,
}

/// Absolute, `/`-separated location of a node inside a container.
///
/// The root is `/`. Node names never contain `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(String);

impl NodePath {
    pub fn root() -> Self {
        NodePath("/".to_string())
    }

    /// Path of the child `name` below this node.
    pub fn join(&self, name: &str) -> Self {
        if self.is_root() {
            NodePath(format!("/{name}"))
        } else {
            NodePath(format!("{}/{name}", self.0))
        }
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Last path segment; empty for the root.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }

    /// Path of the enclosing group, or `None` for the root.
    pub fn parent(&self) -> Option<NodePath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(NodePath::root()),
            Some(idx) => Some(NodePath(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Decoded path segments, root first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Element storage of a leaf array, flattened in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dtype", content = "values", rename_all = "snake_case")]
pub enum LeafData {
    Float(Vec<f64>),
    Int(Vec<i64>),
    Bool(Vec<bool>),
}

impl LeafData {
    pub fn len(&self) -> usize {
        match self {
            LeafData::Float(v) => v.len(),
            LeafData::Int(v) => v.len(),
            LeafData::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slice(&self, start: usize, end: usize) -> LeafData {
        match self {
            LeafData::Float(v) => LeafData::Float(v[start..end].to_vec()),
            LeafData::Int(v) => LeafData::Int(v[start..end].to_vec()),
            LeafData::Bool(v) => LeafData::Bool(v[start..end].to_vec()),
        }
    }

    fn value_at(&self, idx: usize) -> Value {
        match self {
            LeafData::Float(v) => Value::from(v[idx]),
            LeafData::Int(v) => Value::from(v[idx]),
            LeafData::Bool(v) => Value::from(v[idx]),
        }
    }
}

/// A typed multi-dimensional array read from a leaf node.
///
/// Deserialization goes through [`LeafArray::new`], so a decoded array
/// always holds exactly as many elements as its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLeafArray")]
pub struct LeafArray {
    shape: Vec<usize>,
    data: LeafData,
}

#[derive(Deserialize)]
struct RawLeafArray {
    shape: Vec<usize>,
    data: LeafData,
}

impl TryFrom<RawLeafArray> for LeafArray {
    type Error = ContainerError;

    fn try_from(raw: RawLeafArray) -> Result<Self, Self::Error> {
        LeafArray::new(raw.shape, raw.data)
    }
}

impl LeafArray {
    /// Build an array, checking that `shape` covers exactly `data.len()` elements.
    ///
    /// An empty `shape` denotes a scalar (one element).
    pub fn new(shape: Vec<usize>, data: LeafData) -> Result<Self, ContainerError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(ContainerError::Malformed {
                path: String::new(),
                message: format!(
                    "shape {:?} holds {} elements but {} were given",
                    shape,
                    expected,
                    data.len()
                ),
            });
        }
        Ok(Self { shape, data })
    }

    pub fn scalar(value: f64) -> Self {
        Self {
            shape: Vec::new(),
            data: LeafData::Float(vec![value]),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn data(&self) -> &LeafData {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Elements widened to `f64` (`true` → 1.0).
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match &self.data {
            LeafData::Float(v) => v.clone(),
            LeafData::Int(v) => v.iter().map(|&x| x as f64).collect(),
            LeafData::Bool(v) => v.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect(),
        }
    }

    /// The single element of a one-element array as `f64`.
    pub fn item(&self) -> Option<f64> {
        if self.len() == 1 {
            self.to_f64_vec().first().copied()
        } else {
            None
        }
    }

    /// Sub-array at `index` along the first axis.
    ///
    /// Returns `None` for scalars and out-of-range indices.
    pub fn slab(&self, index: usize) -> Option<LeafArray> {
        let (&outer, inner_shape) = self.shape.split_first()?;
        if index >= outer {
            return None;
        }
        let stride: usize = inner_shape.iter().product();
        Some(LeafArray {
            shape: inner_shape.to_vec(),
            data: self.data.slice(index * stride, (index + 1) * stride),
        })
    }

    /// Last sub-array along the first axis.
    pub fn last_slab(&self) -> Option<LeafArray> {
        let outer = *self.shape.first()?;
        outer.checked_sub(1).and_then(|idx| self.slab(idx))
    }

    /// Nested JSON arrays mirroring the shape; scalars become plain values.
    pub fn to_json(&self) -> Value {
        fn nest(data: &LeafData, shape: &[usize], offset: usize) -> Value {
            match shape.split_first() {
                None => data.value_at(offset),
                Some((&n, rest)) => {
                    let stride: usize = rest.iter().product();
                    Value::Array(
                        (0..n)
                            .map(|i| nest(data, rest, offset + i * stride))
                            .collect(),
                    )
                }
            }
        }
        nest(&self.data, &self.shape, 0)
    }
}

/// Read-only access to a hierarchical container.
///
/// Implementations must not change between the first and the last read of
/// an archive bound against them.
pub trait Container: Send + Sync + fmt::Debug {
    /// Kind of the node at `path`.
    fn node_type(&self, path: &NodePath) -> Result<NodeType, ContainerError>;

    /// Children of the group at `path`, in storage order.
    fn list_children(&self, path: &NodePath) -> Result<Vec<(String, NodePath)>, ContainerError>;

    /// Read the leaf at `path`.
    fn read_leaf(&self, path: &NodePath) -> Result<LeafArray, ContainerError>;

    /// Whether the group at `path` has a child called `name`.
    ///
    /// A missing `path` is `Ok(false)`; every other backend failure is
    /// propagated.
    fn has_child(&self, path: &NodePath, name: &str) -> Result<bool, ContainerError> {
        match self.list_children(path) {
            Ok(children) => Ok(children.iter().any(|(child, _)| child == name)),
            Err(ContainerError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_node_path_navigation() {
        let path = NodePath::root().join("job").join("3").join("geom_opt");
        assert_eq!(path.as_str(), "/job/3/geom_opt");
        assert_eq!(path.name(), "geom_opt");

        let parent = path.parent().unwrap();
        assert_eq!(parent.as_str(), "/job/3");
        assert_eq!(parent.name(), "3");
        assert_eq!(
            NodePath::root().join("job").parent(),
            Some(NodePath::root())
        );
        assert_eq!(NodePath::root().parent(), None);
        assert_eq!(NodePath::root().name(), "");
        assert_eq!(path.segments().collect::<Vec<_>>(), vec!["job", "3", "geom_opt"]);
    }

    #[test]
    fn test_leaf_array_shape_mismatch() {
        let err = LeafArray::new(vec![2, 2], LeafData::Float(vec![1.0, 2.0, 3.0])).unwrap_err();
        assert!(matches!(err, ContainerError::Malformed { .. }));
    }

    #[test]
    fn test_leaf_array_slabs() {
        let arr = LeafArray::new(
            vec![2, 2, 2],
            LeafData::Int((0..8).collect()),
        )
        .unwrap();

        let first = arr.slab(0).unwrap();
        assert_eq!(first.shape(), &[2, 2]);
        assert_eq!(first.to_json(), json!([[0, 1], [2, 3]]));

        let last = arr.last_slab().unwrap();
        assert_eq!(last.to_json(), json!([[4, 5], [6, 7]]));

        assert!(arr.slab(2).is_none());
        assert!(LeafArray::scalar(1.5).slab(0).is_none());
    }

    #[test]
    fn test_leaf_array_item() {
        assert_eq!(LeafArray::scalar(-76.4).item(), Some(-76.4));
        let one = LeafArray::new(vec![1], LeafData::Int(vec![7])).unwrap();
        assert_eq!(one.item(), Some(7.0));
        let two = LeafArray::new(vec![2], LeafData::Bool(vec![true, false])).unwrap();
        assert_eq!(two.item(), None);
        assert_eq!(two.to_f64_vec(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_leaf_array_deserialize_checks_shape() {
        let short = json!({ "shape": [2, 2], "data": { "dtype": "float", "values": [1.0] } });
        let err = serde_json::from_value::<LeafArray>(short).unwrap_err();
        assert!(err.to_string().contains("holds 4 elements"), "{err}");

        let ok = json!({ "shape": [2], "data": { "dtype": "int", "values": [3, 4] } });
        let arr: LeafArray = serde_json::from_value(ok).unwrap();
        assert_eq!(arr.to_json(), json!([3, 4]));
        assert_eq!(serde_json::to_value(&arr).unwrap()["shape"], json!([2]));
    }

    /// Backend whose group listing fails for everything but a missing path.
    #[derive(Debug)]
    struct FlakyContainer;

    impl Container for FlakyContainer {
        fn node_type(&self, _path: &NodePath) -> Result<NodeType, ContainerError> {
            Ok(NodeType::Group)
        }

        fn list_children(
            &self,
            path: &NodePath,
        ) -> Result<Vec<(String, NodePath)>, ContainerError> {
            if path.name() == "gone" {
                return Err(ContainerError::NotFound {
                    path: path.to_string(),
                });
            }
            Err(ContainerError::Malformed {
                path: path.to_string(),
                message: "read failed".to_string(),
            })
        }

        fn read_leaf(&self, path: &NodePath) -> Result<LeafArray, ContainerError> {
            Err(ContainerError::NotALeaf {
                path: path.to_string(),
            })
        }
    }

    #[test]
    fn test_has_child_propagates_backend_failures() {
        let container = FlakyContainer;
        assert_eq!(
            container.has_child(&NodePath::root().join("gone"), "x"),
            Ok(false)
        );
        assert!(matches!(
            container.has_child(&NodePath::root(), "job"),
            Err(ContainerError::Malformed { .. })
        ));
    }
}
