//! Flattening index: depth-independent lookup over a bound graph.
//!
//! Every leaf field of every node is collected under its field name, in
//! depth-first pre-order (parent before children, sequence elements in
//! order). A name declared at several depths accumulates all occurrences.

use indexmap::IndexMap;

use crate::binder::{Field, LeafValue, TypedNode};
use crate::container::LeafArray;
use crate::error::ArchiveError;

/// Read-only multimap from field name to every collected leaf value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatIndex {
    entries: IndexMap<String, Vec<LeafValue>>,
}

/// Build the index of a single graph rooted at `root`.
pub fn flatten(root: &TypedNode) -> FlatIndex {
    FlatIndex::from_roots([root])
}

impl FlatIndex {
    /// Build one index over several graphs, visited in the given order.
    pub fn from_roots<'a>(roots: impl IntoIterator<Item = &'a TypedNode>) -> Self {
        Self::with_declared(Vec::new(), roots)
    }

    /// Like [`FlatIndex::from_roots`], but every name in `declared` is a key
    /// even when no bound node populates it.
    ///
    /// Fields under an absent optional node or an empty sequence never show
    /// up in the walk; seeding them from the schema keeps them declared.
    pub fn with_declared<'a>(
        declared: impl IntoIterator<Item = String>,
        roots: impl IntoIterator<Item = &'a TypedNode>,
    ) -> Self {
        let mut entries: IndexMap<String, Vec<LeafValue>> = declared
            .into_iter()
            .map(|name| (name, Vec::new()))
            .collect();
        for root in roots {
            collect(root, &mut entries);
        }
        Self { entries }
    }

    /// Every value collected for `field`, in visit order.
    ///
    /// A declared optional leaf that never occurred yields an empty slice;
    /// a name no node declares is [`ArchiveError::FieldNotDeclared`].
    pub fn get(&self, field: &str) -> Result<&[LeafValue], ArchiveError> {
        self.entries
            .get(field)
            .map(Vec::as_slice)
            .ok_or_else(|| ArchiveError::FieldNotDeclared {
                field: field.to_string(),
            })
    }

    /// Read every value collected for `field`.
    pub fn read(&self, field: &str) -> Result<Vec<LeafArray>, ArchiveError> {
        self.get(field)?
            .iter()
            .map(|value| value.read().cloned())
            .collect()
    }

    pub fn has(&self, field: &str) -> bool {
        self.entries.contains_key(field)
    }

    /// Field names: declared names first, then names first seen in the walk.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn collect(node: &TypedNode, entries: &mut IndexMap<String, Vec<LeafValue>>) {
    for (name, field) in node.fields() {
        match field {
            Field::Leaf(value) => entries.entry(name.to_string()).or_default().push(value.clone()),
            Field::Absent { leaf: true } => {
                entries.entry(name.to_string()).or_default();
            }
            Field::Absent { leaf: false } => {}
            Field::Node(child) => collect(child, entries),
            Field::Sequence(items) => {
                for item in items {
                    collect(item, entries);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LeafPolicy;
    use crate::binder::Binder;
    use crate::container::{Container, MemoryContainer, NodePath};
    use crate::descriptor::{FieldSpec, KindRegistry, KindSpec};
    use crate::dispatch::VariantRegistry;
    use crate::model::ArchiveSchema;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    const SPECS: &[KindSpec] = &[
        KindSpec {
            name: "Outer",
            fields: &[
                FieldSpec::new("energy", "float"),
                FieldSpec::new("inner", "Inner"),
                FieldSpec::new("steps", "Sequence[Inner]"),
            ],
        },
        KindSpec {
            name: "Inner",
            fields: &[
                FieldSpec::new("energy", "float"),
                FieldSpec::new("spin", "Optional[int]"),
            ],
        },
    ];

    fn bound() -> TypedNode {
        let schema = ArchiveSchema {
            kinds: KindRegistry::from_specs(SPECS).unwrap(),
            variants: VariantRegistry::default(),
        };
        let container: Arc<dyn Container> = Arc::new(
            MemoryContainer::from_json(&json!({
                "outer": {
                    "energy": 1.0,
                    "inner": { "energy": 2.0 },
                    "steps": {
                        "1": { "energy": 4.0 },
                        "0": { "energy": 3.0 }
                    }
                }
            }))
            .unwrap(),
        );
        Binder::new(container, &schema, LeafPolicy::Lazy)
            .bind_kind(&NodePath::root().join("outer"), "Outer")
            .unwrap()
    }

    #[test]
    fn test_accumulates_across_depths_in_preorder() {
        let index = flatten(&bound());
        let energies: Vec<f64> = index
            .read("energy")
            .unwrap()
            .iter()
            .filter_map(LeafArray::item)
            .collect();
        // Parent first, then nested node, then sequence elements by key.
        assert_eq!(energies, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_declared_but_never_populated() {
        let index = flatten(&bound());
        assert!(index.has("spin"));
        assert!(index.get("spin").unwrap().is_empty());
    }

    #[test]
    fn test_undeclared_field_is_an_error() {
        let index = flatten(&bound());
        assert!(!index.has("gradient"));
        match index.get("gradient") {
            Err(ArchiveError::FieldNotDeclared { field }) => assert_eq!(field, "gradient"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_nested_node_names_are_not_keys() {
        let index = flatten(&bound());
        assert_eq!(index.keys().collect::<Vec<_>>(), vec!["energy", "spin"]);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_values_share_the_bound_leaf() {
        let root = bound();
        let index = flatten(&root);
        index.read("energy").unwrap();
        assert!(root.leaf("energy").unwrap().is_loaded());
    }

    #[test]
    fn test_declared_names_without_any_node() {
        let index = FlatIndex::with_declared(
            vec!["energy".to_string(), "dipole".to_string()],
            std::iter::empty::<&TypedNode>(),
        );
        assert!(index.get("dipole").unwrap().is_empty());
        assert!(index.read("energy").unwrap().is_empty());
        assert!(index.get("gradient").is_err());
    }

    #[test]
    fn test_declared_names_merge_with_walk() {
        let root = bound();
        let index = FlatIndex::with_declared(vec!["spin".to_string()], [&root]);
        assert_eq!(index.keys().collect::<Vec<_>>(), vec!["spin", "energy"]);
        assert_eq!(index.get("energy").unwrap().len(), 4);
        assert!(index.get("spin").unwrap().is_empty());
    }

    #[test]
    fn test_empty_index() {
        let index = FlatIndex::default();
        assert!(index.is_empty());
        assert!(index.get("energy").is_err());
    }
}
