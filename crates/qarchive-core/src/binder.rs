//! Type binder: builds immutable typed nodes from container groups.
//!
//! The declared descriptors drive the walk, not the container: extra
//! children are ignored, missing required children are errors. Leaves are
//! wrapped in [`LeafValue`] handles that read the container at most once.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;

use crate::config::LeafPolicy;
use crate::container::{Container, LeafArray, NodePath, NodeType};
use crate::descriptor::{NodeKind, PrimitiveType, ResolvedType, SchemaDescriptor, Wrapper};
use crate::error::ArchiveError;
use crate::model::ArchiveSchema;

// ---------------------------------------------------------------------------
// Leaf handles
// ---------------------------------------------------------------------------

struct LeafSlot {
    container: Arc<dyn Container>,
    path: NodePath,
    primitive: PrimitiveType,
    cell: OnceCell<LeafArray>,
}

/// Shared handle to one leaf array; clones share the cached read.
#[derive(Clone)]
pub struct LeafValue {
    slot: Arc<LeafSlot>,
}

impl LeafValue {
    fn new(container: Arc<dyn Container>, path: NodePath, primitive: PrimitiveType) -> Self {
        Self {
            slot: Arc::new(LeafSlot {
                container,
                path,
                primitive,
                cell: OnceCell::new(),
            }),
        }
    }

    pub fn path(&self) -> &NodePath {
        &self.slot.path
    }

    pub fn primitive(&self) -> PrimitiveType {
        self.slot.primitive
    }

    /// Whether the array has already been read from the container.
    pub fn is_loaded(&self) -> bool {
        self.slot.cell.get().is_some()
    }

    /// The leaf array, read from the container on first access.
    pub fn read(&self) -> Result<&LeafArray, ArchiveError> {
        self.slot
            .cell
            .get_or_try_init(|| {
                tracing::trace!(path = %self.slot.path, "reading leaf");
                self.slot.container.read_leaf(&self.slot.path)
            })
            .map_err(ArchiveError::from)
    }
}

impl fmt::Debug for LeafValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafValue")
            .field("path", &self.slot.path)
            .field("primitive", &self.slot.primitive)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// Handles are equal when they name the same leaf and hold equal arrays.
/// Comparing reads both leaves; a leaf that fails to read equals nothing
/// but itself.
impl PartialEq for LeafValue {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.slot, &other.slot) {
            return true;
        }
        if self.slot.path != other.slot.path || self.slot.primitive != other.slot.primitive {
            return false;
        }
        matches!((self.read(), other.read()), (Ok(a), Ok(b)) if a == b)
    }
}

// ---------------------------------------------------------------------------
// Typed nodes
// ---------------------------------------------------------------------------

/// One resolved field of a typed node.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Leaf(LeafValue),
    Node(Box<TypedNode>),
    /// Elements ordered by ascending ordering key.
    Sequence(Vec<TypedNode>),
    /// An optional field with no container child; `leaf` records whether
    /// the declared type was primitive.
    Absent { leaf: bool },
}

/// An immutable node bound against one node kind.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedNode {
    kind: String,
    source: NodePath,
    sort_index: Option<u64>,
    fields: IndexMap<String, Field>,
}

impl TypedNode {
    pub fn builder(kind: &str, source: NodePath) -> TypedNodeBuilder {
        TypedNodeBuilder {
            kind: kind.to_string(),
            source,
            sort_index: None,
            fields: IndexMap::new(),
        }
    }

    /// Name of the node kind this node was bound against.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Container location the node was bound from.
    pub fn source(&self) -> &NodePath {
        &self.source
    }

    /// Position among siblings, if the node has a numeric ordering key.
    pub fn sort_index(&self) -> Option<u64> {
        self.sort_index
    }

    /// Resolved fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn leaf(&self, name: &str) -> Option<&LeafValue> {
        match self.fields.get(name) {
            Some(Field::Leaf(value)) => Some(value),
            _ => None,
        }
    }

    pub fn node(&self, name: &str) -> Option<&TypedNode> {
        match self.fields.get(name) {
            Some(Field::Node(node)) => Some(node),
            _ => None,
        }
    }

    pub fn sequence(&self, name: &str) -> Option<&[TypedNode]> {
        match self.fields.get(name) {
            Some(Field::Sequence(items)) => Some(items),
            _ => None,
        }
    }

    /// `true` unless the field is undeclared or an absent optional.
    pub fn is_present(&self, name: &str) -> bool {
        !matches!(self.fields.get(name), None | Some(Field::Absent { .. }))
    }
}

/// Accumulates fields, then finalizes into an immutable [`TypedNode`].
#[derive(Debug)]
pub struct TypedNodeBuilder {
    kind: String,
    source: NodePath,
    sort_index: Option<u64>,
    fields: IndexMap<String, Field>,
}

impl TypedNodeBuilder {
    pub fn sort_index(mut self, sort_index: Option<u64>) -> Self {
        self.sort_index = sort_index;
        self
    }

    pub fn field(mut self, name: &str, field: Field) -> Self {
        self.fields.insert(name.to_string(), field);
        self
    }

    pub fn build(self) -> TypedNode {
        TypedNode {
            kind: self.kind,
            source: self.source,
            sort_index: self.sort_index,
            fields: self.fields,
        }
    }
}

// ---------------------------------------------------------------------------
// Binder
// ---------------------------------------------------------------------------

/// Binds container groups against the kinds of an [`ArchiveSchema`].
pub struct Binder<'s> {
    container: Arc<dyn Container>,
    schema: &'s ArchiveSchema,
    policy: LeafPolicy,
}

impl<'s> Binder<'s> {
    pub fn new(container: Arc<dyn Container>, schema: &'s ArchiveSchema, policy: LeafPolicy) -> Self {
        Self {
            container,
            schema,
            policy,
        }
    }

    pub fn container(&self) -> &Arc<dyn Container> {
        &self.container
    }

    pub fn schema(&self) -> &'s ArchiveSchema {
        self.schema
    }

    /// Bind the group at `path` against `kind`.
    ///
    /// The node's `sort_index` is the numeric name of its parent group.
    pub fn bind(&self, path: &NodePath, kind: &NodeKind) -> Result<TypedNode, ArchiveError> {
        let sort_index = path
            .parent()
            .and_then(|parent| parent.name().parse::<u64>().ok());
        self.bind_node(path, kind, sort_index)
    }

    /// Bind the group at `path` against the kind named `kind_name`.
    pub fn bind_kind(&self, path: &NodePath, kind_name: &str) -> Result<TypedNode, ArchiveError> {
        let kind = self
            .schema
            .kinds
            .get(kind_name)
            .ok_or_else(|| ArchiveError::UnresolvedType {
                path: path.to_string(),
                token: kind_name.to_string(),
            })?;
        self.bind(path, kind)
    }

    fn bind_node(
        &self,
        path: &NodePath,
        kind: &NodeKind,
        sort_index: Option<u64>,
    ) -> Result<TypedNode, ArchiveError> {
        self.expect_type(path, NodeType::Group)?;
        tracing::debug!(kind = %kind.name, path = %path, "binding node");

        let mut builder = TypedNode::builder(&kind.name, path.clone()).sort_index(sort_index);
        for descriptor in &kind.fields {
            let field = self.bind_field(path, descriptor)?;
            builder = builder.field(&descriptor.field_name, field);
        }
        Ok(builder.build())
    }

    fn bind_field(
        &self,
        parent: &NodePath,
        descriptor: &SchemaDescriptor,
    ) -> Result<Field, ArchiveError> {
        let name = descriptor.field_name.as_str();
        let path = parent.join(name);
        let resolved = self.resolve(&path, descriptor)?;

        if !self.container.has_child(parent, name)? {
            return match descriptor.wrapper() {
                Wrapper::Optional => {
                    tracing::trace!(field = name, path = %parent, "optional field absent");
                    Ok(Field::Absent {
                        leaf: matches!(resolved, ResolvedType::Primitive(_)),
                    })
                }
                Wrapper::None | Wrapper::Sequence => Err(ArchiveError::MissingRequiredField {
                    path: path.to_string(),
                }),
            };
        }

        match (resolved, descriptor.wrapper()) {
            (ResolvedType::Primitive(primitive), Wrapper::None | Wrapper::Optional) => {
                self.expect_type(&path, NodeType::Leaf)?;
                let value = LeafValue::new(self.container.clone(), path, primitive);
                if self.policy == LeafPolicy::Eager {
                    value.read()?;
                }
                Ok(Field::Leaf(value))
            }
            (ResolvedType::Primitive(_), Wrapper::Sequence) => Err(ArchiveError::SchemaError {
                path: path.to_string(),
                message: format!(
                    "`{}`: sequences of primitive values are not supported",
                    descriptor.declared_type
                ),
            }),
            (ResolvedType::Kind(kind), Wrapper::None | Wrapper::Optional) => {
                let node = self.bind(&path, kind)?;
                Ok(Field::Node(Box::new(node)))
            }
            (ResolvedType::Kind(kind), Wrapper::Sequence) => {
                self.bind_sequence(&path, kind).map(Field::Sequence)
            }
        }
    }

    /// Bind every child of the group at `path` as an element, ordered by the
    /// children's numeric names.
    fn bind_sequence(&self, path: &NodePath, kind: &NodeKind) -> Result<Vec<TypedNode>, ArchiveError> {
        let mut items = Vec::new();
        for (name, child) in self.container.list_children(path)? {
            let key = name
                .parse::<u64>()
                .map_err(|_| ArchiveError::InvalidOrderingKey {
                    path: path.to_string(),
                    name: name.clone(),
                })?;
            items.push(self.bind_node(&child, kind, Some(key))?);
        }
        items.sort_by_key(TypedNode::sort_index);
        Ok(items)
    }

    fn resolve(
        &self,
        path: &NodePath,
        descriptor: &SchemaDescriptor,
    ) -> Result<ResolvedType<'s>, ArchiveError> {
        let token = &descriptor.declared_type;

        if let Some(tag) = descriptor.variant_tag.as_deref() {
            let variant =
                self.schema
                    .variants
                    .get(tag)
                    .ok_or_else(|| ArchiveError::UnknownVariant {
                        path: path.to_string(),
                        kind: tag.to_string(),
                    })?;
            if variant.node_kind != token.base {
                return Err(ArchiveError::UnresolvedType {
                    path: path.to_string(),
                    token: token.to_string(),
                });
            }
        }

        self.schema
            .kinds
            .resolve(&token.base)
            .ok_or_else(|| ArchiveError::UnresolvedType {
                path: path.to_string(),
                token: token.to_string(),
            })
    }

    fn expect_type(&self, path: &NodePath, expected: NodeType) -> Result<(), ArchiveError> {
        let actual = self.container.node_type(path)?;
        if actual == expected {
            return Ok(());
        }
        let err = match expected {
            NodeType::Group => crate::container::ContainerError::NotAGroup {
                path: path.to_string(),
            },
            NodeType::Leaf => crate::container::ContainerError::NotALeaf {
                path: path.to_string(),
            },
        };
        Err(err.into())
    }
}
