//! Schema descriptors: the declared shape of every typed node kind.
//!
//! Node kinds are declared as static tables of [`FieldSpec`]s. Building a
//! [`KindRegistry`] parses every type token once, so the binder only ever
//! sees structured [`TypeToken`]s.
//!
//! ## Type-token grammar
//!
//! ```text
//! token   := base | wrapper "[" base "]"
//! wrapper := "Optional" | "Sequence"
//! base    := [A-Za-z_][A-Za-z0-9_]*
//! ```
//!
//! Wrappers do not nest.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ArchiveError;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?P<wrapper>[A-Za-z_][A-Za-z0-9_]*)\s*\[\s*(?P<inner>.*?)\s*\]|(?P<bare>[A-Za-z_][A-Za-z0-9_]*))$")
        .expect("type token regex is valid")
});

static BASE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("base name regex is valid"));

/// How a declared field wraps its base type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrapper {
    None,
    /// Absent children resolve to "not present".
    Optional,
    /// The child group's children form an ordered collection.
    Sequence,
}

/// A parsed type annotation: `{base, wrapper}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeToken {
    pub base: String,
    pub wrapper: Wrapper,
}

impl FromStr for TypeToken {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |message: &str| ArchiveError::InvalidTypeToken {
            token: s.to_string(),
            message: message.to_string(),
        };

        let trimmed = s.trim();
        let caps = TOKEN_RE
            .captures(trimmed)
            .ok_or_else(|| invalid("expected `Name`, `Optional[Name]` or `Sequence[Name]`"))?;

        if let Some(bare) = caps.name("bare") {
            return Ok(TypeToken {
                base: bare.as_str().to_string(),
                wrapper: Wrapper::None,
            });
        }

        let wrapper = match caps.name("wrapper").map(|m| m.as_str()) {
            Some("Optional") => Wrapper::Optional,
            Some("Sequence") => Wrapper::Sequence,
            _ => return Err(invalid("unknown wrapper")),
        };

        let inner = caps.name("inner").map(|m| m.as_str()).unwrap_or("");
        if inner.contains('[') {
            return Err(invalid("wrappers do not nest"));
        }
        if !BASE_RE.is_match(inner) {
            return Err(invalid("invalid base type name"));
        }

        Ok(TypeToken {
            base: inner.to_string(),
            wrapper,
        })
    }
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.wrapper {
            Wrapper::None => write!(f, "{}", self.base),
            Wrapper::Optional => write!(f, "Optional[{}]", self.base),
            Wrapper::Sequence => write!(f, "Sequence[{}]", self.base),
        }
    }
}

/// Leaf types read directly from the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Float,
    Int,
    Bool,
    NdArray,
}

impl PrimitiveType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "float" => Some(PrimitiveType::Float),
            "int" => Some(PrimitiveType::Int),
            "bool" => Some(PrimitiveType::Bool),
            "ndarray" => Some(PrimitiveType::NdArray),
            _ => None,
        }
    }
}

/// The declared shape of one field of a node kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescriptor {
    pub field_name: String,
    pub declared_type: TypeToken,
    /// When set, the field embeds the job variant registered under this
    /// discriminant instead of a kind looked up by name.
    pub variant_tag: Option<String>,
}

impl SchemaDescriptor {
    pub fn new(field_name: &str, token: &str) -> Result<Self, ArchiveError> {
        Ok(Self {
            field_name: field_name.to_string(),
            declared_type: token.parse()?,
            variant_tag: None,
        })
    }

    pub fn with_variant_tag(mut self, tag: &str) -> Self {
        self.variant_tag = Some(tag.to_string());
        self
    }

    pub fn wrapper(&self) -> Wrapper {
        self.declared_type.wrapper
    }
}

/// Static declaration of one field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub token: &'static str,
    pub variant_tag: Option<&'static str>,
}

impl FieldSpec {
    pub const fn new(name: &'static str, token: &'static str) -> Self {
        Self {
            name,
            token,
            variant_tag: None,
        }
    }

    pub const fn variant(name: &'static str, token: &'static str, tag: &'static str) -> Self {
        Self {
            name,
            token,
            variant_tag: Some(tag),
        }
    }
}

/// Static declaration of one node kind.
#[derive(Debug, Clone, Copy)]
pub struct KindSpec {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

/// A nested node definition: a named, ordered set of descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeKind {
    pub name: String,
    pub fields: Vec<SchemaDescriptor>,
}

impl NodeKind {
    pub fn from_spec(spec: &KindSpec) -> Result<Self, ArchiveError> {
        let fields = spec
            .fields
            .iter()
            .map(|f| {
                let descriptor = SchemaDescriptor::new(f.name, f.token)?;
                Ok(match f.variant_tag {
                    Some(tag) => descriptor.with_variant_tag(tag),
                    None => descriptor,
                })
            })
            .collect::<Result<Vec<_>, ArchiveError>>()?;
        Ok(Self {
            name: spec.name.to_string(),
            fields,
        })
    }
}

/// What a type token's base name refers to.
#[derive(Debug, Clone, Copy)]
pub enum ResolvedType<'a> {
    Primitive(PrimitiveType),
    Kind(&'a NodeKind),
}

/// All node kinds known to a binding pass, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct KindRegistry {
    kinds: IndexMap<String, NodeKind>,
}

impl KindRegistry {
    pub fn from_specs(specs: &[KindSpec]) -> Result<Self, ArchiveError> {
        let mut registry = Self::default();
        for spec in specs {
            registry.register(NodeKind::from_spec(spec)?);
        }
        Ok(registry)
    }

    /// Add a kind, replacing any earlier kind of the same name.
    pub fn register(&mut self, kind: NodeKind) {
        self.kinds.insert(kind.name.clone(), kind);
    }

    pub fn get(&self, name: &str) -> Option<&NodeKind> {
        self.kinds.get(name)
    }

    /// Resolve a base type name; primitives shadow kinds.
    pub fn resolve(&self, base: &str) -> Option<ResolvedType<'_>> {
        if let Some(primitive) = PrimitiveType::from_name(base) {
            return Some(ResolvedType::Primitive(primitive));
        }
        self.kinds.get(base).map(ResolvedType::Kind)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }

    /// Names of every primitive-typed field reachable from the kinds named
    /// in `roots`, depth-first in declaration order, without duplicates.
    pub fn leaf_fields<'r>(&self, roots: impl IntoIterator<Item = &'r str>) -> Vec<String> {
        let mut visited = HashSet::new();
        let mut names = IndexSet::new();
        for root in roots {
            self.collect_leaf_fields(root, &mut visited, &mut names);
        }
        names.into_iter().collect()
    }

    fn collect_leaf_fields<'s>(
        &'s self,
        kind_name: &str,
        visited: &mut HashSet<&'s str>,
        names: &mut IndexSet<String>,
    ) {
        let Some(kind) = self.kinds.get(kind_name) else {
            return;
        };
        if !visited.insert(kind.name.as_str()) {
            return;
        }
        for field in &kind.fields {
            match self.resolve(&field.declared_type.base) {
                Some(ResolvedType::Primitive(_)) => {
                    names.insert(field.field_name.clone());
                }
                Some(ResolvedType::Kind(child)) => {
                    self.collect_leaf_fields(&child.name, visited, names)
                }
                None => {}
            }
        }
    }
}
