//! Variant dispatcher: picks the concrete job kind for a job slot.
//!
//! Each entry of the archive's job list is a group holding exactly one
//! child; that child's name is the discriminant. The registry is an
//! explicit value, built once and only read afterwards.

use indexmap::IndexMap;

use crate::binder::Binder;
use crate::container::NodePath;
use crate::error::ArchiveError;
use crate::job::{Job, JobKind};

/// One registered job variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub job_kind: JobKind,
    /// Node kind the variant's group is bound against.
    pub node_kind: String,
}

/// Discriminant → job variant.
#[derive(Debug, Clone, Default)]
pub struct VariantRegistry {
    variants: IndexMap<String, Variant>,
}

impl VariantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, discriminant: &str, job_kind: JobKind, node_kind: &str) -> Self {
        self.variants.insert(
            discriminant.to_string(),
            Variant {
                job_kind,
                node_kind: node_kind.to_string(),
            },
        );
        self
    }

    pub fn get(&self, discriminant: &str) -> Option<&Variant> {
        self.variants.get(discriminant)
    }

    pub fn discriminants(&self) -> impl Iterator<Item = &str> {
        self.variants.keys().map(String::as_str)
    }
}

/// Dispatch the job slot group at `slot` to its registered variant and bind it.
///
/// Unknown discriminants are errors; there is no fallback variant.
pub fn dispatch(binder: &Binder<'_>, slot: &NodePath) -> Result<Job, ArchiveError> {
    let mut children = binder.container().list_children(slot)?.into_iter();
    let (discriminant, path) = children
        .next()
        .ok_or_else(|| ArchiveError::MissingRequiredField {
            path: slot.join("<job>").to_string(),
        })?;

    let extra: Vec<String> = children.map(|(name, _)| name).collect();
    if !extra.is_empty() {
        tracing::warn!(slot = %slot, ?extra, "job slot has more than one child, ignoring the rest");
    }

    let variant = binder
        .schema()
        .variants
        .get(&discriminant)
        .ok_or_else(|| ArchiveError::UnknownVariant {
            path: path.to_string(),
            kind: discriminant.clone(),
        })?;

    tracing::debug!(slot = %slot, kind = %discriminant, "dispatching job");
    let node = binder.bind_kind(&path, &variant.node_kind)?;
    Ok(Job::new(variant.job_kind, node))
}
