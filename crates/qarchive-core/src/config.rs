//! Configuration for archive loading and schema transpilation.

use serde::{Deserialize, Serialize};

/// When leaf arrays are read from the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeafPolicy {
    /// Read a leaf the first time its value is requested (default).
    Lazy,
    /// Read every leaf while binding.
    Eager,
}

/// Options for opening an archive.
///
/// ## Serialization Format
///
/// Fields are serialized in `kebab-case` (e.g., `leaf-policy`, `job-key`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoadOptions {
    /// Leaf materialization policy. Default: lazy.
    pub leaf_policy: LeafPolicy,
    /// Name of the root group holding the job list. Default: `job`.
    pub job_key: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            leaf_policy: LeafPolicy::Lazy,
            job_key: "job".to_string(),
        }
    }
}

/// Options for schema transpilation.
///
/// ## Serialization Format
///
/// Fields are serialized in `kebab-case` (e.g., `add-extras`, `schema-uri`).
/// This naming convention is part of the public API contract for config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TranspileOptions {
    /// Decorate every emitted node with `x-init: false` / `x-repr: false`
    /// hints for downstream code generators. Default: off.
    pub add_extras: bool,
    /// Value of the `$schema` keyword in the emitted document.
    pub schema_uri: String,
    /// Value of the top-level `name` keyword.
    pub name: String,
    /// Value of the top-level `version` keyword.
    pub version: String,
    /// Value of the top-level `description` keyword.
    pub description: String,
    /// Source key of the job list whose element kinds are hoisted.
    pub job_key: String,
    /// Hoisted definition referenced by `can_add_sp` extension points.
    pub single_point_key: String,
    /// Maximum nesting depth of the source document (stack overflow guard).
    pub max_depth: usize,
}

impl Default for TranspileOptions {
    fn default() -> Self {
        Self {
            add_extras: false,
            schema_uri: "https://json-schema.org/draft/2020-12/schema#".to_string(),
            name: "qarchive_schema".to_string(),
            version: "1.dev".to_string(),
            description: "The Q-Chem archive file".to_string(),
            job_key: "job".to_string(),
            single_point_key: "sp".to_string(),
            max_depth: 64,
        }
    }
}
