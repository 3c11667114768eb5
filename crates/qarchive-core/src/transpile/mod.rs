//! Schema transpiler: container-schema documents → JSON Schema.
//!
//! A single recursive descent over the source document:
//!
//! 1. `_layers` becomes `properties`; every layer is transpiled in place.
//! 2. A non-empty `shape` lifts the node to `type: array`, moving the
//!    element type into `items`.
//! 3. Leaf type names and relocated `$ref` targets are rewritten
//!    (see [`rewrite`]); `docstring` → `description`, `#ref` → `$ref`.
//! 4. The element kinds of the job list are hoisted to top-level
//!    definitions and replaced by `$ref`s. The job list is the last root
//!    key emitted; keys after it are ignored.
//! 5. Nodes whose `_metadata.can_add_sp` is set gain an `sp` property
//!    referencing the hoisted single-point definition.
//! 6. With `add_extras`, every emitted node carries `x-init: false` and
//!    `x-repr: false`.
//!
//! Unknown type names are passed through unchanged, logged, and reported in
//! [`TranspileResult::passthrough`].

mod rewrite;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config::TranspileOptions;
use crate::error::ArchiveError;
use crate::schema_utils::{build_path, definition_ref};

use rewrite::{rewrite_ref, rewrite_type, TypeRewrite};

const LAYERS_KEY: &str = "_layers";
const METADATA_KEY: &str = "_metadata";

/// Top-level keywords a hoisted job kind must not overwrite.
const RESERVED_KEYS: &[&str] = &["$schema", "name", "version", "description", "type", "properties"];

/// Output of [`transpile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranspileResult {
    /// The target-dialect schema document.
    pub schema: Value,
    /// Type names that were not recognized and were emitted unchanged.
    pub passthrough: Vec<PassthroughType>,
}

/// An unrecognized `type` value emitted unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassthroughType {
    /// Target-document path of the node carrying the type.
    pub path: String,
    pub type_name: String,
}

/// Where the current recursion sits in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Root,
    /// The job-list node itself.
    JobList,
    /// A `properties` map produced from `_layers`.
    Properties,
    Node,
}

/// Transpile a container-schema document into a JSON Schema document.
pub fn transpile(
    source: &Value,
    options: &TranspileOptions,
) -> Result<TranspileResult, ArchiveError> {
    let source = source.as_object().ok_or_else(|| ArchiveError::SchemaError {
        path: "#".to_string(),
        message: "source schema must be an object".to_string(),
    })?;

    let mut transpiler = Transpiler {
        options,
        passthrough: Vec::new(),
    };
    let mut document = document_header(options);
    transpiler.walk_into(source, &mut document, "#", 0, Position::Root)?;

    Ok(TranspileResult {
        schema: Value::Object(document),
        passthrough: transpiler.passthrough,
    })
}

fn document_header(options: &TranspileOptions) -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(options.job_key.clone(), json!({}));

    let mut document = Map::new();
    document.insert("$schema".to_string(), json!(options.schema_uri));
    document.insert("name".to_string(), json!(options.name));
    document.insert("version".to_string(), json!(options.version));
    document.insert("description".to_string(), json!(options.description));
    document.insert("type".to_string(), json!("object"));
    document.insert("properties".to_string(), Value::Object(properties));
    document
}

struct Transpiler<'a> {
    options: &'a TranspileOptions,
    passthrough: Vec<PassthroughType>,
}

impl Transpiler<'_> {
    fn walk_into(
        &mut self,
        source: &Map<String, Value>,
        out: &mut Map<String, Value>,
        path: &str,
        depth: usize,
        position: Position,
    ) -> Result<(), ArchiveError> {
        if depth > self.options.max_depth {
            return Err(ArchiveError::RecursionDepthExceeded {
                path: path.to_string(),
                max_depth: self.options.max_depth,
            });
        }

        for (i, (key, value)) in source.iter().enumerate() {
            if position == Position::Root && *key == self.options.job_key {
                self.transpile_job_list(value, out, depth)?;
                // The job list closes the document.
                let skipped: Vec<&str> = source.keys().skip(i + 1).map(String::as_str).collect();
                if !skipped.is_empty() {
                    tracing::warn!(?skipped, "ignoring root keys after the job list");
                }
                break;
            }
            if key == METADATA_KEY && position != Position::Properties {
                continue;
            }

            match value {
                Value::Object(child) => {
                    let (target_key, child_position) = if key == LAYERS_KEY {
                        ("properties", Position::Properties)
                    } else {
                        (key.as_str(), Position::Node)
                    };

                    // Once a node has become an array, nested declarations
                    // describe its elements.
                    let into_items = matches!(out.get("items"), Some(Value::Object(_)));
                    let child_path = if into_items {
                        build_path(path, &["items", target_key])
                    } else {
                        build_path(path, &[target_key])
                    };
                    let container = if into_items {
                        out.get_mut("items").and_then(Value::as_object_mut)
                    } else {
                        Some(&mut *out)
                    };
                    let Some(container) = container else {
                        continue;
                    };

                    let slot = container
                        .entry(target_key.to_string())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if !slot.is_object() {
                        *slot = Value::Object(Map::new());
                    }
                    if let Value::Object(slot) = slot {
                        self.walk_into(child, slot, &child_path, depth + 1, child_position)?;
                    }
                }
                _ => self.emit_scalar(key, value, out, path),
            }
        }

        self.finish_node(source, out, position);
        Ok(())
    }

    fn emit_scalar(&mut self, key: &str, value: &Value, out: &mut Map<String, Value>, path: &str) {
        match key {
            "#ref" => {
                let target = value
                    .as_str()
                    .map(|target| json!(rewrite_ref(target)))
                    .unwrap_or_else(|| value.clone());
                out.insert("$ref".to_string(), target);
            }
            "docstring" => {
                out.insert("description".to_string(), value.clone());
            }
            "type" => self.emit_type(value, out, path),
            "shape" => {
                if is_non_empty_array(value) {
                    out.entry("items".to_string())
                        .or_insert_with(|| Value::Object(Map::new()));
                }
                out.insert(key.to_string(), value.clone());
            }
            _ => {
                out.insert(key.to_string(), value.clone());
            }
        }
    }

    fn emit_type(&mut self, value: &Value, out: &mut Map<String, Value>, path: &str) {
        let Some(name) = value.as_str() else {
            out.insert("type".to_string(), value.clone());
            return;
        };

        match rewrite_type(name) {
            TypeRewrite::Mapped(target) => {
                out.insert("type".to_string(), json!(target));
            }
            TypeRewrite::Collection => {
                out.insert("type".to_string(), json!("array"));
                out.entry("items".to_string())
                    .or_insert_with(|| json!({ "type": "object" }));
            }
            TypeRewrite::Standard => {
                out.insert("type".to_string(), value.clone());
            }
            TypeRewrite::Passthrough => {
                tracing::warn!(path, type_name = name, "unrecognized type passed through unchanged");
                self.passthrough.push(PassthroughType {
                    path: path.to_string(),
                    type_name: name.to_string(),
                });
                out.insert("type".to_string(), value.clone());
            }
        }
    }

    /// Node-level rules applied once all keys have been emitted.
    fn finish_node(&self, source: &Map<String, Value>, out: &mut Map<String, Value>, position: Position) {
        if source.get("shape").is_some_and(is_non_empty_array) {
            let element_type = out.get("type").cloned();
            if let (Some(Value::Object(items)), Some(element_type)) =
                (out.get_mut("items"), element_type)
            {
                items.insert("type".to_string(), element_type);
            }
            out.insert("type".to_string(), json!("array"));
        }

        if matches!(position, Position::Root | Position::Node) && can_add_sp(source) {
            let reference = self.reference(&self.options.single_point_key);
            // Array nodes take the extension on their elements, next to
            // the layers that were nested into `items`.
            let target = if matches!(out.get("items"), Some(Value::Object(_))) {
                out.get_mut("items").and_then(Value::as_object_mut)
            } else {
                Some(&mut *out)
            };
            if let Some(target) = target {
                set_property(target, &self.options.single_point_key, reference);
            }
        }

        if self.options.add_extras && matches!(position, Position::Node | Position::JobList) {
            add_extras(out);
        }
    }

    fn transpile_job_list(
        &mut self,
        value: &Value,
        document: &mut Map<String, Value>,
        depth: usize,
    ) -> Result<(), ArchiveError> {
        let job_key = self.options.job_key.clone();
        let path = build_path("#", &["properties", &job_key]);

        let mut job = Map::new();
        match value {
            Value::Object(source) => {
                self.walk_into(source, &mut job, &path, depth + 1, Position::JobList)?
            }
            other => {
                tracing::warn!(path = %path, "job list is not an object, copying unchanged");
                set_property(document, &job_key, other.clone());
                return Ok(());
            }
        }

        for (name, definition) in self.hoist_job_kinds(&mut job) {
            if document.contains_key(&name) {
                let message = if RESERVED_KEYS.contains(&name.as_str()) {
                    format!("job kind `{name}` collides with a top-level keyword")
                } else {
                    format!("job kind `{name}` collides with an earlier root key")
                };
                return Err(ArchiveError::SchemaError {
                    path: build_path(&path, &["items", "properties", &name]),
                    message,
                });
            }
            tracing::debug!(kind = %name, "hoisting job kind definition");
            document.insert(name, definition);
        }

        set_property(document, &job_key, Value::Object(job));
        Ok(())
    }

    /// Replace every job kind under `items.properties` with a `$ref`,
    /// returning the original definitions in order.
    fn hoist_job_kinds(&self, job: &mut Map<String, Value>) -> Vec<(String, Value)> {
        let Some(kinds) = job
            .get_mut("items")
            .and_then(|items| items.get_mut("properties"))
            .and_then(Value::as_object_mut)
        else {
            return Vec::new();
        };

        kinds
            .iter_mut()
            .map(|(name, definition)| {
                let reference = self.reference(name);
                (name.clone(), std::mem::replace(definition, reference))
            })
            .collect()
    }

    fn reference(&self, name: &str) -> Value {
        let mut reference = Map::new();
        reference.insert("$ref".to_string(), json!(definition_ref(name)));
        if self.options.add_extras {
            add_extras(&mut reference);
        }
        Value::Object(reference)
    }
}

fn set_property(document: &mut Map<String, Value>, key: &str, value: Value) {
    let properties = document
        .entry("properties".to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(properties) = properties {
        properties.insert(key.to_string(), value);
    }
}

fn add_extras(node: &mut Map<String, Value>) {
    node.insert("x-init".to_string(), json!(false));
    node.insert("x-repr".to_string(), json!(false));
}

fn can_add_sp(source: &Map<String, Value>) -> bool {
    source
        .get(METADATA_KEY)
        .and_then(|metadata| metadata.get("can_add_sp"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn is_non_empty_array(value: &Value) -> bool {
    value.as_array().is_some_and(|dims| !dims.is_empty())
}

// ===========================================================================
// Tests
// ===========================================================================
