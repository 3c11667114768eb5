//! # qarchive-core
//!
//! Reads Q-Chem archive containers into a typed job graph and transpiles the
//! archive's container-schema description into a standard JSON Schema.
//!
//! Two independent passes share one schema vocabulary:
//!
//! - **Binding**: container tree → [`Binder`] (driven by static
//!   [`descriptor`] tables) → [`Job`]s via the [`dispatch`] registry →
//!   [`Archive`] → [`FlatIndex`] for depth-independent lookup.
//! - **Transpilation**: container-schema document → [`transpile`] →
//!   JSON Schema with hoisted job-kind definitions.
//!
//! Opening the underlying file is the job of a [`Container`] backend.
//!
//! ```
//! use std::sync::Arc;
//! use qarchive_core::{Archive, ArchiveSchema, LoadOptions, MemoryContainer};
//! use serde_json::json;
//!
//! let container = MemoryContainer::from_json(&json!({
//!     "job": {
//!         "0": {
//!             "sp": {
//!                 "aobasis": { "nbasis": 2 },
//!                 "structure": { "coordinates": [[0.0, 0.0, 0.0], [0.0, 0.0, 0.74]] },
//!                 "energy_function": { "0": { "energy": -1.17 } }
//!             }
//!         }
//!     }
//! }))
//! .unwrap();
//!
//! let schema = ArchiveSchema::qchem().unwrap();
//! let archive = Archive::open(Arc::new(container), &schema, &LoadOptions::default()).unwrap();
//! assert_eq!(archive.jobs()[0].energy().unwrap(), -1.17);
//! ```

pub mod archive;
pub mod binder;
pub mod config;
pub mod container;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod index;
pub mod job;
pub mod model;
pub mod schema_utils;
pub mod transpile;

pub use archive::Archive;
pub use binder::{Binder, Field, LeafValue, TypedNode, TypedNodeBuilder};
pub use config::{LeafPolicy, LoadOptions, TranspileOptions};
pub use container::{Container, ContainerError, LeafArray, LeafData, MemoryContainer, NodePath, NodeType};
pub use descriptor::{KindRegistry, NodeKind, SchemaDescriptor, TypeToken, Wrapper};
pub use dispatch::{dispatch, VariantRegistry};
pub use error::ArchiveError;
pub use index::{flatten, FlatIndex};
pub use job::{Job, JobKind};
pub use model::ArchiveSchema;
pub use schema_utils::build_path;
pub use transpile::{transpile, PassthroughType, TranspileResult};
