//! Archive: the bound job list of one container.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::binder::Binder;
use crate::config::LoadOptions;
use crate::container::{Container, NodePath};
use crate::dispatch::dispatch;
use crate::error::ArchiveError;
use crate::index::FlatIndex;
use crate::job::Job;
use crate::model::ArchiveSchema;

/// All jobs of a container, ordered by their position in the job list.
///
/// The archive holds the container handle for as long as any bound leaf may
/// still be read; dropping it releases the container.
#[derive(Debug)]
pub struct Archive {
    container: Arc<dyn Container>,
    jobs: Vec<Job>,
    /// Leaf field names the schema declares for any job kind.
    declared: Vec<String>,
    index: OnceCell<FlatIndex>,
}

impl Archive {
    /// Bind every job under the `job` group of `container`.
    ///
    /// Each child of the job group is a slot holding one job; slots are
    /// dispatched through `schema.variants` and the jobs sorted by
    /// `sort_index` (stable for equal keys).
    pub fn open(
        container: Arc<dyn Container>,
        schema: &ArchiveSchema,
        options: &LoadOptions,
    ) -> Result<Self, ArchiveError> {
        let root = NodePath::root();
        if !container.has_child(&root, &options.job_key)? {
            return Err(ArchiveError::MissingRequiredField {
                path: root.join(&options.job_key).to_string(),
            });
        }

        let binder = Binder::new(container.clone(), schema, options.leaf_policy);
        let mut jobs = container
            .list_children(&root.join(&options.job_key))?
            .into_iter()
            .map(|(_, slot)| dispatch(&binder, &slot))
            .collect::<Result<Vec<_>, _>>()?;
        jobs.sort_by_key(Job::sort_index);

        tracing::debug!(jobs = jobs.len(), "archive opened");
        Ok(Self {
            container,
            jobs,
            declared: schema.leaf_fields(),
            index: OnceCell::new(),
        })
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn container(&self) -> &Arc<dyn Container> {
        &self.container
    }

    /// Flattening index over every job, built on first use.
    ///
    /// Every leaf field the schema declares is a key, populated or not.
    pub fn index(&self) -> &FlatIndex {
        self.index.get_or_init(|| {
            FlatIndex::with_declared(self.declared.iter().cloned(), self.jobs.iter().map(Job::node))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::MemoryContainer;
    use crate::job::JobKind;
    use serde_json::json;

    fn open(tree: serde_json::Value) -> Result<Archive, ArchiveError> {
        let schema = ArchiveSchema::qchem()?;
        let container = Arc::new(MemoryContainer::from_json(&tree)?);
        Archive::open(container, &schema, &LoadOptions::default())
    }

    fn sp(energy: f64) -> serde_json::Value {
        json!({
            "aobasis": { "nbasis": 2 },
            "structure": { "coordinates": [[0.0, 0.0, 0.0], [0.0, 0.0, 0.74]] },
            "energy_function": { "0": { "energy": energy } }
        })
    }

    #[test]
    fn test_jobs_sorted_by_slot() {
        let archive = open(json!({
            "job": {
                "2": { "sp": sp(-2.0) },
                "0": { "sp": sp(-0.5) },
                "1": { "geom_opt": { "iter": { "0": { "sp": sp(-1.0) } } } }
            }
        }))
        .unwrap();

        let order: Vec<(Option<u64>, JobKind)> = archive
            .jobs()
            .iter()
            .map(|job| (job.sort_index(), job.kind()))
            .collect();
        assert_eq!(
            order,
            vec![
                (Some(0), JobKind::SinglePoint),
                (Some(1), JobKind::GeomOpt),
                (Some(2), JobKind::SinglePoint),
            ]
        );
    }

    #[test]
    fn test_missing_job_group() {
        let err = open(json!({ "other": {} })).unwrap_err();
        assert!(matches!(err, ArchiveError::MissingRequiredField { path } if path == "/job"));
    }

    #[test]
    fn test_index_built_once_over_all_jobs() {
        let archive = open(json!({
            "job": {
                "1": { "sp": sp(-2.0) },
                "0": { "sp": sp(-1.0) }
            }
        }))
        .unwrap();

        let first = archive.index() as *const FlatIndex;
        let second = archive.index() as *const FlatIndex;
        assert_eq!(first, second);

        let energies: Vec<f64> = archive
            .index()
            .read("energy")
            .unwrap()
            .iter()
            .filter_map(|a| a.item())
            .collect();
        assert_eq!(energies, vec![-1.0, -2.0]);
    }

    #[test]
    fn test_empty_job_list() {
        let archive = open(json!({ "job": {} })).unwrap();
        assert!(archive.is_empty());
        // Declared fields stay queryable with nothing bound.
        assert!(archive.index().get("energy").unwrap().is_empty());
        assert!(archive.index().get("dipole").is_err());
    }
}
