//! Jobs: the discriminated union over top-level computational records.

use std::fmt;

use crate::binder::TypedNode;
use crate::container::LeafArray;
use crate::error::ArchiveError;

/// Concrete job variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    SinglePoint,
    GeomOpt,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::SinglePoint => f.write_str("sp"),
            JobKind::GeomOpt => f.write_str("geom_opt"),
        }
    }
}

/// One bound job. The variant is fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    SinglePoint(TypedNode),
    GeomOpt(TypedNode),
}

impl Job {
    pub fn new(kind: JobKind, node: TypedNode) -> Self {
        match kind {
            JobKind::SinglePoint => Job::SinglePoint(node),
            JobKind::GeomOpt => Job::GeomOpt(node),
        }
    }

    pub fn kind(&self) -> JobKind {
        match self {
            Job::SinglePoint(_) => JobKind::SinglePoint,
            Job::GeomOpt(_) => JobKind::GeomOpt,
        }
    }

    pub fn node(&self) -> &TypedNode {
        match self {
            Job::SinglePoint(node) | Job::GeomOpt(node) => node,
        }
    }

    /// Position of the job in the archive's job list.
    pub fn sort_index(&self) -> Option<u64> {
        self.node().sort_index()
    }

    /// Optimization steps in order; empty for single points.
    pub fn iterations(&self) -> &[TypedNode] {
        match self {
            Job::SinglePoint(_) => &[],
            Job::GeomOpt(node) => node.sequence("iter").unwrap_or(&[]),
        }
    }

    /// Every single-point evaluation in order: the job itself, or one per
    /// optimization step.
    pub fn single_points(&self) -> Vec<&TypedNode> {
        match self {
            Job::SinglePoint(node) => vec![node],
            Job::GeomOpt(_) => self
                .iterations()
                .iter()
                .filter_map(|iteration| iteration.node("sp"))
                .collect(),
        }
    }

    /// Final energy: the last energy-function entry of the last single point.
    pub fn energy(&self) -> Result<f64, ArchiveError> {
        energy_of(self.final_single_point()?)
    }

    /// Energy of every single point (one per optimization step).
    pub fn energies(&self) -> Result<Vec<f64>, ArchiveError> {
        self.single_points().into_iter().map(energy_of).collect()
    }

    pub fn gradient(&self) -> Result<Option<&LeafArray>, ArchiveError> {
        self.optional_array("gradient")
    }

    pub fn hessian(&self) -> Result<Option<&LeafArray>, ArchiveError> {
        self.optional_array("hessian")
    }

    /// Molecular-orbital coefficients of the final energy evaluation.
    pub fn mo_coefficients(&self) -> Result<&LeafArray, ArchiveError> {
        let mut node = last_energy_function(self.final_single_point()?)?;
        for name in ["method", "scf", "molecular_orbitals"] {
            node = node
                .node(name)
                .ok_or_else(|| ArchiveError::MissingRequiredField {
                    path: node.source().join(name).to_string(),
                })?;
        }
        required_leaf(node, "mo_coefficients")?.read()
    }

    /// Alpha-spin coefficients: the first slab of [`Job::mo_coefficients`].
    pub fn alpha_mo_coefficients(&self) -> Result<LeafArray, ArchiveError> {
        let coefficients = self.mo_coefficients()?;
        coefficients.slab(0).ok_or_else(|| not_spin_resolved(self))
    }

    /// Beta-spin coefficients: the last slab of [`Job::mo_coefficients`].
    pub fn beta_mo_coefficients(&self) -> Result<LeafArray, ArchiveError> {
        let coefficients = self.mo_coefficients()?;
        coefficients.last_slab().ok_or_else(|| not_spin_resolved(self))
    }

    fn final_single_point(&self) -> Result<&TypedNode, ArchiveError> {
        match self {
            Job::SinglePoint(node) => Ok(node),
            Job::GeomOpt(node) => self
                .iterations()
                .last()
                .and_then(|iteration| iteration.node("sp"))
                .ok_or_else(|| ArchiveError::MissingRequiredField {
                    path: node.source().join("iter").to_string(),
                }),
        }
    }

    fn optional_array(&self, name: &str) -> Result<Option<&LeafArray>, ArchiveError> {
        let entry = last_energy_function(self.final_single_point()?)?;
        entry.leaf(name).map(|leaf| leaf.read()).transpose()
    }
}

fn last_energy_function(sp: &TypedNode) -> Result<&TypedNode, ArchiveError> {
    sp.sequence("energy_function")
        .and_then(<[TypedNode]>::last)
        .ok_or_else(|| ArchiveError::MissingRequiredField {
            path: sp.source().join("energy_function").to_string(),
        })
}

fn required_leaf<'a>(
    node: &'a TypedNode,
    name: &str,
) -> Result<&'a crate::binder::LeafValue, ArchiveError> {
    node.leaf(name)
        .ok_or_else(|| ArchiveError::MissingRequiredField {
            path: node.source().join(name).to_string(),
        })
}

fn energy_of(sp: &TypedNode) -> Result<f64, ArchiveError> {
    let leaf = required_leaf(last_energy_function(sp)?, "energy")?;
    leaf.read()?.item().ok_or_else(|| ArchiveError::SchemaError {
        path: leaf.path().to_string(),
        message: "energy is not a scalar".to_string(),
    })
}

fn not_spin_resolved(job: &Job) -> ArchiveError {
    ArchiveError::SchemaError {
        path: job.node().source().to_string(),
        message: "molecular-orbital coefficients have no spin axis".to_string(),
    }
}
