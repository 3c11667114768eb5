//! Node kinds of a Q-Chem archive.

use crate::descriptor::{FieldSpec, KindRegistry, KindSpec};
use crate::dispatch::VariantRegistry;
use crate::error::ArchiveError;
use crate::job::JobKind;

pub const SINGLE_POINT: KindSpec = KindSpec {
    name: "SinglePoint",
    fields: &[
        FieldSpec::new("aobasis", "AoBasis"),
        FieldSpec::new("energy_function", "Sequence[EnergyFunction]"),
        FieldSpec::new("structure", "Structure"),
        FieldSpec::new("observables", "Optional[Observables]"),
    ],
};

pub const GEOM_OPT: KindSpec = KindSpec {
    name: "GeomOpt",
    fields: &[FieldSpec::new("iter", "Sequence[Iteration]")],
};

/// One optimization step; embeds a single-point evaluation.
pub const ITERATION: KindSpec = KindSpec {
    name: "Iteration",
    fields: &[FieldSpec::variant("sp", "SinglePoint", "sp")],
};

pub const ENERGY_FUNCTION: KindSpec = KindSpec {
    name: "EnergyFunction",
    fields: &[
        FieldSpec::new("energy", "float"),
        FieldSpec::new("gradient", "Optional[ndarray]"),
        FieldSpec::new("hessian", "Optional[ndarray]"),
        FieldSpec::new("method", "Optional[Method]"),
    ],
};

pub const METHOD: KindSpec = KindSpec {
    name: "Method",
    fields: &[FieldSpec::new("scf", "Optional[Scf]")],
};

pub const SCF: KindSpec = KindSpec {
    name: "Scf",
    fields: &[FieldSpec::new(
        "molecular_orbitals",
        "Optional[MolecularOrbitals]",
    )],
};

pub const MOLECULAR_ORBITALS: KindSpec = KindSpec {
    name: "MolecularOrbitals",
    fields: &[
        FieldSpec::new("mo_coefficients", "ndarray"),
        FieldSpec::new("mo_energies", "Optional[ndarray]"),
    ],
};

pub const STRUCTURE: KindSpec = KindSpec {
    name: "Structure",
    fields: &[
        FieldSpec::new("coordinates", "ndarray"),
        FieldSpec::new("atomic_numbers", "Optional[ndarray]"),
        FieldSpec::new("charge", "Optional[int]"),
        FieldSpec::new("multiplicity", "Optional[int]"),
    ],
};

pub const AO_BASIS: KindSpec = KindSpec {
    name: "AoBasis",
    fields: &[
        FieldSpec::new("nbasis", "int"),
        FieldSpec::new("shell_types", "Optional[ndarray]"),
    ],
};

pub const OBSERVABLES: KindSpec = KindSpec {
    name: "Observables",
    fields: &[FieldSpec::new("multipole_moments", "Optional[ndarray]")],
};

pub const QCHEM_KINDS: &[KindSpec] = &[
    SINGLE_POINT,
    GEOM_OPT,
    ITERATION,
    ENERGY_FUNCTION,
    METHOD,
    SCF,
    MOLECULAR_ORBITALS,
    STRUCTURE,
    AO_BASIS,
    OBSERVABLES,
];

/// Node kinds plus job variants: everything a binding pass resolves against.
#[derive(Debug, Clone)]
pub struct ArchiveSchema {
    pub kinds: KindRegistry,
    pub variants: VariantRegistry,
}

impl ArchiveSchema {
    /// The standard Q-Chem archive layout: `sp` and `geom_opt` jobs.
    pub fn qchem() -> Result<Self, ArchiveError> {
        Ok(Self {
            kinds: KindRegistry::from_specs(QCHEM_KINDS)?,
            variants: VariantRegistry::new()
                .register("sp", JobKind::SinglePoint, SINGLE_POINT.name)
                .register("geom_opt", JobKind::GeomOpt, GEOM_OPT.name),
        })
    }

    /// Every leaf field name a job of any registered variant can carry.
    pub fn leaf_fields(&self) -> Vec<String> {
        let roots = self
            .variants
            .discriminants()
            .filter_map(|discriminant| self.variants.get(discriminant))
            .map(|variant| variant.node_kind.as_str());
        self.kinds.leaf_fields(roots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ResolvedType;

    #[test]
    fn test_every_declared_type_resolves() {
        let schema = ArchiveSchema::qchem().unwrap();
        for name in schema.kinds.names() {
            let kind = schema.kinds.get(name).unwrap();
            for field in &kind.fields {
                assert!(
                    schema.kinds.resolve(&field.declared_type.base).is_some(),
                    "{}.{} declares unresolved `{}`",
                    name,
                    field.field_name,
                    field.declared_type
                );
            }
        }
    }

    #[test]
    fn test_variants_point_at_kinds() {
        let schema = ArchiveSchema::qchem().unwrap();
        for discriminant in schema.variants.discriminants() {
            let variant = schema.variants.get(discriminant).unwrap();
            assert!(matches!(
                schema.kinds.resolve(&variant.node_kind),
                Some(ResolvedType::Kind(_))
            ));
        }
    }

    #[test]
    fn test_leaf_fields_cover_every_job_kind() {
        let schema = ArchiveSchema::qchem().unwrap();
        let fields = schema.leaf_fields();
        for name in ["nbasis", "energy", "hessian", "mo_coefficients", "charge", "multipole_moments"] {
            assert!(fields.iter().any(|f| f == name), "missing {name}");
        }
        assert!(!fields.iter().any(|f| f == "structure" || f == "iter"));
    }
}
