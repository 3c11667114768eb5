//! Leaf rewrite tables: container type names and relocated references.

/// How a source `type` value maps onto the target dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TypeRewrite {
    /// Replace with a standard type name.
    Mapped(&'static str),
    /// Becomes `array`; `items` defaults to a generic object.
    Collection,
    /// Already a standard type name.
    Standard,
    /// Unrecognized; emitted unchanged.
    Passthrough,
}

const STANDARD_TYPES: &[&str] = &[
    "object", "array", "string", "number", "integer", "boolean", "null",
];

/// Source `$ref` targets that moved in the target layout.
const RELOCATED_REFS: &[(&str, &str)] = &[(
    "#/observables/multipole_moments",
    "#/observables/properties/multipole_moments",
)];

pub(crate) fn rewrite_type(name: &str) -> TypeRewrite {
    match name {
        "layer" => TypeRewrite::Mapped("object"),
        "iterable_layer" | "countable_layer" => TypeRewrite::Collection,
        "double" | "std::complex<double>" => TypeRewrite::Mapped("number"),
        "int" | "size_t" | "unsigned" => TypeRewrite::Mapped("integer"),
        "bool" => TypeRewrite::Mapped("boolean"),
        _ if STANDARD_TYPES.contains(&name) => TypeRewrite::Standard,
        _ => TypeRewrite::Passthrough,
    }
}

pub(crate) fn rewrite_ref(target: &str) -> &str {
    RELOCATED_REFS
        .iter()
        .find(|(from, _)| *from == target)
        .map(|(_, to)| *to)
        .unwrap_or(target)
}
