//! JSON Pointer helpers for schema paths and `$ref` targets.

use std::borrow::Cow;

/// Escape a single path segment per RFC 6901.
///
/// - `~` → `~0`
/// - `/` → `~1`
///
/// Returns `Cow::Borrowed` when no escaping is needed (the common case).
pub fn escape_pointer_segment(segment: &str) -> Cow<'_, str> {
    if segment.contains('~') || segment.contains('/') {
        Cow::Owned(segment.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(segment)
    }
}

/// Build a JSON Pointer path by appending segments to a parent path.
///
/// Each segment is escaped per RFC 6901 before joining.
///
/// # Example
/// ```
/// use qarchive_core::build_path;
/// assert_eq!(build_path("#", &["properties", "a/b"]), "#/properties/a~1b");
/// ```
pub fn build_path(parent: &str, segments: &[&str]) -> String {
    let mut path = parent.to_string();
    for segment in segments {
        path.push('/');
        path.push_str(&escape_pointer_segment(segment));
    }
    path
}

/// `$ref` target of a definition hoisted to the document root.
pub fn definition_ref(name: &str) -> String {
    build_path("#", &[name])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_pointer_segment() {
        assert_eq!(escape_pointer_segment("geom_opt"), "geom_opt");
        assert_eq!(escape_pointer_segment("a/b"), "a~1b");
        assert_eq!(escape_pointer_segment("a~b"), "a~0b");
        assert!(matches!(escape_pointer_segment("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_build_path() {
        assert_eq!(build_path("#", &[]), "#");
        assert_eq!(
            build_path("#/properties/job", &["items", "properties"]),
            "#/properties/job/items/properties"
        );
    }

    #[test]
    fn test_definition_ref() {
        assert_eq!(definition_ref("sp"), "#/sp");
        assert_eq!(definition_ref("a/b"), "#/a~1b");
    }
}
