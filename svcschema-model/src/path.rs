//! Dotted / bracketed addressing of nested properties.
//!
//! `metadata.owner` names a field of an object property, `ports[1]` an
//! element of an array property.

/// Path of the property `name` under `parent` (empty for top level).
pub fn child(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

/// Path of element `index` of the array at `parent`.
pub fn index(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

/// Path used to report problems with an array's element definition.
pub fn items(parent: &str) -> String {
    format!("{parent}[*]")
}
