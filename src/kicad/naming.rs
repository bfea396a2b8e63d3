//! KiCad naming rules.
//!
//! Library identifiers have the form `{LIBRARY}:{NAME}`. Library nicknames
//! and entry names become file names (`{NAME}.kicad_mod`, `{LIBRARY}.pretty`),
//! so they are restricted to characters every file system accepts.
//!
//! Examples:
//! - `Device:R` - symbol `R` in library `Device`
//! - `my_lib:resistor_0402` - footprint `resistor_0402` in library `my_lib`

use std::sync::OnceLock;

use regex::Regex;

/// Characters that are not allowed in a library entry name.
fn invalid_name_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^A-Za-z0-9_.+\-]+").expect("valid regex"))
}

/// Replaces characters KiCad or the file system would reject with `_`.
///
/// Runs of invalid characters collapse into a single underscore and an empty
/// result becomes `unnamed`.
///
/// # Examples
///
/// ```
/// use circuit_to_kicad::kicad::naming::sanitize_name;
///
/// assert_eq!(sanitize_name("My Chip (v2)"), "My_Chip_v2_");
/// assert_eq!(sanitize_name("R1"), "R1");
/// ```
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    let cleaned = invalid_name_chars().replace_all(name.trim(), "_");
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned.into_owned()
    }
}

/// Builds a `{LIBRARY}:{NAME}` identifier.
#[must_use]
pub fn lib_id(library: &str, name: &str) -> String {
    format!("{library}:{name}")
}

/// Splits a `{LIBRARY}:{NAME}` identifier.
///
/// Returns `(None, name)` when the identifier carries no library prefix.
#[must_use]
pub fn split_lib_id(id: &str) -> (Option<&str>, &str) {
    match id.split_once(':') {
        Some((library, name)) => (Some(library), name),
        None => (None, id),
    }
}

/// Returns the entry name of an identifier with any library prefix removed.
#[must_use]
pub fn strip_lib_prefix(id: &str) -> &str {
    split_lib_id(id).1
}

/// Renames a symbol unit (`{NAME}_{UNIT}_{STYLE}`) to a new parent name.
///
/// Returns `None` if `unit` does not belong to `parent`.
#[must_use]
pub fn rename_unit(unit: &str, parent: &str, new_parent: &str) -> Option<String> {
    let suffix = unit.strip_prefix(parent)?.strip_prefix('_')?;
    let mut parts = suffix.split('_');
    let is_unit_suffix = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(u), Some(s), None) if u.chars().all(|c| c.is_ascii_digit())
            && s.chars().all(|c| c.is_ascii_digit())
    );
    is_unit_suffix.then(|| format!("{new_parent}_{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_valid_names() {
        assert_eq!(sanitize_name("resistor_0402"), "resistor_0402");
        assert_eq!(sanitize_name("SOT-23"), "SOT-23");
    }

    #[test]
    fn sanitize_replaces_invalid() {
        assert_eq!(sanitize_name("a/b\\c:d"), "a_b_c_d");
        assert_eq!(sanitize_name("  "), "unnamed");
    }

    #[test]
    fn lib_id_split() {
        assert_eq!(split_lib_id("lib:R"), (Some("lib"), "R"));
        assert_eq!(split_lib_id("R"), (None, "R"));
        assert_eq!(strip_lib_prefix("lib:R"), "R");
        assert_eq!(lib_id("lib", "R"), "lib:R");
    }

    #[test]
    fn unit_rename() {
        assert_eq!(rename_unit("box_0_1", "box", "U1"), Some("U1_0_1".to_string()));
        assert_eq!(rename_unit("box_1_1", "box", "U1"), Some("U1_1_1".to_string()));
        assert_eq!(rename_unit("boxer_1_1", "box", "U1"), None);
        assert_eq!(rename_unit("box_a_1", "box", "U1"), None);
    }
}
