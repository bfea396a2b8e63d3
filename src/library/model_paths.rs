//! 3D model path resolution.
//!
//! Footprints reference their 3D models by path. Where that path must point
//! depends on how the library is deployed:
//!
//! | Mode                  | Reference written into the footprint                               |
//! |-----------------------|--------------------------------------------------------------------|
//! | `ProjectLocal`        | `${KIPRJMOD}/<lib>.3dshapes/<file>`                                |
//! | `RelativeToFootprint` | `../../3dmodels/<lib>.3dshapes/<file>`                             |
//! | `Packaged`            | `${KICAD9_3RD_PARTY}/3dmodels/<package-id>/<lib>.3dshapes/<file>`  |
//!
//! Only references this crate owns are rewritten: those under `${KIPRJMOD}`
//! or under a `3dmodels/` directory. Stock KiCad references (for example
//! `${KICAD9_3DMODEL_DIR}/...`) pass through untouched.

use crate::kicad::{PROJECT_PATH_VAR, THIRD_PARTY_PATH_VAR};

use super::extract::FootprintEntry;
use super::layout::Layout;

/// How 3D model references are written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ModelPathMode {
    /// Relative to the KiCad project directory.
    #[default]
    ProjectLocal,
    /// Relative to the footprint file inside a `footprints/<lib>.pretty` tree.
    RelativeToFootprint,
    /// Inside an installed KiCad package.
    Packaged {
        /// Package identifier (e.g. `com_example_parts`).
        package_id: String,
    },
}

/// File name of a model reference.
///
/// Accepts `/` and `\` separators and drops URL query strings and fragments.
/// Returns `None` when nothing is left.
#[must_use]
pub fn model_basename(reference: &str) -> Option<&str> {
    let end = reference.find(['?', '#']).unwrap_or(reference.len());
    reference[..end]
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

/// Returns true if `reference` is one this crate rewrites.
#[must_use]
pub fn needs_rewrite(reference: &str) -> bool {
    let normalised = reference.replace('\\', "/");
    if normalised.contains(PROJECT_PATH_VAR) {
        return true;
    }
    let segments: Vec<&str> = normalised.split('/').collect();
    segments
        .iter()
        .take(segments.len().saturating_sub(1))
        .any(|s| *s == "3dmodels")
}

/// Model reference for `basename` in `library` under `mode`.
#[must_use]
pub fn library_model_path(library: &str, basename: &str, mode: &ModelPathMode) -> String {
    match mode {
        ModelPathMode::ProjectLocal => format!("{PROJECT_PATH_VAR}/{library}.3dshapes/{basename}"),
        ModelPathMode::RelativeToFootprint => format!("../../3dmodels/{library}.3dshapes/{basename}"),
        ModelPathMode::Packaged { package_id } => format!(
            "{THIRD_PARTY_PATH_VAR}/3dmodels/{package_id}/{library}.3dshapes/{basename}"
        ),
    }
}

/// Rewrites one reference for `mode`.
///
/// Returns `None` when the reference is not one this crate rewrites or has
/// no file name.
#[must_use]
pub fn resolve_model_path(existing: &str, library: &str, mode: &ModelPathMode) -> Option<String> {
    if !needs_rewrite(existing) {
        return None;
    }
    let basename = model_basename(existing)?;
    Some(library_model_path(library, basename, mode))
}

/// Rewrites every `(model ...)` reference of a footprint entry.
///
/// Returns the number of rewritten references.
pub fn rewrite_footprint_models(entry: &mut FootprintEntry, library: &str, mode: &ModelPathMode) -> usize {
    let mut rewritten = 0;
    if let Some(items) = entry.mod_data.items_mut() {
        for model in items.iter_mut().filter(|item| item.is("model")) {
            let Some(resolved) = model
                .arg_text(0)
                .and_then(|existing| resolve_model_path(existing, library, mode))
            else {
                continue;
            };
            if model.set_arg(0, crate::kicad::Sexpr::string(resolved)) {
                rewritten += 1;
            }
        }
    }
    rewritten
}

/// File map location where the copy of a model belongs.
#[must_use]
pub fn model_destination(library: &str, mode: &ModelPathMode, basename: &str) -> String {
    Layout::new(mode.clone()).model_file(library, basename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basename_handles_separators_and_urls() {
        assert_eq!(model_basename("a/b/c.step"), Some("c.step"));
        assert_eq!(model_basename("C:\\models\\c.step"), Some("c.step"));
        assert_eq!(model_basename("https://x.io/m/c.step?v=2#top"), Some("c.step"));
        assert_eq!(model_basename("dir/"), None);
    }

    #[test]
    fn rewrite_detection() {
        assert!(needs_rewrite("${KIPRJMOD}/lib.3dshapes/a.step"));
        assert!(needs_rewrite("..\\..\\3dmodels\\lib.3dshapes\\a.step"));
        assert!(!needs_rewrite("${KICAD9_3DMODEL_DIR}/Resistor_SMD.3dshapes/R_0402.step"));
        assert!(!needs_rewrite("3dmodels"));
    }

    #[test]
    fn modes() {
        let existing = "${KIPRJMOD}/old.3dshapes/a.step";
        assert_eq!(
            resolve_model_path(existing, "lib", &ModelPathMode::ProjectLocal).as_deref(),
            Some("${KIPRJMOD}/lib.3dshapes/a.step")
        );
        assert_eq!(
            resolve_model_path(existing, "lib", &ModelPathMode::RelativeToFootprint).as_deref(),
            Some("../../3dmodels/lib.3dshapes/a.step")
        );
        let packaged = ModelPathMode::Packaged {
            package_id: "com_example".into(),
        };
        assert_eq!(
            resolve_model_path(existing, "lib", &packaged).as_deref(),
            Some("${KICAD9_3RD_PARTY}/3dmodels/com_example/lib.3dshapes/a.step")
        );
        assert!(resolve_model_path("${KICAD9_3DMODEL_DIR}/x.step", "lib", &packaged).is_none());
    }

    #[test]
    fn destinations() {
        assert_eq!(
            model_destination("lib", &ModelPathMode::ProjectLocal, "a.step"),
            "lib.3dshapes/a.step"
        );
        assert_eq!(
            model_destination("lib", &ModelPathMode::RelativeToFootprint, "a.step"),
            "3dmodels/lib.3dshapes/a.step"
        );
    }
}
