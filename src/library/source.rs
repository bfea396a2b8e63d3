//! Where library components come from.
//!
//! A library build consumes an ordered list of [`ComponentSource`]s. They
//! can be supplied directly, or gathered from source files through two
//! collaborators:
//!
//! - [`ExportEnumerator`] lists the components a source file exports
//! - [`ComponentRenderer`] renders one export into a circuit description
//!
//! [`JsonFileSource`] implements both for plain circuit-description files:
//! each file exports one component named after its file stem.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::circuit::CircuitIndex;
use crate::kicad::{ConvertError, ConvertResult};

/// One component to add to the library.
#[derive(Debug, Clone)]
pub struct ComponentSource {
    /// Component name; user entries are named after it.
    pub name: String,
    /// The component's circuit description.
    pub circuit: CircuitIndex,
}

impl ComponentSource {
    /// Creates a source.
    #[must_use]
    pub fn new(name: impl Into<String>, circuit: CircuitIndex) -> Self {
        Self {
            name: name.into(),
            circuit,
        }
    }
}

/// Lists the exported components of a source file.
pub trait ExportEnumerator {
    /// Returns export names in file order.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or understood.
    fn exports(&self, path: &Path) -> ConvertResult<Vec<String>>;
}

/// Renders one exported component into a circuit description.
pub trait ComponentRenderer {
    /// Renders `export` from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Render`] if the component cannot be rendered.
    fn render(&self, path: &Path, export: &str) -> ConvertResult<CircuitIndex>;
}

/// Circuit-description JSON files, one component per file.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFileSource;

impl ExportEnumerator for JsonFileSource {
    fn exports(&self, path: &Path) -> ConvertResult<Vec<String>> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ConvertError::invalid_input(format!("No component name in '{}'", path.display()))
            })?;
        Ok(vec![stem.to_string()])
    }
}

impl ComponentRenderer for JsonFileSource {
    fn render(&self, path: &Path, export: &str) -> ConvertResult<CircuitIndex> {
        let json = fs::read_to_string(path).map_err(|e| ConvertError::render(export, e.to_string()))?;
        CircuitIndex::from_json(&json).map_err(|e| ConvertError::render(export, e.to_string()))
    }
}

/// Expands glob patterns into a sorted, de-duplicated file list.
///
/// # Errors
///
/// Returns [`ConvertError::InvalidInput`] for a malformed pattern.
pub fn expand_patterns<S: AsRef<str>>(patterns: &[S]) -> ConvertResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let matches = glob::glob(pattern)
            .map_err(|e| ConvertError::invalid_input(format!("Bad pattern '{pattern}': {e}")))?;
        let before = paths.len();
        for entry in matches {
            match entry {
                Ok(path) if path.is_file() => paths.push(path),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Unreadable path while expanding pattern"),
            }
        }
        if paths.len() == before {
            warn!(pattern = %pattern, "Pattern matched no files");
        }
    }
    paths.sort();
    paths.dedup();
    Ok(paths)
}

/// Gathers components from source files, in path then export order.
///
/// Files that cannot be enumerated and exports that cannot be rendered are
/// skipped with a warning.
pub fn gather_components<E, R>(paths: &[PathBuf], enumerator: &E, renderer: &R) -> Vec<ComponentSource>
where
    E: ExportEnumerator + ?Sized,
    R: ComponentRenderer + ?Sized,
{
    let mut components = Vec::new();
    for path in paths {
        let exports = match enumerator.exports(path) {
            Ok(exports) => exports,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot list exports, skipping file");
                continue;
            }
        };
        for export in exports {
            match renderer.render(path, &export) {
                Ok(circuit) => {
                    debug!(component = %export, elements = circuit.element_count(), "Rendered component");
                    components.push(ComponentSource::new(export, circuit));
                }
                Err(e) => warn!(component = %export, error = %e, "Cannot render component, skipping"),
            }
        }
    }
    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn json_files_export_their_stem() {
        let exports = JsonFileSource.exports(Path::new("parts/U1.json")).unwrap();
        assert_eq!(exports, ["U1"]);
    }

    #[test]
    fn gather_skips_broken_files() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("R1.json");
        let bad = dir.path().join("broken.json");
        fs::write(&good, r#"[{"type": "source_component", "source_component_id": "sc0", "name": "R1"}]"#).unwrap();
        fs::write(&bad, "not json").unwrap();

        let pattern = format!("{}/*.json", dir.path().display());
        let paths = expand_patterns(&[pattern]).unwrap();
        assert_eq!(paths.len(), 2);

        let components = gather_components(&paths, &JsonFileSource, &JsonFileSource);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].name, "R1");
    }

    #[test]
    fn bad_pattern_is_an_error() {
        assert!(expand_patterns(&["[".to_string()]).is_err());
    }
}
