//! Where library files live in the output file map.
//!
//! Project-local libraries sit next to the project file:
//!
//! ```text
//! <lib>.kicad_sym
//! <lib>.pretty/<footprint>.kicad_mod
//! <lib>.3dshapes/<model>
//! fp-lib-table
//! sym-lib-table
//! ```
//!
//! The other modes use the package directory layout:
//!
//! ```text
//! symbols/<lib>.kicad_sym
//! footprints/<lib>.pretty/<footprint>.kicad_mod
//! 3dmodels/<lib>.3dshapes/<model>
//! ```

use crate::kicad::{PROJECT_PATH_VAR, THIRD_PARTY_PATH_VAR};

use super::model_paths::ModelPathMode;

/// File layout for one model path mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    mode: ModelPathMode,
}

impl Layout {
    /// Layout for `mode`.
    #[must_use]
    pub const fn new(mode: ModelPathMode) -> Self {
        Self { mode }
    }

    /// The model path mode.
    #[must_use]
    pub const fn mode(&self) -> &ModelPathMode {
        &self.mode
    }

    const fn packaged_tree(&self) -> bool {
        !matches!(self.mode, ModelPathMode::ProjectLocal)
    }

    fn in_dir(&self, dir: &str, path: String) -> String {
        if self.packaged_tree() {
            format!("{dir}/{path}")
        } else {
            path
        }
    }

    /// Symbol library file.
    #[must_use]
    pub fn symbol_file(&self, library: &str) -> String {
        self.in_dir("symbols", format!("{library}.kicad_sym"))
    }

    /// Footprint library directory.
    #[must_use]
    pub fn footprint_dir(&self, library: &str) -> String {
        self.in_dir("footprints", format!("{library}.pretty"))
    }

    /// One footprint file.
    #[must_use]
    pub fn footprint_file(&self, library: &str, footprint: &str) -> String {
        format!("{}/{footprint}.kicad_mod", self.footprint_dir(library))
    }

    /// One 3D model file.
    #[must_use]
    pub fn model_file(&self, library: &str, basename: &str) -> String {
        self.in_dir("3dmodels", format!("{library}.3dshapes/{basename}"))
    }

    /// `uri` of the footprint library in `fp-lib-table`.
    #[must_use]
    pub fn footprint_uri(&self, library: &str) -> String {
        match &self.mode {
            ModelPathMode::Packaged { package_id } => {
                format!("{THIRD_PARTY_PATH_VAR}/footprints/{package_id}/{library}.pretty")
            }
            _ => format!("{PROJECT_PATH_VAR}/{}", self.footprint_dir(library)),
        }
    }

    /// `uri` of the symbol library in `sym-lib-table`.
    #[must_use]
    pub fn symbol_uri(&self, library: &str) -> String {
        match &self.mode {
            ModelPathMode::Packaged { package_id } => {
                format!("{THIRD_PARTY_PATH_VAR}/symbols/{package_id}/{library}.kicad_sym")
            }
            _ => format!("{PROJECT_PATH_VAR}/{}", self.symbol_file(library)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_local_is_flat() {
        let layout = Layout::new(ModelPathMode::ProjectLocal);
        assert_eq!(layout.symbol_file("lib"), "lib.kicad_sym");
        assert_eq!(layout.footprint_file("lib", "R1"), "lib.pretty/R1.kicad_mod");
        assert_eq!(layout.footprint_uri("lib"), "${KIPRJMOD}/lib.pretty");
    }

    #[test]
    fn relative_mode_uses_package_tree() {
        let layout = Layout::new(ModelPathMode::RelativeToFootprint);
        assert_eq!(layout.symbol_file("lib"), "symbols/lib.kicad_sym");
        assert_eq!(
            layout.footprint_file("lib", "R1"),
            "footprints/lib.pretty/R1.kicad_mod"
        );
        assert_eq!(layout.symbol_uri("lib"), "${KIPRJMOD}/symbols/lib.kicad_sym");
    }

    #[test]
    fn packaged_uris_point_at_install_dir() {
        let layout = Layout::new(ModelPathMode::Packaged {
            package_id: "com_example".into(),
        });
        assert_eq!(
            layout.footprint_uri("lib"),
            "${KICAD9_3RD_PARTY}/footprints/com_example/lib.pretty"
        );
        assert_eq!(layout.model_file("lib", "a.step"), "3dmodels/lib.3dshapes/a.step");
    }
}
