//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use serde::Deserialize;

use crate::circuit::Point;
use crate::convert::{
    ConvertOptions, DEFAULT_BOARD_THICKNESS, DEFAULT_PCB_ORIGIN, DEFAULT_SCHEMATIC_ORIGIN,
    DEFAULT_SCHEMATIC_SCALE,
};
use crate::error::ConfigError;
use crate::library::{LibraryOptions, ModelPathMode, DEFAULT_BUILTIN_LIBRARY};

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Library build settings.
    #[serde(default)]
    pub library: LibraryConfig,

    /// Schematic placement settings.
    #[serde(default)]
    pub schematic: SchematicConfig,

    /// Board settings.
    #[serde(default)]
    pub pcb: PcbConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, name) in [
            ("library.name", &self.library.name),
            ("library.builtin_name", &self.library.builtin_name),
        ] {
            if name.trim().is_empty() {
                return Err(invalid(field, "must not be empty".to_string()));
            }
            if name.contains([':', '/', '\\']) {
                return Err(invalid(
                    field,
                    format!("'{name}' must not contain ':', '/' or '\\'"),
                ));
            }
        }
        if self.library.name == self.library.builtin_name {
            return Err(invalid(
                "library.builtin_name",
                format!("must differ from library.name ('{}')", self.library.name),
            ));
        }
        if self.library.model_path_mode == ModelPathModeConfig::Packaged
            && self
                .library
                .package_id
                .as_deref()
                .map_or(true, |id| id.trim().is_empty())
        {
            return Err(invalid(
                "library.package_id",
                "required when model_path_mode is 'packaged'".to_string(),
            ));
        }
        if !(self.schematic.scale > 0.0) {
            return Err(invalid(
                "schematic.scale",
                format!("must be positive, got {}", self.schematic.scale),
            ));
        }
        if !(self.pcb.board_thickness > 0.0) {
            return Err(invalid(
                "pcb.board_thickness",
                format!("must be positive, got {}", self.pcb.board_thickness),
            ));
        }
        Ok(())
    }

    /// Converter options for a project.
    #[must_use]
    pub fn convert_options(&self, project_name: &str) -> ConvertOptions {
        let [sx, sy] = self.schematic.origin;
        let [px, py] = self.pcb.origin;
        ConvertOptions {
            library_name: self.library.name.clone(),
            project_name: project_name.to_string(),
            schematic_scale: self.schematic.scale,
            schematic_origin: Point::new(sx, sy),
            pcb_origin: Point::new(px, py),
            board_thickness: self.pcb.board_thickness,
        }
    }

    /// Library build options.
    #[must_use]
    pub fn library_options(&self) -> LibraryOptions {
        let model_path_mode = match self.library.model_path_mode {
            ModelPathModeConfig::ProjectLocal => ModelPathMode::ProjectLocal,
            ModelPathModeConfig::RelativeToFootprint => ModelPathMode::RelativeToFootprint,
            ModelPathModeConfig::Packaged => ModelPathMode::Packaged {
                package_id: self.library.package_id.clone().unwrap_or_default(),
            },
        };
        LibraryOptions {
            library_name: self.library.name.clone(),
            builtin_library_name: self.library.builtin_name.clone(),
            model_path_mode,
            convert: self.convert_options(&self.library.name),
        }
    }
}

const fn invalid(field: &'static str, message: String) -> ConfigError {
    ConfigError::ValidationError { field, message }
}

/// How 3D model references are written, as spelled in the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelPathModeConfig {
    /// `${KIPRJMOD}/<lib>.3dshapes/...`
    #[default]
    ProjectLocal,
    /// `../../3dmodels/<lib>.3dshapes/...`
    RelativeToFootprint,
    /// `${KICAD9_3RD_PARTY}/3dmodels/<package_id>/...`
    Packaged,
}

/// Library build configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibraryConfig {
    /// User library nickname.
    #[serde(default = "default_library_name")]
    pub name: String,

    /// Builtin library nickname.
    #[serde(default = "default_builtin_name")]
    pub builtin_name: String,

    /// 3D model reference style.
    #[serde(default)]
    pub model_path_mode: ModelPathModeConfig,

    /// Package identifier for the `packaged` mode.
    #[serde(default)]
    pub package_id: Option<String>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            name: default_library_name(),
            builtin_name: default_builtin_name(),
            model_path_mode: ModelPathModeConfig::default(),
            package_id: None,
        }
    }
}

fn default_library_name() -> String {
    "circuit".to_string()
}

fn default_builtin_name() -> String {
    DEFAULT_BUILTIN_LIBRARY.to_string()
}

/// Schematic configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchematicConfig {
    /// Input units → millimetres.
    #[serde(default = "default_schematic_scale")]
    pub scale: f64,

    /// Sheet point the content is centred on, in mm.
    #[serde(default = "default_schematic_origin")]
    pub origin: [f64; 2],
}

impl Default for SchematicConfig {
    fn default() -> Self {
        Self {
            scale: default_schematic_scale(),
            origin: default_schematic_origin(),
        }
    }
}

const fn default_schematic_scale() -> f64 {
    DEFAULT_SCHEMATIC_SCALE
}

const fn default_schematic_origin() -> [f64; 2] {
    [DEFAULT_SCHEMATIC_ORIGIN.x, DEFAULT_SCHEMATIC_ORIGIN.y]
}

/// Board configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PcbConfig {
    /// Board point the content is centred on, in mm.
    #[serde(default = "default_pcb_origin")]
    pub origin: [f64; 2],

    /// Thickness used when the input gives none, in mm.
    #[serde(default = "default_board_thickness")]
    pub board_thickness: f64,
}

impl Default for PcbConfig {
    fn default() -> Self {
        Self {
            origin: default_pcb_origin(),
            board_thickness: default_board_thickness(),
        }
    }
}

const fn default_pcb_origin() -> [f64; 2] {
    [DEFAULT_PCB_ORIGIN.x, DEFAULT_PCB_ORIGIN.y]
}

const fn default_board_thickness() -> f64 {
    DEFAULT_BOARD_THICKNESS
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let json = r"{}";
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.library.name, "circuit");
        assert_eq!(config.library.builtin_name, "circuit_builtin");
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "_comment": "Test config",
            "library": {
                "name": "my_lib",
                "builtin_name": "my_builtin",
                "model_path_mode": "packaged",
                "package_id": "com_example_parts"
            },
            "schematic": { "scale": 10.0, "origin": [100.0, 80.0] },
            "pcb": { "origin": [50.0, 50.0], "board_thickness": 0.8 },
            "logging": { "level": "debug" }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.logging.level, "debug");

        let options = config.library_options();
        assert_eq!(options.library_name, "my_lib");
        assert_eq!(
            options.model_path_mode,
            ModelPathMode::Packaged {
                package_id: "com_example_parts".to_string()
            }
        );
        assert!((options.convert.schematic_scale - 10.0).abs() < f64::EPSILON);
        assert!((options.convert.pcb_origin.x - 50.0).abs() < f64::EPSILON);
        assert!((options.convert.board_thickness - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn convert_options_defaults_match_converter_defaults() {
        let options = Config::default().convert_options("circuit");
        assert_eq!(options, ConvertOptions::default());
    }

    #[test]
    fn logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "warn");
    }

    #[test]
    fn packaged_mode_needs_package_id() {
        let json = r#"{ "library": { "model_path_mode": "packaged" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError {
                field: "library.package_id",
                ..
            })
        ));
    }

    #[test]
    fn reject_bad_library_names() {
        for json in [
            r#"{ "library": { "name": "" } }"#,
            r#"{ "library": { "name": "a:b" } }"#,
            r#"{ "library": { "name": "same", "builtin_name": "same" } }"#,
        ] {
            let config: Config = serde_json::from_str(json).unwrap();
            assert!(config.validate().is_err(), "accepted {json}");
        }
    }

    #[test]
    fn reject_non_positive_dimensions() {
        let json = r#"{ "schematic": { "scale": 0 }, "pcb": { "board_thickness": 1.6 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());

        let json = r#"{ "pcb": { "board_thickness": -1 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_unknown_fields() {
        let json = r#"{
            "unknown_field": "value"
        }"#;

        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
