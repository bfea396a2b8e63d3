//! Error types for configuration handling.
//!
//! Conversion errors live in [`crate::kicad::error`].

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly given configuration file does not exist.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path that was given.
        path: PathBuf,
    },

    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid JSON or has unknown keys.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A setting parsed but holds an unusable value.
    #[error("invalid {field}: {message}")]
    ValidationError {
        /// Dotted key of the offending setting, e.g. `library.package_id`.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_path() {
        let error = ConfigError::NotFound {
            path: PathBuf::from("/path/to/config.json"),
        };
        let msg = error.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("config.json"));
    }

    #[test]
    fn validation_error_names_the_field() {
        let error = ConfigError::ValidationError {
            field: "schematic.scale",
            message: "must be positive, got 0".to_string(),
        };
        assert_eq!(error.to_string(), "invalid schematic.scale: must be positive, got 0");
    }
}
