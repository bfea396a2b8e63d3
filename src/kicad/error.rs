//! Error types for conversion operations.

use thiserror::Error;

/// Result type for conversion operations.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Error raised while parsing element-tree text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Parse error at offset {offset}: {message}")]
pub struct ParseError {
    /// Byte offset where the error occurred.
    pub offset: usize,
    /// Description of what's wrong.
    pub message: String,
}

impl ParseError {
    /// Creates a parse error.
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Errors that can occur while converting a circuit description.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// A stage ran before the state it depends on was initialised.
    #[error("Converter context not initialised: missing {what}")]
    MissingPrecondition {
        /// The missing piece of context (transform, output root, ...).
        what: String,
    },

    /// A stage kept reporting work past the iteration ceiling.
    #[error("Stage '{stage}' exceeded the iteration ceiling of {limit}")]
    IterationCeiling {
        /// Name of the runaway stage.
        stage: String,
        /// The ceiling that was hit.
        limit: usize,
    },

    /// Generated or supplied element-tree text could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A component could not be rendered into a circuit description.
    #[error("Failed to render component '{component}': {message}")]
    Render {
        /// Component (export) name.
        component: String,
        /// Description of what went wrong.
        message: String,
    },

    /// The circuit description itself is unusable.
    #[error("Invalid circuit description: {message}")]
    InvalidInput {
        /// Description of what's wrong.
        message: String,
    },
}

impl ConvertError {
    /// Creates a missing precondition error.
    pub fn missing(what: impl Into<String>) -> Self {
        Self::MissingPrecondition { what: what.into() }
    }

    /// Creates an iteration ceiling error.
    pub fn iteration_ceiling(stage: impl Into<String>, limit: usize) -> Self {
        Self::IterationCeiling {
            stage: stage.into(),
            limit,
        }
    }

    /// Creates a render error.
    pub fn render(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ConvertError::missing("PCB transform");
        assert_eq!(
            err.to_string(),
            "Converter context not initialised: missing PCB transform"
        );
    }

    #[test]
    fn ceiling_error_display() {
        let err = ConvertError::iteration_ceiling("AddFootprints", 1000);
        assert_eq!(
            err.to_string(),
            "Stage 'AddFootprints' exceeded the iteration ceiling of 1000"
        );
    }

    #[test]
    fn parse_error_is_transparent() {
        let err: ConvertError = ParseError::new(12, "unclosed '('").into();
        assert_eq!(err.to_string(), "Parse error at offset 12: unclosed '('");
    }
}
