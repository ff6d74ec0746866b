//! # Error Handling
//!
//! Provides the unified `EngineError` enum used across the engine.
//!
//! The taxonomy follows the two failure classes a document can trigger:
//! `Reference` (a pointer that does not resolve, or points outside the document)
//! and `Type` (a structurally malformed `$ref`). Cycles are never errors.

use derive_more::{Display, From};

/// The Engine Error Enum.
///
/// We use `derive_more` for boilerplate.
/// Note: String errors default to `General`.
#[derive(Debug, Display, From)]
pub enum EngineError {
    /// A `$ref` could not be resolved, or targets another document.
    #[from(ignore)]
    #[display("ReferenceError: {_0}")]
    Reference(String),

    /// A `$ref` (or pointer) is structurally malformed.
    #[from(ignore)]
    #[display("TypeError: {_0}")]
    Type(String),

    /// The per-operation entry point was asked for a path the document lacks.
    #[from(ignore)]
    #[display("Path '{path}' does not exist in the document")]
    MissingPath {
        /// The requested path template.
        path: String,
    },

    /// The path exists but carries no operation for the method.
    #[from(ignore)]
    #[display("Operation '{method} {path}' does not exist in the document")]
    MissingOperation {
        /// The requested path template.
        path: String,
        /// The requested HTTP method.
        method: String,
    },

    /// Source text could not be loaded as a document.
    #[from(ignore)]
    #[display("Parse Error: {_0}")]
    Parse(String),

    /// Wrapper for serde_json errors.
    #[display("JSON Error: {_0}")]
    Json(serde_json::Error),

    /// Wrapper for serde_yaml errors.
    #[display("YAML Error: {_0}")]
    Yaml(serde_yaml::Error),

    /// Generic errors.
    #[display("General Error: {_0}")]
    General(String),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for EngineError {}

impl EngineError {
    /// Returns true for failures caused by reference resolution.
    ///
    /// The bundler downgrades these into `__errors__` entries instead of aborting.
    pub fn is_reference(&self) -> bool {
        matches!(self, EngineError::Reference(_) | EngineError::Type(_))
    }
}

/// Helper type alias for Result using EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_conversion() {
        let msg = String::from("something wrong");
        let err: EngineError = msg.into();
        match err {
            EngineError::General(s) => assert_eq!(s, "something wrong"),
            _ => panic!("String should convert to EngineError::General"),
        }
    }

    #[test]
    fn test_reference_display() {
        let err = EngineError::Reference("Cannot resolve external references".into());
        assert_eq!(
            format!("{}", err),
            "ReferenceError: Cannot resolve external references"
        );
        assert!(err.is_reference());
    }

    #[test]
    fn test_missing_operation_display() {
        let err = EngineError::MissingOperation {
            path: "/users".into(),
            method: "get".into(),
        };
        assert_eq!(
            err.to_string(),
            "Operation 'get /users' does not exist in the document"
        );
        assert!(!err.is_reference());
    }

    #[test]
    fn test_json_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: EngineError = json_err.into();
        assert!(matches!(err, EngineError::Json(_)));
    }
}
