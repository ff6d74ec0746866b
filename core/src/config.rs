#![deny(missing_docs)]

//! # Transform Options
//!
//! Per-call configuration for the transform and bundle entry points.
//! Options are always passed explicitly; nothing here is process-wide.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// Default namespace for bundled (hoisted) values.
pub const DEFAULT_BUNDLE_ROOT: &str = "__bundled__";

/// Default namespace for references that failed to bundle.
pub const DEFAULT_ERRORS_ROOT: &str = "__errors__";

/// Default document extension holding a caller-declared stable identifier.
pub const DEFAULT_STABLE_ID_EXTENSION: &str = "x-stable-id";

/// How generated identifiers are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashingMode {
    /// Candidate strings are hashed into short opaque ids.
    #[default]
    Stable,
    /// Candidate strings are returned as-is. Useful when reading test output.
    Verbatim,
}

/// Options controlling a single top-level transform or bundle call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransformOptions {
    /// Identifier rendering.
    pub hashing: HashingMode,
    /// Top-level key receiving bundled values.
    pub bundle_root: String,
    /// Top-level key receiving bundle errors.
    pub errors_root: String,
    /// Skip failing operations in batch transforms instead of aborting.
    pub best_effort: bool,
    /// Extension key whose string value is used verbatim as a node id.
    pub stable_id_extension: String,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            hashing: HashingMode::Stable,
            bundle_root: DEFAULT_BUNDLE_ROOT.to_string(),
            errors_root: DEFAULT_ERRORS_ROOT.to_string(),
            best_effort: true,
            stable_id_extension: DEFAULT_STABLE_ID_EXTENSION.to_string(),
        }
    }
}

impl TransformOptions {
    /// Options with verbatim (unhashed) identifiers.
    pub fn verbatim() -> Self {
        Self {
            hashing: HashingMode::Verbatim,
            ..Self::default()
        }
    }

    /// Loads options from a YAML (or JSON) string. Missing keys take defaults.
    pub fn from_yaml_str(yaml: &str) -> EngineResult<Self> {
        let options: Self = serde_yaml::from_str(yaml)?;
        options.validate()?;
        Ok(options)
    }

    /// Rejects option combinations the bundler cannot honour.
    pub fn validate(&self) -> EngineResult<()> {
        if self.bundle_root.is_empty() || self.errors_root.is_empty() {
            return Err(EngineError::General(
                "bundleRoot and errorsRoot must be non-empty".into(),
            ));
        }
        if self.bundle_root == self.errors_root {
            return Err(EngineError::General(format!(
                "bundleRoot and errorsRoot must differ (both '{}')",
                self.bundle_root
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = TransformOptions::default();
        assert_eq!(opts.hashing, HashingMode::Stable);
        assert_eq!(opts.bundle_root, "__bundled__");
        assert_eq!(opts.errors_root, "__errors__");
        assert!(opts.best_effort);
    }

    #[test]
    fn test_from_yaml_partial() {
        let opts = TransformOptions::from_yaml_str("hashing: verbatim\nbestEffort: false\n").unwrap();
        assert_eq!(opts.hashing, HashingMode::Verbatim);
        assert!(!opts.best_effort);
        assert_eq!(opts.bundle_root, DEFAULT_BUNDLE_ROOT);
    }

    #[test]
    fn test_from_yaml_rejects_equal_roots() {
        let err = TransformOptions::from_yaml_str("bundleRoot: x\nerrorsRoot: x\n").unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }
}
