//! Error taxonomy for rule evaluation.

use thiserror::Error;

/// Outcome of a failed rule evaluation.
///
/// `Violation` means the repository broke a rule and carries the message shown
/// to the learner. `Processing` means the input could not be evaluated at all
/// (malformed manifest, missing issue reference, bad pattern).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("{0}")]
    Violation(String),

    #[error("{0}")]
    Processing(String),
}

impl RuleError {
    pub fn violation(message: impl Into<String>) -> Self {
        RuleError::Violation(message.into())
    }

    pub fn processing(message: impl Into<String>) -> Self {
        RuleError::Processing(message.into())
    }

    pub fn is_violation(&self) -> bool {
        matches!(self, RuleError::Violation(_))
    }
}

/// Errors produced while decoding a manifest document.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] yaml_rust2::scanner::ScanError),
}

impl From<ManifestError> for RuleError {
    fn from(err: ManifestError) -> Self {
        RuleError::Processing(err.to_string())
    }
}

/// Result of a validator: `Ok(())` when every rule holds.
pub type RuleResult = std::result::Result<(), RuleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_display_is_message() {
        let err = RuleError::violation("The workflow does not run on push.");
        assert_eq!(err.to_string(), "The workflow does not run on push.");
        assert!(err.is_violation());
    }

    #[test]
    fn test_manifest_error_becomes_processing() {
        let manifest_err = crate::ValueTree::decode("on: [push").unwrap_err();
        let err: RuleError = manifest_err.into();
        assert!(!err.is_violation());
        assert!(err.to_string().starts_with("invalid YAML"));
    }
}
