//! Check outcomes and the classification of check errors.

use std::any::Any;

use autocoder_rules::{ManifestError, RuleError};
use autocoder_snapshot::{ErrorClass, RemoteError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::check::CheckId;

pub const NOT_FOUND_MESSAGE: &str = "The requested resource does not exist.";
pub const FORBIDDEN_MESSAGE: &str = "Access to the resource is forbidden or rate limit exceeded.";
pub const UNAUTHORIZED_MESSAGE: &str = "Authentication is required or has failed.";

/// Anything a check body can fail with.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Rule(#[from] RuleError),
}

impl From<ManifestError> for CheckError {
    fn from(err: ManifestError) -> Self {
        CheckError::Rule(err.into())
    }
}

/// Failure category shown to the learner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A rule was broken
    Validation,
    NotFound,
    Forbidden,
    Unauthorized,
    /// Transport, processing or internal failure
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

/// Result of exactly one check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckResult {
    Pass,
    Fail(Failure),
}

impl CheckResult {
    pub fn fail(kind: FailureKind, message: impl Into<String>) -> Self {
        CheckResult::Fail(Failure {
            kind,
            message: message.into(),
        })
    }

    /// Failure for an input that could not be evaluated.
    pub fn processing(error: &dyn std::fmt::Display) -> Self {
        Self::fail(
            FailureKind::Other,
            format!("Something went wrong. Encountered: {error}"),
        )
    }

    pub fn passed(&self) -> bool {
        matches!(self, CheckResult::Pass)
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            CheckResult::Pass => None,
            CheckResult::Fail(failure) => Some(failure),
        }
    }

    /// Map a check body's result onto the reported taxonomy.
    pub fn classify(check: CheckId, result: Result<(), CheckError>) -> Self {
        match result {
            Ok(()) => CheckResult::Pass,
            Err(CheckError::Rule(RuleError::Violation(message))) => {
                Self::fail(FailureKind::Validation, message)
            }
            Err(CheckError::Rule(RuleError::Processing(message))) => Self::processing(&message),
            Err(CheckError::Remote(err)) => match err.class() {
                ErrorClass::NotFound => Self::fail(
                    FailureKind::NotFound,
                    check.not_found_message().unwrap_or(NOT_FOUND_MESSAGE),
                ),
                ErrorClass::Forbidden => Self::fail(FailureKind::Forbidden, FORBIDDEN_MESSAGE),
                ErrorClass::Unauthorized => {
                    Self::fail(FailureKind::Unauthorized, UNAUTHORIZED_MESSAGE)
                }
                ErrorClass::Other(message) => Self::fail(
                    FailureKind::Other,
                    format!("An error occurred while accessing the GitHub repository: {message}"),
                ),
            },
        }
    }

    /// Failure for a check body that panicked.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "check panicked".to_string());
        Self::processing(&message)
    }
}
