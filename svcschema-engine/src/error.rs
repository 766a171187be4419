//! Error types for the engine.

use serde::Serialize;
use std::fmt;
use svcschema_model::{RuleError, SchemaErrors};
use svcschema_store::StoreError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Dotted / bracketed address, e.g. `metadata.owner` or `ports[1]`.
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Every field error found in one validation pass, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(path, message));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Errors reported at exactly `path`.
    pub fn at<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a FieldError> + 'a {
        self.0.iter().filter(move |e| e.path == path)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

/// Why a single normalizer or validator call rejected a value.
#[derive(Debug, Error)]
pub enum ValidatorFailure {
    /// The value is illegal; reported as a field error.
    #[error("{0}")]
    Invalid(String),

    /// The store could not answer; aborts the whole pass.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ValidatorFailure {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Errors that can occur in engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// One or more fields were rejected.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// The actor may not make this mutation.
    #[error("{path}: unauthorized: {reason}")]
    Unauthorized { path: String, reason: String },

    /// A value could not be generated (misconfigured or exhausted pool).
    #[error("{path}: generation failed: {reason}")]
    Generation { path: String, reason: String },

    /// The store failed or a record it must hold is missing.
    #[error("{context}: {source}")]
    Store {
        context: String,
        source: StoreError,
    },

    /// The schema itself is malformed.
    #[error("invalid schema: {0}")]
    Schema(SchemaErrors),
}

impl EngineError {
    pub fn store(context: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            context: context.into(),
            source,
        }
    }

    pub fn unauthorized(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn generation(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Generation {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether a store record the operation needed does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store { source, .. } if source.is_not_found())
    }

    /// The field errors, when this is a validation failure.
    pub fn field_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<RuleError> for EngineError {
    fn from(err: RuleError) -> Self {
        Self::Unauthorized {
            path: err.property().to_string(),
            reason: err.to_string(),
        }
    }
}
