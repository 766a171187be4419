//! Error types for the schema model.

use std::fmt;
use svcschema_types::PropertySource;
use thiserror::Error;

/// A schema authoring problem, detected without any request in hand.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("{path}: property name must not be empty")]
    EmptyName { path: String },

    #[error("{path}: `properties` is only allowed on object properties")]
    PropertiesOnNonObject { path: String },

    #[error("{path}: `items` is only allowed on array properties")]
    ItemsOnNonArray { path: String },

    #[error("{path}: array properties must declare `items`")]
    MissingItems { path: String },

    #[error("{path}: `updatableIn` must list at least one state when updatable is `statuses`")]
    EmptyUpdatableIn { path: String },

    #[error("{path}: `updatableIn` is only meaningful when updatable is `statuses`")]
    UnexpectedUpdatableIn { path: String },

    #[error("{path}: {role} spec is missing a type")]
    MissingSpecType { path: String, role: &'static str },

    #[error("{path}: unknown {role} type: {name}")]
    UnknownComponent {
        path: String,
        role: &'static str,
        name: String,
    },

    #[error("{path}: invalid {name} {role} config: {reason}")]
    InvalidConfig {
        path: String,
        role: &'static str,
        name: String,
        reason: String,
    },
}

impl SchemaError {
    /// Path of the offending property.
    pub fn path(&self) -> &str {
        match self {
            Self::EmptyName { path }
            | Self::PropertiesOnNonObject { path }
            | Self::ItemsOnNonArray { path }
            | Self::MissingItems { path }
            | Self::EmptyUpdatableIn { path }
            | Self::UnexpectedUpdatableIn { path }
            | Self::MissingSpecType { path, .. }
            | Self::UnknownComponent { path, .. }
            | Self::InvalidConfig { path, .. } => path,
        }
    }
}

/// Every authoring problem found in one schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaErrors(pub Vec<SchemaError>);

impl SchemaErrors {
    pub fn iter(&self) -> impl Iterator<Item = &SchemaError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SchemaErrors {
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

impl std::error::Error for SchemaErrors {}

/// Result type for source/updatability rules.
pub type RuleResult<T> = Result<T, RuleError>;

/// A property the caller is not allowed to supply in this situation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("unknown property: {0}")]
    UnknownProperty(String),

    #[error("property {property} can only be set by {allowed}")]
    SourceMismatch {
        property: String,
        allowed: PropertySource,
    },

    #[error("property {0} cannot be updated")]
    NotUpdatable(String),

    #[error("cannot update property {property} in state {state}; allowed states: {}", allowed.join(", "))]
    StateNotAllowed {
        property: String,
        state: String,
        allowed: Vec<String>,
    },
}

impl RuleError {
    /// The property the rule rejected.
    pub fn property(&self) -> &str {
        match self {
            Self::UnknownProperty(p) | Self::NotUpdatable(p) => p,
            Self::SourceMismatch { property, .. } | Self::StateNotAllowed { property, .. } => {
                property
            }
        }
    }
}
