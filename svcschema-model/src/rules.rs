//! Source and updatability rules.
//!
//! These gate which top-level properties a caller may supply at all,
//! before any value is looked at. Creation only checks the source;
//! updates additionally honour `updatable` / `updatableIn`.

use crate::error::{RuleError, RuleResult};
use crate::schema::{PropertyDefinition, Schema, Updatable};
use serde_json::{Map, Value};
use svcschema_types::PropertySource;

impl PropertyDefinition {
    /// Whether an actor originating `source` values may set this property
    /// on a new service.
    pub fn can_create(&self, name: &str, source: PropertySource) -> RuleResult<()> {
        if self.source != source {
            return Err(RuleError::SourceMismatch {
                property: name.to_string(),
                allowed: self.source,
            });
        }
        Ok(())
    }

    /// Whether an actor originating `source` values may change this
    /// property while the service is in `current_state`.
    pub fn can_update(
        &self,
        name: &str,
        source: PropertySource,
        current_state: &str,
    ) -> RuleResult<()> {
        self.can_create(name, source)?;
        match self.updatable {
            Updatable::Always => Ok(()),
            Updatable::Never => Err(RuleError::NotUpdatable(name.to_string())),
            Updatable::Statuses => {
                if self.updatable_in.iter().any(|s| s == current_state) {
                    Ok(())
                } else {
                    Err(RuleError::StateNotAllowed {
                        property: name.to_string(),
                        state: current_state.to_string(),
                        allowed: self.updatable_in.clone(),
                    })
                }
            }
        }
    }
}

fn definition<'a>(schema: &'a Schema, name: &str) -> RuleResult<&'a PropertyDefinition> {
    schema
        .get(name)
        .ok_or_else(|| RuleError::UnknownProperty(name.to_string()))
}

/// Checks every supplied top-level property for creation.
///
/// A `None` schema places no constraint. Keys are checked in name order
/// and the first rejection is returned.
pub fn validate_properties_for_creation(
    properties: &Map<String, Value>,
    schema: Option<&Schema>,
    source: PropertySource,
) -> RuleResult<()> {
    let Some(schema) = schema else {
        return Ok(());
    };
    let mut names: Vec<&String> = properties.keys().collect();
    names.sort();
    for name in names {
        definition(schema, name)?.can_create(name, source)?;
    }
    Ok(())
}

/// Checks every supplied top-level property for an update while the
/// service is in `current_state`.
pub fn validate_properties_for_update(
    updates: &Map<String, Value>,
    current_state: &str,
    schema: Option<&Schema>,
    source: PropertySource,
) -> RuleResult<()> {
    let Some(schema) = schema else {
        return Ok(());
    };
    let mut names: Vec<&String> = updates.keys().collect();
    names.sort();
    for name in names {
        definition(schema, name)?.can_update(name, source, current_state)?;
    }
    Ok(())
}
