//! Value-level validators.
//!
//! A validator sees one normalized value plus the `value` of its spec and
//! either accepts it or explains why not. Validators never see absent
//! values: a null or omitted property is handled by the engine's required
//! check before any validator runs.

mod domain;
mod generic;

pub use domain::{
    MutableValidator, ServiceOptionValidator, ServiceReferenceValidator, SourceValidator,
};
pub use generic::{
    EnumValidator, MaxItemsValidator, MaxLengthValidator, MaxValidator, MinItemsValidator,
    MinLengthValidator, MinValidator, PatternValidator, UniqueItemsValidator,
};

use crate::context::EngineContext;
use crate::error::ValidatorFailure;
use serde_json::Value;
use std::sync::Arc;
use svcschema_model::StandardValue;

/// A named, configurable check on a normalized value.
pub trait Validator: Send + Sync {
    /// Checks `value` (found at `path`) against `config`.
    fn validate(
        &self,
        ctx: &EngineContext<'_>,
        path: &str,
        value: &StandardValue,
        config: &Value,
    ) -> Result<(), ValidatorFailure>;

    /// Checks the configuration alone, so schema authors learn about a
    /// malformed spec before any request uses it.
    fn validate_config(&self, config: &Value) -> Result<(), String>;
}

/// Every built-in validator, keyed by the name schemas refer to it by.
pub fn builtin() -> Vec<(&'static str, Arc<dyn Validator>)> {
    vec![
        entry(MinLengthValidator::NAME, MinLengthValidator),
        entry(MaxLengthValidator::NAME, MaxLengthValidator),
        entry(PatternValidator::NAME, PatternValidator),
        entry(EnumValidator::NAME, EnumValidator),
        entry(MinValidator::NAME, MinValidator),
        entry(MaxValidator::NAME, MaxValidator),
        entry(MinItemsValidator::NAME, MinItemsValidator),
        entry(MaxItemsValidator::NAME, MaxItemsValidator),
        entry(UniqueItemsValidator::NAME, UniqueItemsValidator),
        entry(ServiceOptionValidator::NAME, ServiceOptionValidator),
        entry(ServiceReferenceValidator::NAME, ServiceReferenceValidator),
        entry(SourceValidator::NAME, SourceValidator),
        entry(MutableValidator::NAME, MutableValidator),
    ]
}

fn entry(
    name: &'static str,
    validator: impl Validator + 'static,
) -> (&'static str, Arc<dyn Validator>) {
    (name, Arc::new(validator))
}

/// The fixed type-guard rejection.
pub(crate) fn wrong_kind(validator: &str, expected: &str) -> ValidatorFailure {
    ValidatorFailure::invalid(format!(
        "validator {validator} can only be applied to {expected} values"
    ))
}

/// A config that only showed up malformed at request time.
pub(crate) fn bad_config(validator: &str, reason: String) -> ValidatorFailure {
    ValidatorFailure::invalid(format!("invalid {validator} validator config: {reason}"))
}

// ── Config helpers ───────────────────────────────────────────────

/// A non-negative whole number (`3` or `3.0`).
pub(crate) fn config_count(config: &Value) -> Result<usize, String> {
    if let Some(n) = config.as_u64() {
        return usize::try_from(n).map_err(|_| format!("{n} is too large"));
    }
    match config.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= usize::MAX as f64 => Ok(f as usize),
        _ => Err(format!("expected a non-negative integer, got {config}")),
    }
}

pub(crate) fn config_number(config: &Value) -> Result<f64, String> {
    config
        .as_f64()
        .ok_or_else(|| format!("expected a number, got {config}"))
}

/// A non-empty list of strings.
pub(crate) fn config_names(config: &Value) -> Result<Vec<String>, String> {
    let items = config
        .as_array()
        .ok_or_else(|| format!("expected a list of names, got {config}"))?;
    if items.is_empty() {
        return Err("list must not be empty".to_string());
    }
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| format!("expected a name, got {item}"))
        })
        .collect()
}
