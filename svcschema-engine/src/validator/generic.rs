//! Store-free validators: lengths, pattern, enum, numeric bounds and
//! array bounds / uniqueness.
//!
//! Each is type-guarded: applied to a value of the wrong kind it fails
//! with the fixed "can only be applied to" message instead of passing.

use super::{Validator, bad_config, config_count, config_number, wrong_kind};
use crate::context::EngineContext;
use crate::error::ValidatorFailure;
use regex_lite::Regex;
use serde_json::Value;
use std::collections::HashSet;
use svcschema_model::StandardValue;

fn string_value<'v>(name: &str, value: &'v StandardValue) -> Result<&'v str, ValidatorFailure> {
    value.as_str().ok_or_else(|| wrong_kind(name, "string"))
}

fn numeric_value(name: &str, value: &StandardValue) -> Result<f64, ValidatorFailure> {
    value.as_f64().ok_or_else(|| wrong_kind(name, "number"))
}

fn array_value<'v>(
    name: &str,
    value: &'v StandardValue,
) -> Result<&'v [StandardValue], ValidatorFailure> {
    value.as_array().ok_or_else(|| wrong_kind(name, "array"))
}

// ── Strings ──────────────────────────────────────────────────────

/// Minimum length of a string, in characters.
pub struct MinLengthValidator;

impl MinLengthValidator {
    pub const NAME: &'static str = "minLength";
}

impl Validator for MinLengthValidator {
    fn validate(
        &self,
        _ctx: &EngineContext<'_>,
        _path: &str,
        value: &StandardValue,
        config: &Value,
    ) -> Result<(), ValidatorFailure> {
        let s = string_value(Self::NAME, value)?;
        let min = config_count(config).map_err(|e| bad_config(Self::NAME, e))?;
        if s.chars().count() < min {
            return Err(ValidatorFailure::invalid(format!(
                "length must be at least {min}"
            )));
        }
        Ok(())
    }

    fn validate_config(&self, config: &Value) -> Result<(), String> {
        config_count(config).map(drop)
    }
}

/// Maximum length of a string, in characters.
pub struct MaxLengthValidator;

impl MaxLengthValidator {
    pub const NAME: &'static str = "maxLength";
}

impl Validator for MaxLengthValidator {
    fn validate(
        &self,
        _ctx: &EngineContext<'_>,
        _path: &str,
        value: &StandardValue,
        config: &Value,
    ) -> Result<(), ValidatorFailure> {
        let s = string_value(Self::NAME, value)?;
        let max = config_count(config).map_err(|e| bad_config(Self::NAME, e))?;
        if s.chars().count() > max {
            return Err(ValidatorFailure::invalid(format!(
                "length must be at most {max}"
            )));
        }
        Ok(())
    }

    fn validate_config(&self, config: &Value) -> Result<(), String> {
        config_count(config).map(drop)
    }
}

/// Regular-expression match (unanchored) on a string.
pub struct PatternValidator;

impl PatternValidator {
    pub const NAME: &'static str = "pattern";

    fn compile(config: &Value) -> Result<Regex, String> {
        let pattern = config
            .as_str()
            .ok_or_else(|| format!("expected a pattern string, got {config}"))?;
        Regex::new(pattern).map_err(|e| e.to_string())
    }
}

impl Validator for PatternValidator {
    fn validate(
        &self,
        _ctx: &EngineContext<'_>,
        _path: &str,
        value: &StandardValue,
        config: &Value,
    ) -> Result<(), ValidatorFailure> {
        let s = string_value(Self::NAME, value)?;
        let re = Self::compile(config).map_err(|e| bad_config(Self::NAME, e))?;
        if !re.is_match(s) {
            return Err(ValidatorFailure::invalid(format!(
                "value does not match pattern {}",
                re.as_str()
            )));
        }
        Ok(())
    }

    fn validate_config(&self, config: &Value) -> Result<(), String> {
        Self::compile(config).map(drop)
    }
}

// ── Any kind ─────────────────────────────────────────────────────

/// Membership in a fixed list of allowed values, compared semantically.
pub struct EnumValidator;

impl EnumValidator {
    pub const NAME: &'static str = "enum";

    fn allowed(config: &Value) -> Result<Vec<StandardValue>, String> {
        let items = config
            .as_array()
            .ok_or_else(|| format!("expected a list of allowed values, got {config}"))?;
        if items.is_empty() {
            return Err("list must not be empty".to_string());
        }
        let mut allowed = Vec::with_capacity(items.len());
        for item in items {
            match StandardValue::from_json(item).map_err(|e| e.to_string())? {
                Some(v) => allowed.push(v),
                None => return Err("null is not an allowed value".to_string()),
            }
        }
        Ok(allowed)
    }
}

impl Validator for EnumValidator {
    fn validate(
        &self,
        _ctx: &EngineContext<'_>,
        _path: &str,
        value: &StandardValue,
        config: &Value,
    ) -> Result<(), ValidatorFailure> {
        let allowed = Self::allowed(config).map_err(|e| bad_config(Self::NAME, e))?;
        if allowed.iter().any(|candidate| candidate.deep_eq(value)) {
            return Ok(());
        }
        let listed: Vec<String> = allowed.iter().map(ToString::to_string).collect();
        Err(ValidatorFailure::invalid(format!(
            "value must be one of: {}",
            listed.join(", ")
        )))
    }

    fn validate_config(&self, config: &Value) -> Result<(), String> {
        Self::allowed(config).map(drop)
    }
}

// ── Numbers ──────────────────────────────────────────────────────

/// Inclusive lower bound on an integer or number.
pub struct MinValidator;

impl MinValidator {
    pub const NAME: &'static str = "min";
}

impl Validator for MinValidator {
    fn validate(
        &self,
        _ctx: &EngineContext<'_>,
        _path: &str,
        value: &StandardValue,
        config: &Value,
    ) -> Result<(), ValidatorFailure> {
        let n = numeric_value(Self::NAME, value)?;
        let min = config_number(config).map_err(|e| bad_config(Self::NAME, e))?;
        if n < min {
            return Err(ValidatorFailure::invalid(format!(
                "value must be at least {min}"
            )));
        }
        Ok(())
    }

    fn validate_config(&self, config: &Value) -> Result<(), String> {
        config_number(config).map(drop)
    }
}

/// Inclusive upper bound on an integer or number.
pub struct MaxValidator;

impl MaxValidator {
    pub const NAME: &'static str = "max";
}

impl Validator for MaxValidator {
    fn validate(
        &self,
        _ctx: &EngineContext<'_>,
        _path: &str,
        value: &StandardValue,
        config: &Value,
    ) -> Result<(), ValidatorFailure> {
        let n = numeric_value(Self::NAME, value)?;
        let max = config_number(config).map_err(|e| bad_config(Self::NAME, e))?;
        if n > max {
            return Err(ValidatorFailure::invalid(format!(
                "value must be at most {max}"
            )));
        }
        Ok(())
    }

    fn validate_config(&self, config: &Value) -> Result<(), String> {
        config_number(config).map(drop)
    }
}

// ── Arrays ───────────────────────────────────────────────────────

pub struct MinItemsValidator;

impl MinItemsValidator {
    pub const NAME: &'static str = "minItems";
}

impl Validator for MinItemsValidator {
    fn validate(
        &self,
        _ctx: &EngineContext<'_>,
        _path: &str,
        value: &StandardValue,
        config: &Value,
    ) -> Result<(), ValidatorFailure> {
        let items = array_value(Self::NAME, value)?;
        let min = config_count(config).map_err(|e| bad_config(Self::NAME, e))?;
        if items.len() < min {
            return Err(ValidatorFailure::invalid(format!(
                "array must contain at least {min} items"
            )));
        }
        Ok(())
    }

    fn validate_config(&self, config: &Value) -> Result<(), String> {
        config_count(config).map(drop)
    }
}

pub struct MaxItemsValidator;

impl MaxItemsValidator {
    pub const NAME: &'static str = "maxItems";
}

impl Validator for MaxItemsValidator {
    fn validate(
        &self,
        _ctx: &EngineContext<'_>,
        _path: &str,
        value: &StandardValue,
        config: &Value,
    ) -> Result<(), ValidatorFailure> {
        let items = array_value(Self::NAME, value)?;
        let max = config_count(config).map_err(|e| bad_config(Self::NAME, e))?;
        if items.len() > max {
            return Err(ValidatorFailure::invalid(format!(
                "array must contain at most {max} items"
            )));
        }
        Ok(())
    }

    fn validate_config(&self, config: &Value) -> Result<(), String> {
        config_count(config).map(drop)
    }
}

/// Rejects arrays with repeated elements.
///
/// Elements are compared by their string rendering, so `1` and `"1"` count
/// as duplicates of each other.
pub struct UniqueItemsValidator;

impl UniqueItemsValidator {
    pub const NAME: &'static str = "uniqueItems";

    fn enabled(config: &Value) -> Result<bool, String> {
        match config {
            Value::Null => Ok(true),
            Value::Bool(b) => Ok(*b),
            other => Err(format!("expected a boolean, got {other}")),
        }
    }
}

impl Validator for UniqueItemsValidator {
    fn validate(
        &self,
        _ctx: &EngineContext<'_>,
        _path: &str,
        value: &StandardValue,
        config: &Value,
    ) -> Result<(), ValidatorFailure> {
        let items = array_value(Self::NAME, value)?;
        if !Self::enabled(config).map_err(|e| bad_config(Self::NAME, e))? {
            return Ok(());
        }
        let mut seen = HashSet::with_capacity(items.len());
        for item in items {
            let key = item.render_key();
            if !seen.insert(key.clone()) {
                return Err(ValidatorFailure::invalid(format!(
                    "array items must be unique; duplicate value: {key}"
                )));
            }
        }
        Ok(())
    }

    fn validate_config(&self, config: &Value) -> Result<(), String> {
        Self::enabled(config).map(drop)
    }
}
