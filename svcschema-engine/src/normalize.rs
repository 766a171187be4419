//! Raw JSON to [`StandardValue`], per declared type.
//!
//! Null is "absent" for every type. Numbers collapse across the numeric
//! tower: an `integer` accepts `4`, `4.0` and `"4"`, a `number` accepts any
//! of them as a float. `reference` is the only type that touches the
//! store, to check that the referenced service exists.

use crate::context::EngineContext;
use crate::error::ValidatorFailure;
use serde_json::{Number, Value};
use svcschema_model::{PropertyType, StandardValue};
use svcschema_types::ServiceId;

// i64::MAX is not representable as f64; 2^63 is the first float out of range.
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;

/// Normalizes `value` as `declared`.
///
/// `Ok(None)` means the value is absent. Object and array children are
/// converted structurally; the engine re-normalizes them against their own
/// definitions afterwards.
pub fn normalize(
    value: &Value,
    declared: PropertyType,
    ctx: &EngineContext<'_>,
) -> Result<Option<StandardValue>, ValidatorFailure> {
    if value.is_null() {
        return Ok(None);
    }

    let normalized = match (declared, value) {
        (PropertyType::String, Value::String(s)) => StandardValue::String(s.clone()),
        (PropertyType::Boolean, Value::Bool(b)) => StandardValue::Boolean(*b),
        (PropertyType::Integer, Value::Number(n)) => StandardValue::Integer(integer_from_number(n)?),
        (PropertyType::Integer, Value::String(s)) => StandardValue::Integer(integer_from_str(s)?),
        (PropertyType::Number, Value::Number(n)) => {
            StandardValue::Number(n.as_f64().ok_or_else(|| mismatch(declared, value))?)
        }
        (PropertyType::Number, Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => StandardValue::Number(f),
            _ => return Err(mismatch(declared, value)),
        },
        (PropertyType::Object, Value::Object(_))
        | (PropertyType::Array, Value::Array(_))
        | (PropertyType::Json, _) => return structural(value),
        (PropertyType::Reference, Value::String(s)) => reference(s, ctx)?,
        _ => return Err(mismatch(declared, value)),
    };
    Ok(Some(normalized))
}

fn structural(value: &Value) -> Result<Option<StandardValue>, ValidatorFailure> {
    StandardValue::from_json(value).map_err(|e| ValidatorFailure::invalid(e.to_string()))
}

fn reference(raw: &str, ctx: &EngineContext<'_>) -> Result<StandardValue, ValidatorFailure> {
    let id = ServiceId::parse(raw.trim())
        .map_err(|_| ValidatorFailure::invalid("invalid reference identifier"))?;
    match ctx.store.find_service(&id)? {
        Some(_) => Ok(StandardValue::Reference(id)),
        None => Err(ValidatorFailure::invalid(format!("service not found: {id}"))),
    }
}

fn integer_from_number(n: &Number) -> Result<i64, ValidatorFailure> {
    if let Some(i) = n.as_i64() {
        return Ok(i);
    }
    if n.is_u64() {
        return Err(ValidatorFailure::invalid("integer out of range"));
    }
    integer_from_float(n.as_f64().unwrap_or(f64::NAN))
}

fn integer_from_str(s: &str) -> Result<i64, ValidatorFailure> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Ok(i);
    }
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() => integer_from_float(f),
        _ => Err(ValidatorFailure::invalid("expected integer, got string")),
    }
}

fn integer_from_float(f: f64) -> Result<i64, ValidatorFailure> {
    if !f.is_finite() || f.fract() != 0.0 {
        return Err(ValidatorFailure::invalid("expected integer, got float"));
    }
    if !(I64_LOWER..I64_UPPER).contains(&f) {
        return Err(ValidatorFailure::invalid("integer out of range"));
    }
    Ok(f as i64)
}

fn mismatch(declared: PropertyType, value: &Value) -> ValidatorFailure {
    ValidatorFailure::invalid(format!("expected {declared}, got {}", json_kind(value)))
}

/// JSON kind name of a raw value, as used in type-mismatch messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_guard() {
        assert_eq!(integer_from_float(4.0).unwrap(), 4);
        assert!(integer_from_float(4.5).is_err());
        assert!(integer_from_float(f64::INFINITY).is_err());
        assert!(integer_from_float(1e19).is_err());
        assert_eq!(integer_from_float(-9_223_372_036_854_775_808.0).unwrap(), i64::MIN);
    }

    #[test]
    fn numeric_strings() {
        assert_eq!(integer_from_str(" 12 ").unwrap(), 12);
        assert_eq!(integer_from_str("12.0").unwrap(), 12);
        assert!(integer_from_str("twelve").is_err());
    }

    #[test]
    fn json_kind_names() {
        assert_eq!(json_kind(&Value::Null), "null");
        assert_eq!(json_kind(&serde_json::json!([1])), "array");
    }
}
