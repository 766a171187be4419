mod common;

use common::Fixture;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use svcschema_engine::normalize::normalize;
use svcschema_engine::{StandardValue, ValidatorFailure};
use svcschema_model::PropertyType;
use svcschema_types::ServiceId;

const ALL_TYPES: [PropertyType; 8] = [
    PropertyType::String,
    PropertyType::Integer,
    PropertyType::Number,
    PropertyType::Boolean,
    PropertyType::Object,
    PropertyType::Array,
    PropertyType::Reference,
    PropertyType::Json,
];

fn message(result: Result<Option<StandardValue>, ValidatorFailure>) -> String {
    match result {
        Err(ValidatorFailure::Invalid(message)) => message,
        Err(ValidatorFailure::Store(e)) => panic!("unexpected store error: {e}"),
        Ok(v) => panic!("expected rejection, got {v:?}"),
    }
}

// ── Absent values ────────────────────────────────────────────────

#[test]
fn null_is_absent_for_every_type() {
    let fx = Fixture::new();
    let ctx = fx.create_ctx();
    for ty in ALL_TYPES {
        assert_eq!(normalize(&Value::Null, ty, &ctx).unwrap(), None, "{ty}");
    }
}

// ── Numeric tower ────────────────────────────────────────────────

#[test]
fn integer_accepts_whole_floats_and_rejects_fractions() {
    let fx = Fixture::new();
    let ctx = fx.create_ctx();
    assert_eq!(
        normalize(&json!(4.0), PropertyType::Integer, &ctx).unwrap(),
        Some(StandardValue::Integer(4))
    );
    assert_eq!(
        message(normalize(&json!(4.5), PropertyType::Integer, &ctx)),
        "expected integer, got float"
    );
}

#[test]
fn integer_accepts_decimal_strings() {
    let fx = Fixture::new();
    let ctx = fx.create_ctx();
    assert_eq!(
        normalize(&json!("42"), PropertyType::Integer, &ctx).unwrap(),
        Some(StandardValue::Integer(42))
    );
    assert_eq!(
        message(normalize(&json!("4.5"), PropertyType::Integer, &ctx)),
        "expected integer, got float"
    );
}

#[test]
fn integer_out_of_range() {
    let fx = Fixture::new();
    let ctx = fx.create_ctx();
    assert_eq!(
        message(normalize(&json!(u64::MAX), PropertyType::Integer, &ctx)),
        "integer out of range"
    );
}

#[test]
fn number_collapses_integers_and_strings() {
    let fx = Fixture::new();
    let ctx = fx.create_ctx();
    for raw in [json!(4), json!(4.0), json!("4")] {
        assert_eq!(
            normalize(&raw, PropertyType::Number, &ctx).unwrap(),
            Some(StandardValue::Number(4.0))
        );
    }
    assert_eq!(
        message(normalize(&json!("four"), PropertyType::Number, &ctx)),
        "expected number, got string"
    );
}

proptest! {
    #[test]
    fn integers_survive_every_numeric_representation(n in -1_000_000_000i64..1_000_000_000) {
        let fx = Fixture::new();
        let ctx = fx.create_ctx();
        for raw in [json!(n), json!(n as f64), json!(n.to_string())] {
            let normalized = normalize(&raw, PropertyType::Integer, &ctx).unwrap();
            prop_assert_eq!(normalized, Some(StandardValue::Integer(n)));
        }
    }

    #[test]
    fn fractional_floats_never_become_integers(n in -1_000_000i64..1_000_000, frac in 0.01f64..0.99) {
        let fx = Fixture::new();
        let ctx = fx.create_ctx();
        let raw = json!(n as f64 + frac);
        prop_assert!(normalize(&raw, PropertyType::Integer, &ctx).is_err());
    }
}

// ── Exact kinds ──────────────────────────────────────────────────

#[test]
fn mismatched_kinds_name_both_sides() {
    let fx = Fixture::new();
    let ctx = fx.create_ctx();
    assert_eq!(
        message(normalize(&json!(1), PropertyType::String, &ctx)),
        "expected string, got number"
    );
    assert_eq!(
        message(normalize(&json!("true"), PropertyType::Boolean, &ctx)),
        "expected boolean, got string"
    );
    assert_eq!(
        message(normalize(&json!([1]), PropertyType::Object, &ctx)),
        "expected object, got array"
    );
    assert_eq!(
        message(normalize(&json!({"a": 1}), PropertyType::Array, &ctx)),
        "expected array, got object"
    );
}

#[test]
fn objects_drop_null_entries() {
    let fx = Fixture::new();
    let ctx = fx.create_ctx();
    let normalized = normalize(&json!({"a": 1, "b": null}), PropertyType::Object, &ctx).unwrap();
    let expected = BTreeMap::from([("a".to_string(), StandardValue::Integer(1))]);
    assert_eq!(normalized, Some(StandardValue::Object(expected)));
}

#[test]
fn arrays_reject_null_elements() {
    let fx = Fixture::new();
    let ctx = fx.create_ctx();
    let msg = message(normalize(&json!([1, null]), PropertyType::Array, &ctx));
    assert!(msg.starts_with("null array elements are not allowed"), "{msg}");
}

#[test]
fn json_accepts_anything() {
    let fx = Fixture::new();
    let ctx = fx.create_ctx();
    assert_eq!(
        normalize(&json!(true), PropertyType::Json, &ctx).unwrap(),
        Some(StandardValue::Boolean(true))
    );
    assert_eq!(
        normalize(&json!([1, "a"]), PropertyType::Json, &ctx).unwrap(),
        Some(StandardValue::Array(vec![
            StandardValue::Integer(1),
            StandardValue::String("a".into())
        ]))
    );
}

// ── References ───────────────────────────────────────────────────

#[test]
fn reference_to_existing_service() {
    let fx = Fixture::new();
    let sibling = fx.add_sibling("vm");
    let ctx = fx.create_ctx();
    assert_eq!(
        normalize(&json!(sibling.id.to_string()), PropertyType::Reference, &ctx).unwrap(),
        Some(StandardValue::Reference(sibling.id))
    );
}

#[test]
fn reference_to_missing_service() {
    let fx = Fixture::new();
    let ctx = fx.create_ctx();
    let missing = ServiceId::new();
    assert_eq!(
        message(normalize(&json!(missing.to_string()), PropertyType::Reference, &ctx)),
        format!("service not found: {missing}")
    );
}

#[test]
fn malformed_reference() {
    let fx = Fixture::new();
    let ctx = fx.create_ctx();
    assert_eq!(
        message(normalize(&json!("not-a-uuid"), PropertyType::Reference, &ctx)),
        "invalid reference identifier"
    );
    assert_eq!(
        message(normalize(&json!(7), PropertyType::Reference, &ctx)),
        "expected reference, got number"
    );
}
