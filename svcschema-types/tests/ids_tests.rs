use svcschema_types::{Error, PoolId, ServiceId};
use std::collections::HashSet;
use std::str::FromStr;

// ── ServiceId ─────────────────────────────────────────────────────

#[test]
fn service_id_new_is_unique() {
    let a = ServiceId::new();
    let b = ServiceId::new();
    assert_ne!(a, b);
}

#[test]
fn service_id_from_uuid_roundtrip() {
    let uuid = uuid::Uuid::now_v7();
    let id = ServiceId::from_uuid(uuid);
    assert_eq!(id.as_uuid(), uuid);
}

#[test]
fn service_id_display_and_parse() {
    let id = ServiceId::new();
    let s = id.to_string();
    let parsed = ServiceId::parse(&s).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn service_id_from_str_invalid() {
    assert!(ServiceId::from_str("not-a-uuid").is_err());
}

#[test]
fn invalid_id_reports_the_uuid_error() {
    let err = ServiceId::parse("not-a-uuid").unwrap_err();
    assert!(matches!(err, Error::InvalidUuid(_)));
    assert!(err.to_string().starts_with("invalid UUID: "), "{err}");
}

#[test]
fn service_id_hash_and_eq() {
    let id = ServiceId::new();
    let mut set = HashSet::new();
    set.insert(id);
    set.insert(id); // duplicate
    assert_eq!(set.len(), 1);
}

#[test]
fn service_id_serializes_as_bare_string() {
    let id = ServiceId::new();
    let json = serde_json::to_value(id).unwrap();
    assert_eq!(json, serde_json::Value::String(id.to_string()));
    let parsed: ServiceId = serde_json::from_value(json).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn service_ids_order_by_creation_time() {
    let first = ServiceId::new();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let second = ServiceId::new();
    assert!(first < second);
}

// ── PoolId ────────────────────────────────────────────────────────

#[test]
fn pool_id_debug_names_the_type() {
    let id = PoolId::new();
    let debug = format!("{:?}", id);
    assert!(debug.contains("PoolId"));
}

#[test]
fn pool_id_default_is_unique() {
    assert_ne!(PoolId::default(), PoolId::default());
}
