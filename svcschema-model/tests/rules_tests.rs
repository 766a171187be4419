use serde_json::{json, Map, Value};
use svcschema_model::{
    validate_properties_for_creation, validate_properties_for_update, PropertyDefinition,
    PropertySource, RuleError, Schema,
};

fn as_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn schema() -> Schema {
    Schema::new()
        .with("name", PropertyDefinition::string())
        .with("image", PropertyDefinition::string().never_updatable())
        .with("cpu", PropertyDefinition::integer().updatable_in(["Stopped"]))
        .with(
            "ip",
            PropertyDefinition::string().with_source(PropertySource::Agent),
        )
}

// ── Creation ─────────────────────────────────────────────────────

#[test]
fn creation_accepts_input_properties() {
    let props = as_map(json!({"name": "a", "image": "debian", "cpu": 2}));
    assert!(validate_properties_for_creation(&props, Some(&schema()), PropertySource::Input).is_ok());
}

#[test]
fn creation_never_consults_updatable_in() {
    let props = as_map(json!({"cpu": 4}));
    assert!(validate_properties_for_creation(&props, Some(&schema()), PropertySource::Input).is_ok());
}

#[test]
fn creation_rejects_agent_property_from_input() {
    let props = as_map(json!({"ip": "10.0.0.1"}));
    let err = validate_properties_for_creation(&props, Some(&schema()), PropertySource::Input)
        .unwrap_err();
    assert_eq!(
        err,
        RuleError::SourceMismatch { property: "ip".into(), allowed: PropertySource::Agent }
    );
    assert_eq!(err.to_string(), "property ip can only be set by agent");
}

#[test]
fn creation_rejects_unknown_property() {
    let props = as_map(json!({"colour": "red"}));
    let err = validate_properties_for_creation(&props, Some(&schema()), PropertySource::Input)
        .unwrap_err();
    assert_eq!(err, RuleError::UnknownProperty("colour".into()));
}

#[test]
fn missing_schema_accepts_anything() {
    let props = as_map(json!({"anything": 1}));
    assert!(validate_properties_for_creation(&props, None, PropertySource::Agent).is_ok());
    assert!(validate_properties_for_update(&props, "Started", None, PropertySource::Agent).is_ok());
}

// ── Update ───────────────────────────────────────────────────────

#[test]
fn statuses_property_updates_in_listed_state() {
    let props = as_map(json!({"cpu": 4}));
    assert!(
        validate_properties_for_update(&props, "Stopped", Some(&schema()), PropertySource::Input)
            .is_ok()
    );
}

#[test]
fn statuses_property_rejected_elsewhere_naming_state() {
    let props = as_map(json!({"cpu": 4}));
    let err =
        validate_properties_for_update(&props, "Started", Some(&schema()), PropertySource::Input)
            .unwrap_err();
    assert_eq!(
        err,
        RuleError::StateNotAllowed {
            property: "cpu".into(),
            state: "Started".into(),
            allowed: vec!["Stopped".into()],
        }
    );
    assert!(err.to_string().contains("Started"));
}

#[test]
fn never_updatable_is_rejected_in_any_state() {
    let props = as_map(json!({"image": "alpine"}));
    for state in ["Started", "Stopped"] {
        let err =
            validate_properties_for_update(&props, state, Some(&schema()), PropertySource::Input)
                .unwrap_err();
        assert_eq!(err, RuleError::NotUpdatable("image".into()));
    }
}

#[test]
fn agent_updates_agent_property() {
    let props = as_map(json!({"ip": "10.0.0.9"}));
    assert!(
        validate_properties_for_update(&props, "Started", Some(&schema()), PropertySource::Agent)
            .is_ok()
    );
}

#[test]
fn first_rejection_in_name_order_wins() {
    let props = as_map(json!({"zzz": 1, "image": "x"}));
    let err =
        validate_properties_for_update(&props, "Started", Some(&schema()), PropertySource::Input)
            .unwrap_err();
    assert_eq!(err.property(), "image");
}
