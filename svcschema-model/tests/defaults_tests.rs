use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Map, Value};
use svcschema_model::{apply_defaults, PropertyDefinition, Schema};

fn as_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn server_schema() -> Schema {
    Schema::new()
        .with("cpu", PropertyDefinition::integer().with_default(json!(2)))
        .with("name", PropertyDefinition::string())
        .with(
            "network",
            PropertyDefinition::object(
                Schema::new()
                    .with("mtu", PropertyDefinition::integer().with_default(json!(1500)))
                    .with("vlan", PropertyDefinition::integer()),
            ),
        )
        .with(
            "disks",
            PropertyDefinition::array(PropertyDefinition::object(
                Schema::new().with("size", PropertyDefinition::integer().with_default(json!(10))),
            )),
        )
}

#[test]
fn fills_absent_top_level_defaults() {
    let out = apply_defaults(&as_map(json!({"name": "web"})), &server_schema());
    assert_eq!(Value::Object(out), json!({"name": "web", "cpu": 2}));
}

#[test]
fn null_counts_as_absent() {
    let out = apply_defaults(&as_map(json!({"cpu": null})), &server_schema());
    assert_eq!(out["cpu"], json!(2));
}

#[test]
fn supplied_values_win() {
    let out = apply_defaults(&as_map(json!({"cpu": 8})), &server_schema());
    assert_eq!(out["cpu"], json!(8));
}

#[test]
fn recurses_into_supplied_objects() {
    let out = apply_defaults(&as_map(json!({"network": {"vlan": 12}})), &server_schema());
    assert_eq!(out["network"], json!({"vlan": 12, "mtu": 1500}));
}

#[test]
fn recurses_into_defaulted_objects() {
    let schema = Schema::new().with(
        "network",
        PropertyDefinition::object(
            Schema::new().with("mtu", PropertyDefinition::integer().with_default(json!(1500))),
        )
        .with_default(json!({})),
    );
    let out = apply_defaults(&Map::new(), &schema);
    assert_eq!(out["network"], json!({"mtu": 1500}));
}

#[test]
fn does_not_recurse_into_array_items() {
    let raw = as_map(json!({"disks": [{}]}));
    let out = apply_defaults(&raw, &server_schema());
    assert_eq!(out["disks"], json!([{}]));
}

#[test]
fn leaves_unknown_keys_alone() {
    let out = apply_defaults(&as_map(json!({"extra": true})), &server_schema());
    assert_eq!(out["extra"], json!(true));
}

fn arb_input() -> impl Strategy<Value = Map<String, Value>> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,6}".prop_map(Value::from),
    ];
    let network = prop::option::of(prop::collection::btree_map(
        prop_oneof![Just("mtu".to_string()), Just("vlan".to_string())],
        leaf.clone(),
        0..3,
    ));
    (prop::option::of(leaf.clone()), prop::option::of(leaf), network).prop_map(
        |(cpu, name, network)| {
            let mut map = Map::new();
            if let Some(v) = cpu {
                map.insert("cpu".into(), v);
            }
            if let Some(v) = name {
                map.insert("name".into(), v);
            }
            if let Some(net) = network {
                map.insert("network".into(), Value::Object(net.into_iter().collect()));
            }
            map
        },
    )
}

proptest! {
    #[test]
    fn apply_defaults_is_idempotent(raw in arb_input()) {
        let schema = server_schema();
        let once = apply_defaults(&raw, &schema);
        let twice = apply_defaults(&once, &schema);
        prop_assert_eq!(once, twice);
    }
}
