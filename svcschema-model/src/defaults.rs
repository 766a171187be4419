use crate::Schema;
use serde_json::{Map, Value};

/// Fills in declared defaults for absent (or null) properties.
///
/// Recurses into nested objects, whether the object was supplied or came
/// from a default itself. Array items are never touched. Applying the
/// pass twice yields the same map as applying it once.
pub fn apply_defaults(raw: &Map<String, Value>, schema: &Schema) -> Map<String, Value> {
    let mut out = raw.clone();
    for (name, definition) in schema {
        let absent = out.get(name).is_none_or(Value::is_null);
        if absent {
            if let Some(default) = &definition.default {
                out.insert(name.clone(), default.clone());
            }
        }

        let filled = match (&definition.properties, out.get(name)) {
            (Some(nested), Some(Value::Object(obj))) => Some(apply_defaults(obj, nested)),
            _ => None,
        };
        if let Some(filled) = filled {
            out.insert(name.clone(), Value::Object(filled));
        }
    }
    out
}
