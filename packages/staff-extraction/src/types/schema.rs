//! Target schema handed to the model backend.
//!
//! The schema is generated from [`StaffDirectory`] with `schemars` and then
//! rewritten into the strict form structured-output APIs require.

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::record::StaffRecord;

/// Wire shape of a model response: `{"staff_members": [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct StaffDirectory {
    /// Every real staff member found in the text
    #[serde(default)]
    pub staff_members: Vec<StaffRecord>,
}

/// Named JSON schema for the record list.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    /// Schema name sent alongside the schema
    pub name: String,

    /// Strict JSON schema (all properties required, no `$ref`s)
    pub schema: Value,
}

impl RecordSchema {
    /// Schema for `{"staff_members": [{name, role?, email?}]}`.
    pub fn staff_directory() -> Self {
        let mut schema = serde_json::to_value(schema_for!(StaffDirectory)).unwrap_or_default();

        fix_object_schemas(&mut schema);
        inline_refs(&mut schema);

        if let Value::Object(map) = &mut schema {
            map.remove("definitions");
            map.remove("$schema");
        }

        Self {
            name: "staff_directory".to_string(),
            schema,
        }
    }
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self::staff_directory()
    }
}

/// Add `additionalProperties: false` and list every property as required.
fn fix_object_schemas(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type") == Some(&Value::String("object".to_string())) {
                map.insert("additionalProperties".to_string(), Value::Bool(false));

                if let Some(Value::Object(props)) = map.get("properties") {
                    let all_keys: Vec<Value> =
                        props.keys().map(|k| Value::String(k.clone())).collect();
                    map.insert("required".to_string(), Value::Array(all_keys));
                }
            }
            for (_, v) in map.iter_mut() {
                fix_object_schemas(v);
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                fix_object_schemas(item);
            }
        }
        _ => {}
    }
}

/// Replace `#/definitions/...` references with the definitions themselves.
fn inline_refs(value: &mut Value) {
    let definitions = match value {
        Value::Object(map) => map.get("definitions").cloned(),
        _ => None,
    };

    if let Some(defs) = definitions {
        inline_refs_recursive(value, &defs);
    }
}

fn inline_refs_recursive(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(ref_path)) = map.get("$ref").cloned() {
                if let Some(type_name) = ref_path.strip_prefix("#/definitions/") {
                    if let Some(def) = definitions.get(type_name) {
                        *value = def.clone();
                        inline_refs_recursive(value, definitions);
                        return;
                    }
                }
            }
            for (_, v) in map.iter_mut() {
                inline_refs_recursive(v, definitions);
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                inline_refs_recursive(item, definitions);
            }
        }
        _ => {}
    }
}
