//! Host-value import bridge
//!
//! Host values enter the engine through serde: any `T: Serialize` is
//! serialized to a JSON tree and walked into engine values. Serde field
//! attributes double as the rename directive (`#[serde(rename)]`
//! overrides a property name, `#[serde(skip)]` omits the field).
//!
//! Sequences deliberately import as objects with numeric string keys
//! rather than engine arrays; published conditions index them with
//! `[i]` and do not see a `length` property.

use crate::machine::Machine;
use crate::value::{Object, RuntimeError, Value};
use serde::Serialize;

/// Import a host value as an engine value.
pub fn import<T: Serialize>(host: &T) -> Result<Value, RuntimeError> {
    let json = serde_json::to_value(host).map_err(|e| RuntimeError::Import(e.to_string()))?;
    Ok(import_json(&json))
}

/// Import an already-built JSON tree.
pub fn import_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(elements) => {
            let object = Object::new();
            {
                let mut object = object.borrow_mut();
                for (i, element) in elements.iter().enumerate() {
                    object.insert(&i.to_string(), import_json(element));
                }
            }
            Value::Object(object)
        }
        serde_json::Value::Object(map) => {
            let object = Object::new();
            {
                let mut object = object.borrow_mut();
                for (key, val) in map {
                    object.insert(key, import_json(val));
                }
            }
            Value::Object(object)
        }
    }
}

/// Import a host value into the machine's global object under `name`.
pub fn import_global<T: Serialize>(
    m: &mut Machine,
    name: &str,
    host: &T,
) -> Result<(), RuntimeError> {
    let value = import(host)?;
    m.set_global(name, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Sample {
        score: f64,
        #[serde(rename = "displayName")]
        name: String,
        #[serde(skip)]
        _secret: u32,
        missing: Option<String>,
    }

    #[test]
    fn scalars_import_as_leaves() {
        assert_eq!(import(&42u32).unwrap().to_number(), 42.0);
        assert_eq!(import(&-3i64).unwrap().to_number(), -3.0);
        assert_eq!(import(&2.5f64).unwrap().to_number(), 2.5);
        assert!(import(&true).unwrap().to_boolean());
        assert_eq!(import(&"hi").unwrap().to_string(), "hi");
        assert!(matches!(
            import(&Option::<u32>::None).unwrap(),
            Value::Null
        ));
    }

    #[test]
    fn structs_import_with_serde_renames() {
        let sample = Sample {
            score: 75.0,
            name: "row".into(),
            _secret: 9,
            missing: None,
        };
        let v = import(&sample).unwrap();
        assert_eq!(v.get_property("score").unwrap().to_number(), 75.0);
        assert_eq!(v.get_property("displayName").unwrap().to_string(), "row");
        // skipped field imports as absent, which reads as null
        assert!(matches!(v.get_property("_secret").unwrap(), Value::Null));
        // present-but-null fields import as null
        assert!(matches!(v.get_property("missing").unwrap(), Value::Null));
    }

    #[test]
    fn sequences_import_as_objects_with_numeric_keys() {
        let v = import(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(v.kind(), crate::value::ValueKind::Object);
        assert_eq!(v.get_property("1").unwrap().to_number(), 2.0);
        // no length property on imported sequences
        assert!(matches!(v.get_property("length").unwrap(), Value::Null));
    }

    #[test]
    fn string_keyed_maps_import_as_objects() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), 1.0);
        let v = import(&map).unwrap();
        assert_eq!(v.get_property("a").unwrap().to_number(), 1.0);
    }

    #[test]
    fn non_string_map_keys_are_an_import_error() {
        let mut map = BTreeMap::new();
        map.insert(vec![1u8], 1.0);
        assert!(matches!(
            import(&map).unwrap_err(),
            RuntimeError::Import(_)
        ));
    }

    #[test]
    fn import_global_exposes_value_to_expressions() {
        let mut m = crate::compile("test.score").unwrap();
        #[derive(Serialize)]
        struct Row {
            score: f64,
        }
        import_global(&mut m, "test", &Row { score: 5.0 }).unwrap();
        assert_eq!(m.execute().unwrap().to_number(), 5.0);
    }
}
