//! Post-processing of the `__VALUE__` key in marshalled JSON.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;
use xmlconf_xsd::VALUE_TAG;

/// Rename `__VALUE__` inside top-level elements that have a configured name.
///
/// Applies to an object directly under the element key and to each object
/// inside an array under it. A renamed entry whose value is blank is dropped.
pub fn rename_value_tags(json: &mut Value, value_names: &BTreeMap<String, String>) {
    let Value::Object(root) = json else {
        return;
    };

    for (element, value_name) in value_names {
        match root.get_mut(element) {
            Some(Value::Object(object)) => rename_in(object, value_name),
            Some(Value::Array(items)) => {
                for item in items.iter_mut() {
                    if let Value::Object(object) = item {
                        rename_in(object, value_name);
                    }
                }
            }
            _ => {}
        }
    }
}

fn rename_in(object: &mut Map<String, Value>, value_name: &str) {
    let Some(value) = object.remove(VALUE_TAG) else {
        return;
    };
    if is_blank(&value) {
        debug!("dropping blank value for renamed key '{value_name}'");
        return;
    }
    object.insert(value_name.to_owned(), value);
}

/// Recursively remove `__VALUE__` entries holding an empty or whitespace-only string.
pub fn remove_empty_value_tags(json: &mut Value) {
    match json {
        Value::Object(object) => {
            if object.get(VALUE_TAG).is_some_and(is_blank) {
                debug!("removing blank '{VALUE_TAG}'");
                object.remove(VALUE_TAG);
            }
            for value in object.values_mut() {
                remove_empty_value_tags(value);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                remove_empty_value_tags(item);
            }
        }
        _ => {}
    }
}

fn is_blank(value: &Value) -> bool {
    matches!(value, Value::String(text) if text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn names(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_rename_object_and_array_members() {
        let mut json = json!({
            "parameter": {"__VALUE__": "foo"},
            "statement": [{"__VALUE__": "a", "transactional": true}, {"__VALUE__": "b"}, "raw"],
            "other": {"__VALUE__": "kept"}
        });
        rename_value_tags(&mut json, &names(&[("parameter", "value"), ("statement", "sql")]));

        assert_eq!(
            json,
            json!({
                "parameter": {"value": "foo"},
                "statement": [{"sql": "a", "transactional": true}, {"sql": "b"}, "raw"],
                "other": {"__VALUE__": "kept"}
            })
        );
    }

    #[test]
    fn test_rename_is_top_level_only() {
        let mut json = json!({"outer": {"parameter": {"__VALUE__": "deep"}}});
        let before = json.clone();
        rename_value_tags(&mut json, &names(&[("parameter", "value")]));
        assert_eq!(json, before);
    }

    #[test]
    fn test_rename_drops_blank_values() {
        let mut json = json!({"parameter": {"__VALUE__": "  ", "key": "k"}});
        rename_value_tags(&mut json, &names(&[("parameter", "value")]));
        assert_eq!(json, json!({"parameter": {"key": "k"}}));
    }

    #[test]
    fn test_remove_empty_value_tags() {
        let mut json = json!({
            "description": {"__VALUE__": "   "},
            "list": [{"__VALUE__": ""}, {"__VALUE__": "x"}, {"nested": {"__VALUE__": "\n\t"}}],
            "value": "",
            "number": {"__VALUE__": 0}
        });
        remove_empty_value_tags(&mut json);

        assert_eq!(
            json,
            json!({
                "description": {},
                "list": [{}, {"__VALUE__": "x"}, {"nested": {}}],
                "value": "",
                "number": {"__VALUE__": 0}
            })
        );
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut once = json!({
            "a": [{"__VALUE__": " "}, {"b": {"__VALUE__": "keep", "c": [{"__VALUE__": ""}]}}]
        });
        remove_empty_value_tags(&mut once);
        let mut twice = once.clone();
        remove_empty_value_tags(&mut twice);
        assert_eq!(once, twice);
    }
}
