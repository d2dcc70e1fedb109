//! Flattens an issue's loosely-typed custom fields into uniform rows.
//!
//! Nothing here fails: every entry that cannot be flattened is dropped and
//! reported as a [`Warning`], and the caller decides where warnings go.

use crate::models::custom_field::{CustomField, FieldValues, RawFieldValue};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    UnsupportedShape { field: String, shape: String },
    Serialization { field: String, message: String },
    NestedSequence { field: String, index: usize },
    UnusableElement { field: String, index: usize },
    IgnoredSlot { field: String, slot: String },
    EmptyFieldName,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnsupportedShape { field, shape } => {
                write!(f, "{}: unsupported value shape '{}', field dropped", field, shape)
            }
            Warning::Serialization { field, message } => {
                write!(f, "{}: failed to serialize value: {}", field, message)
            }
            Warning::NestedSequence { field, index } => {
                write!(f, "{}[{}]: nested sequences are not flattened", field, index)
            }
            Warning::UnusableElement { field, index } => {
                write!(f, "{}[{}]: element has no usable sub-fields", field, index)
            }
            Warning::IgnoredSlot { field, slot } => {
                write!(f, "{}.{}: value ignored", field, slot)
            }
            Warning::EmptyFieldName => write!(f, "field with an empty name dropped"),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Normalized {
    pub fields: Vec<CustomField>,
    pub warnings: Vec<Warning>,
}

/// Flattens every populated entry, in identifier order.
pub fn normalize_fields(fields: &BTreeMap<String, RawFieldValue>) -> Normalized {
    let mut out = Normalized::default();

    for (name, value) in fields {
        if name.is_empty() {
            out.warnings.push(Warning::EmptyFieldName);
            continue;
        }
        if let Some(values) = normalize_entry(name, value, &mut out.warnings) {
            out.fields.push(CustomField {
                field_name: name.clone(),
                values,
            });
        }
    }

    out
}

/// Decodes a raw JSON field map and flattens it.
pub fn normalize_json(fields: &serde_json::Map<String, serde_json::Value>) -> Normalized {
    let raw: BTreeMap<String, RawFieldValue> = fields
        .iter()
        .map(|(name, value)| (name.clone(), RawFieldValue::from(value)))
        .collect();
    normalize_fields(&raw)
}

fn normalize_entry(
    name: &str,
    value: &RawFieldValue,
    warnings: &mut Vec<Warning>,
) -> Option<FieldValues> {
    match value {
        RawFieldValue::Null => None,
        RawFieldValue::Integer(_)
        | RawFieldValue::Float(_)
        | RawFieldValue::String(_)
        | RawFieldValue::Bool(_) => value.scalar_string().map(FieldValues::with_value),
        RawFieldValue::Sequence(items) => normalize_sequence(name, items, warnings),
        RawFieldValue::Object(map) => {
            let values = map_object(name, map, warnings);
            if !values.is_empty() {
                return Some(values);
            }
            // Nothing matched the layout; keep the whole object in the fallback slot.
            match serde_json::to_string(&value.to_json()) {
                Ok(json) => Some(FieldValues::with_value(json)),
                Err(e) => {
                    warnings.push(Warning::Serialization {
                        field: name.to_string(),
                        message: e.to_string(),
                    });
                    None
                }
            }
        }
        RawFieldValue::Unsupported(_) => {
            warnings.push(Warning::UnsupportedShape {
                field: name.to_string(),
                shape: value.shape().to_string(),
            });
            None
        }
    }
}

fn normalize_sequence(
    name: &str,
    items: &[RawFieldValue],
    warnings: &mut Vec<Warning>,
) -> Option<FieldValues> {
    let mut records = Vec::new();

    for (index, item) in items.iter().enumerate() {
        let record = match item {
            RawFieldValue::Null => continue,
            RawFieldValue::Object(map) => map_object(name, map, warnings),
            RawFieldValue::Sequence(_) => {
                warnings.push(Warning::NestedSequence {
                    field: name.to_string(),
                    index,
                });
                continue;
            }
            RawFieldValue::Unsupported(shape) => {
                warnings.push(Warning::UnsupportedShape {
                    field: format!("{}[{}]", name, index),
                    shape: shape.clone(),
                });
                continue;
            }
            scalar => match scalar.scalar_string() {
                Some(s) => FieldValues::with_value(s),
                None => continue,
            },
        };

        if record.is_empty() {
            warnings.push(Warning::UnusableElement {
                field: name.to_string(),
                index,
            });
        } else {
            records.push(record);
        }
    }

    if records.is_empty() {
        return None;
    }

    match serde_json::to_string(&records) {
        Ok(json) => Some(FieldValues::with_value(json)),
        Err(e) => {
            warnings.push(Warning::Serialization {
                field: name.to_string(),
                message: e.to_string(),
            });
            None
        }
    }
}

fn map_object(
    name: &str,
    map: &BTreeMap<String, RawFieldValue>,
    warnings: &mut Vec<Warning>,
) -> FieldValues {
    let mut values = FieldValues::default();

    for (slot, raw) in map {
        let target = match slot.as_str() {
            "id" => &mut values.id,
            "name" => &mut values.name,
            "key" => &mut values.key,
            "displayName" => &mut values.display_name,
            "description" => &mut values.description,
            "value" => &mut values.value,
            "votes" => {
                match raw {
                    RawFieldValue::Null => {}
                    RawFieldValue::Integer(i) => values.votes = Some(*i),
                    // `as` saturates; reject anything outside the i64 range.
                    RawFieldValue::Float(f)
                        if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 =>
                    {
                        values.votes = Some(*f as i64)
                    }
                    _ => warnings.push(Warning::IgnoredSlot {
                        field: name.to_string(),
                        slot: slot.clone(),
                    }),
                }
                continue;
            }
            _ => continue,
        };

        match raw {
            RawFieldValue::Null => {}
            other => match other.scalar_string() {
                Some(s) => *target = Some(s),
                None => warnings.push(Warning::IgnoredSlot {
                    field: name.to_string(),
                    slot: slot.clone(),
                }),
            },
        }
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(value: serde_json::Value) -> Normalized {
        match value {
            serde_json::Value::Object(map) => normalize_json(&map),
            _ => panic!("fixture must be an object"),
        }
    }

    fn field(name: &str, values: FieldValues) -> CustomField {
        CustomField {
            field_name: name.to_string(),
            values,
        }
    }

    #[test]
    fn test_scalars_become_single_value_records() {
        let out = normalize(json!({
            "bool": true,
            "float": 0.1,
            "int": 42,
            "string": "hello",
        }));

        assert!(out.warnings.is_empty());
        assert_eq!(
            out.fields,
            vec![
                field("bool", FieldValues::with_value("true")),
                field("float", FieldValues::with_value("0.100000")),
                field("int", FieldValues::with_value("42")),
                field("string", FieldValues::with_value("hello")),
            ]
        );
    }

    #[test]
    fn test_null_is_skipped() {
        let out = normalize(json!({"gone": null}));
        assert!(out.fields.is_empty());
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_mixed_batch_sorted_by_name() {
        let out = normalize(json!({"c": "x", "b": null, "a": 3.5}));

        assert_eq!(
            out.fields,
            vec![
                field("a", FieldValues::with_value("3.500000")),
                field("c", FieldValues::with_value("x")),
            ]
        );
    }

    #[test]
    fn test_sequence_of_objects_serialized_into_value() {
        let out = normalize(json!({"f": [{"id": "1"}, {"id": "2"}]}));

        assert_eq!(out.fields.len(), 1);
        assert_eq!(out.fields[0].field_name, "f");
        assert_eq!(
            out.fields[0].values.value.as_deref(),
            Some(r#"[{"id":"1"},{"id":"2"}]"#)
        );
    }

    #[test]
    fn test_sequence_of_strings_uses_value_slot() {
        let out = normalize(json!({"labels": ["a", "b"]}));
        assert_eq!(
            out.fields[0].values.value.as_deref(),
            Some(r#"[{"value":"a"},{"value":"b"}]"#)
        );
    }

    #[test]
    fn test_empty_sequence_emits_nothing() {
        let out = normalize(json!({"f": []}));
        assert!(out.fields.is_empty());
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_sequence_without_usable_elements_emits_nothing() {
        let out = normalize(json!({"f": [{"unknown": 1}, [1, 2], null]}));

        assert!(out.fields.is_empty());
        assert_eq!(
            out.warnings,
            vec![
                Warning::UnusableElement {
                    field: "f".to_string(),
                    index: 0
                },
                Warning::NestedSequence {
                    field: "f".to_string(),
                    index: 1
                },
            ]
        );
    }

    #[test]
    fn test_object_maps_known_slots() {
        let out = normalize(json!({"f": {"name": "Bob", "id": "42", "active": true}}));

        assert_eq!(
            out.fields,
            vec![field(
                "f",
                FieldValues {
                    id: Some("42".to_string()),
                    name: Some("Bob".to_string()),
                    ..Default::default()
                }
            )]
        );
    }

    #[test]
    fn test_object_field_name_is_forced() {
        let out = normalize(json!({"customfield_1": {"fieldName": "spoofed", "value": "Yes"}}));
        assert_eq!(out.fields[0].field_name, "customfield_1");
        assert_eq!(out.fields[0].values.value.as_deref(), Some("Yes"));
    }

    #[test]
    fn test_object_votes_and_numeric_id() {
        let out = normalize(json!({"votes": {"votes": 4, "hasVoted": false, "id": 10}}));

        let values = &out.fields[0].values;
        assert_eq!(values.votes, Some(4));
        assert_eq!(values.id.as_deref(), Some("10"));
    }

    #[test]
    fn test_empty_field_name_is_dropped() {
        let out = normalize(json!({"": "x", "ok": 1}));

        assert_eq!(out.fields, vec![field("ok", FieldValues::with_value("1"))]);
        assert_eq!(out.warnings, vec![Warning::EmptyFieldName]);
    }

    #[test]
    fn test_votes_integral_float_accepted() {
        let out = normalize(json!({"f": {"votes": 4.0}}));
        assert_eq!(out.fields[0].values.votes, Some(4));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_votes_out_of_range_float_is_ignored() {
        let out = normalize(json!({"f": {"votes": 1e300, "name": "n"}, "g": {"votes": -1e19, "id": "1"}}));

        assert_eq!(out.fields[0].values.votes, None);
        assert_eq!(out.fields[0].values.name.as_deref(), Some("n"));
        assert_eq!(out.fields[1].values.votes, None);
        assert_eq!(
            out.warnings,
            vec![
                Warning::IgnoredSlot {
                    field: "f".to_string(),
                    slot: "votes".to_string()
                },
                Warning::IgnoredSlot {
                    field: "g".to_string(),
                    slot: "votes".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_votes_non_numeric_is_ignored() {
        let out = normalize(json!({"f": {"votes": "many", "key": "K"}}));

        assert_eq!(out.fields[0].values.votes, None);
        assert_eq!(out.fields[0].values.key.as_deref(), Some("K"));
        assert_eq!(
            out.warnings,
            vec![Warning::IgnoredSlot {
                field: "f".to_string(),
                slot: "votes".to_string()
            }]
        );
    }

    #[test]
    fn test_sequence_keeps_usable_elements_only() {
        let out = normalize(json!({"f": [{"id": "1"}, {"unknown": true}, ["nested"], null, {"name": "n"}]}));

        assert_eq!(
            out.fields,
            vec![field("f", FieldValues::with_value(r#"[{"id":"1"},{"name":"n"}]"#))]
        );
        assert_eq!(
            out.warnings,
            vec![
                Warning::UnusableElement {
                    field: "f".to_string(),
                    index: 1
                },
                Warning::NestedSequence {
                    field: "f".to_string(),
                    index: 2
                },
            ]
        );
    }

    #[test]
    fn test_unsupported_element_in_sequence() {
        let mut fields = BTreeMap::new();
        fields.insert(
            "f".to_string(),
            RawFieldValue::Sequence(vec![
                RawFieldValue::Unsupported("function".to_string()),
                RawFieldValue::String("kept".to_string()),
            ]),
        );

        let out = normalize_fields(&fields);

        assert_eq!(
            out.fields,
            vec![field("f", FieldValues::with_value(r#"[{"value":"kept"}]"#))]
        );
        assert_eq!(
            out.warnings,
            vec![Warning::UnsupportedShape {
                field: "f[0]".to_string(),
                shape: "function".to_string()
            }]
        );
    }

    #[test]
    fn test_object_non_scalar_slot_is_ignored() {
        let out = normalize(json!({"f": {"name": "n", "value": {"nested": true}}}));

        assert_eq!(out.fields[0].values.name.as_deref(), Some("n"));
        assert!(out.fields[0].values.value.is_none());
        assert_eq!(
            out.warnings,
            vec![Warning::IgnoredSlot {
                field: "f".to_string(),
                slot: "value".to_string()
            }]
        );
    }

    #[test]
    fn test_object_without_known_slots_falls_back_to_json() {
        let out = normalize(json!({"f": {"b": 1, "a": "x"}}));
        assert_eq!(out.fields[0].values.value.as_deref(), Some(r#"{"a":"x","b":1}"#));
    }

    #[test]
    fn test_unsupported_shape_is_dropped_with_warning() {
        let mut fields = BTreeMap::new();
        fields.insert(
            "f".to_string(),
            RawFieldValue::Unsupported("channel".to_string()),
        );
        fields.insert("g".to_string(), RawFieldValue::Integer(1));

        let out = normalize_fields(&fields);

        assert_eq!(out.fields, vec![field("g", FieldValues::with_value("1"))]);
        assert_eq!(
            out.warnings,
            vec![Warning::UnsupportedShape {
                field: "f".to_string(),
                shape: "channel".to_string()
            }]
        );
    }

    #[test]
    fn test_every_record_has_field_name() {
        let out = normalize(json!({
            "a": 1,
            "b": [{"id": "x"}],
            "c": {"key": "K"},
            "d": null,
        }));

        assert_eq!(out.fields.len(), 3);
        assert!(out.fields.iter().all(|f| !f.field_name.is_empty()));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let input = json!({
            "z": [{"name": "n"}],
            "a": {"displayName": "Alice"},
            "m": 2.0,
        });

        assert_eq!(normalize(input.clone()), normalize(input));
    }
}
