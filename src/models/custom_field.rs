use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// An untyped value taken from an issue's custom-field map.
#[derive(Debug, Clone, PartialEq)]
pub enum RawFieldValue {
    Null,
    Integer(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Sequence(Vec<RawFieldValue>),
    Object(BTreeMap<String, RawFieldValue>),
    /// A shape we refuse to guess at; the payload names it for diagnostics.
    Unsupported(String),
}

impl RawFieldValue {
    pub fn shape(&self) -> &str {
        match self {
            RawFieldValue::Null => "null",
            RawFieldValue::Integer(_) => "integer",
            RawFieldValue::Float(_) => "float",
            RawFieldValue::String(_) => "string",
            RawFieldValue::Bool(_) => "boolean",
            RawFieldValue::Sequence(_) => "sequence",
            RawFieldValue::Object(_) => "object",
            RawFieldValue::Unsupported(kind) => kind,
        }
    }

    /// Canonical string form of a scalar, `None` for everything else.
    ///
    /// Floats are always fixed-point with six decimals, so `1e21` comes out
    /// as digits rather than scientific notation.
    pub fn scalar_string(&self) -> Option<String> {
        match self {
            RawFieldValue::Integer(i) => Some(i.to_string()),
            RawFieldValue::Float(f) => Some(format!("{:.6}", f)),
            RawFieldValue::String(s) => Some(s.clone()),
            RawFieldValue::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            RawFieldValue::Null | RawFieldValue::Unsupported(_) => Value::Null,
            RawFieldValue::Integer(i) => Value::from(*i),
            RawFieldValue::Float(f) => Value::from(*f),
            RawFieldValue::String(s) => Value::String(s.clone()),
            RawFieldValue::Bool(b) => Value::Bool(*b),
            RawFieldValue::Sequence(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            RawFieldValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<&Value> for RawFieldValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => RawFieldValue::Null,
            Value::Bool(b) => RawFieldValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    RawFieldValue::Integer(i)
                } else if n.is_u64() {
                    RawFieldValue::Unsupported("integer out of range".to_string())
                } else {
                    match n.as_f64() {
                        Some(f) => RawFieldValue::Float(f),
                        None => RawFieldValue::Unsupported("number".to_string()),
                    }
                }
            }
            Value::String(s) => RawFieldValue::String(s.clone()),
            Value::Array(items) => RawFieldValue::Sequence(items.iter().map(Self::from).collect()),
            Value::Object(map) => RawFieldValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from(v)))
                    .collect(),
            ),
        }
    }
}

/// The sub-field layout shared by every flattened custom field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValues {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub votes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl FieldValues {
    pub fn is_empty(&self) -> bool {
        *self == FieldValues::default()
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Default::default()
        }
    }
}

/// One flat, storage-friendly record per populated custom field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomField {
    pub field_name: String,
    #[serde(flatten)]
    pub values: FieldValues,
}
