use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, hash::Hash};

/// A JSON object nested inside a CSV cell.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Typed cell value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Int64(i64),
    Double(f64),
    Bool(bool),
    DateTime(DateTime<Utc>),
    ListOfObject(Vec<JsonObject>),
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        use Value::*;
        std::mem::discriminant(self).hash(state);
        match self {
            Null => {}
            String(v) => v.hash(state),
            Int64(v) => v.hash(state),
            // Hash the bits so NaN and -0.0 hash consistently
            Double(v) => v.to_bits().hash(state),
            Bool(v) => v.hash(state),
            DateTime(v) => v.hash(state),
            ListOfObject(v) => {
                let json_str = serde_json::to_string(v).unwrap_or_default();
                json_str.hash(state);
            }
        }
    }
}

impl Value {
    pub fn as_objects(&self) -> Option<&[JsonObject]> {
        match self {
            Value::ListOfObject(v) => Some(v),
            _ => None,
        }
    }

    /// Plain JSON rendering, without the enum tag.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::String(v) => serde_json::Value::String(v.clone()),
            Value::Int64(v) => serde_json::Value::from(*v),
            Value::Double(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Bool(v) => serde_json::Value::Bool(*v),
            Value::DateTime(v) => {
                serde_json::Value::String(v.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::ListOfObject(v) => serde_json::Value::Array(
                v.iter()
                    .cloned()
                    .map(serde_json::Value::Object)
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::String(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::DateTime(v) => write!(f, "{}", v.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::ListOfObject(_) => write!(f, "{}", self.to_json()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldValue {
    pub name: String,
    pub value: Value,
}

impl FieldValue {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        FieldValue {
            name: name.into(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn to_json_drops_the_enum_tag() {
        let mut obj = JsonObject::new();
        obj.insert("alias".into(), "X".into());
        obj.insert("primary".into(), true.into());

        assert_eq!(Value::Int64(7).to_json(), serde_json::json!(7));
        assert_eq!(Value::Double(1.1).to_json(), serde_json::json!(1.1));
        assert_eq!(Value::Null.to_json(), serde_json::Value::Null);
        assert_eq!(
            Value::ListOfObject(vec![obj]).to_json(),
            serde_json::json!([{ "alias": "X", "primary": true }])
        );
    }

    #[test]
    fn datetime_renders_as_rfc3339_utc() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(Value::DateTime(ts).to_string(), "2024-03-01T12:30:00Z");
    }

    #[test]
    fn non_finite_doubles_become_null_json() {
        assert_eq!(Value::Double(f64::NAN).to_json(), serde_json::Value::Null);
    }
}
