use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use model::core::{
    data_type::AttributeType,
    value::{JsonObject, Value},
};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot coerce {value:?} in column '{column}' to {target}: {reason}")]
pub struct CoercionError {
    pub column: String,
    pub value: String,
    pub target: String,
    pub reason: String,
}

impl CoercionError {
    fn new(column: &str, value: &str, target: &str, reason: impl Into<String>) -> Self {
        CoercionError {
            column: column.to_string(),
            value: value.to_string(),
            target: target.to_string(),
            reason: reason.into(),
        }
    }
}

const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Turns one raw cell into a typed value.
///
/// Numeric columns must parse; anything else is an error naming the column.
/// Int64 cells keep exact integers and fall back to `Double` for fractional
/// values. Bool, DateTime and ListOfObject columns are best effort: a cell
/// that does not parse is kept as its raw string. Untyped cells pass through
/// as strings, except that a cell shaped like a JSON array of objects
/// (`[{...}]`) is expanded.
pub fn coerce_value(
    column: &str,
    raw: &str,
    hint: Option<AttributeType>,
) -> Result<Value, CoercionError> {
    let Some(target) = hint else {
        let trimmed = raw.trim();
        if trimmed.starts_with("[{") && trimmed.ends_with("}]") {
            return parse_object_list(trimmed)
                .map(Value::ListOfObject)
                .map_err(|e| CoercionError::new(column, raw, "list_of_object", e.to_string()));
        }
        return Ok(Value::String(raw.to_string()));
    };

    let value = match target {
        AttributeType::String => Value::String(raw.to_string()),
        AttributeType::Double => Value::Double(parse_f64(column, raw, target)?),
        AttributeType::Int64 => parse_int(column, raw)?,
        AttributeType::Bool => parse_bool(raw).map_or_else(|| passthrough(raw), Value::Bool),
        AttributeType::DateTime => {
            parse_datetime(raw).map_or_else(|| passthrough(raw), Value::DateTime)
        }
        AttributeType::ListOfObject => parse_object_list(raw.trim())
            .map_or_else(|_| passthrough(raw), Value::ListOfObject),
    };
    Ok(value)
}

fn passthrough(raw: &str) -> Value {
    Value::String(raw.to_string())
}

fn parse_f64(column: &str, raw: &str, target: AttributeType) -> Result<f64, CoercionError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| CoercionError::new(column, raw, target.name(), e.to_string()))
}

/// Exact integers parse directly so large ids keep every digit. Integral
/// floats such as `3.0` or `1e3` become integers when they fit; other numbers
/// are kept as doubles.
fn parse_int(column: &str, raw: &str) -> Result<Value, CoercionError> {
    if let Ok(v) = raw.trim().parse::<i64>() {
        return Ok(Value::Int64(v));
    }
    let float = parse_f64(column, raw, AttributeType::Int64)?;
    let integral = float.is_finite()
        && float.fract() == 0.0
        && float >= i64::MIN as f64
        && float < i64::MAX as f64;
    if integral {
        Ok(Value::Int64(float as i64))
    } else {
        Ok(Value::Double(float))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(ts.and_utc());
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

fn parse_object_list(json: &str) -> Result<Vec<JsonObject>, serde_json::Error> {
    serde_json::from_str::<Vec<JsonObject>>(json)
}
