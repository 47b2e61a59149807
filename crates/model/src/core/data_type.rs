use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, str::FromStr};
use thiserror::Error;

/// Scalar type requested for a column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Int64,
    Double,
    Bool,
    #[serde(rename = "datetime", alias = "date_time")]
    DateTime,
    ListOfObject,
}

/// Column name -> requested type. Columns missing from the map are passed through as strings.
pub type AttributeTypeMap = HashMap<String, AttributeType>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown attribute type: {0}")]
pub struct UnknownAttributeType(pub String);

impl AttributeType {
    pub fn name(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Int64 => "int64",
            AttributeType::Double => "double",
            AttributeType::Bool => "bool",
            AttributeType::DateTime => "datetime",
            AttributeType::ListOfObject => "list_of_object",
        }
    }
}

impl FromStr for AttributeType {
    type Err = UnknownAttributeType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "string" | "str" | "text" => Ok(AttributeType::String),
            "int64" | "int" | "integer" | "long" => Ok(AttributeType::Int64),
            "double" | "float" | "number" => Ok(AttributeType::Double),
            "bool" | "boolean" => Ok(AttributeType::Bool),
            "datetime" | "date_time" | "timestamp" => Ok(AttributeType::DateTime),
            "list_of_object" | "listofobject" => Ok(AttributeType::ListOfObject),
            _ => Err(UnknownAttributeType(s.to_string())),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
