//! Result normalization for downstream tool output.
//!
//! Downstream services return whatever JSON the tool produced. The supervisor
//! always hands its caller a mapping, so output is first classified into one
//! of four shapes and then flattened:
//!
//! - absent (missing or null) -> `{}`
//! - sequence -> `{"items": [...]}`
//! - mapping -> unchanged
//! - scalar -> `{"value": scalar}`

use serde_json::{Map, Value};

/// Shape of a downstream result
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Absent,
    Scalar(Value),
    Sequence(Vec<Value>),
    Mapping(Map<String, Value>),
}

impl From<Option<Value>> for ToolOutput {
    fn from(value: Option<Value>) -> Self {
        match value {
            None | Some(Value::Null) => ToolOutput::Absent,
            Some(Value::Array(items)) => ToolOutput::Sequence(items),
            Some(Value::Object(map)) => ToolOutput::Mapping(map),
            Some(scalar) => ToolOutput::Scalar(scalar),
        }
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        ToolOutput::from(Some(value))
    }
}

impl ToolOutput {
    /// Flatten into the uniform mapping shape
    pub fn into_mapping(self) -> Map<String, Value> {
        match self {
            ToolOutput::Absent => Map::new(),
            ToolOutput::Sequence(items) => {
                let mut map = Map::new();
                map.insert("items".to_string(), Value::Array(items));
                map
            }
            ToolOutput::Mapping(map) => map,
            ToolOutput::Scalar(value) => {
                let mut map = Map::new();
                map.insert("value".to_string(), value);
                map
            }
        }
    }
}

/// Shorthand for `ToolOutput::from(raw).into_mapping()`
pub fn normalize_result(raw: Option<Value>) -> Map<String, Value> {
    ToolOutput::from(raw).into_mapping()
}
