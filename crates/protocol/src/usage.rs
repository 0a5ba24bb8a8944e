use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Token counters reported by the backend. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

impl TokenUsage {
    /// Read the numeric counters of a `token_usage` object; non-numeric
    /// values are ignored.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let counter = |key: &str| object.get(key).and_then(as_count);
        Self {
            input_tokens: counter("input_tokens"),
            output_tokens: counter("output_tokens"),
            total_tokens: counter("total_tokens"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.input_tokens.is_none() && self.output_tokens.is_none() && self.total_tokens.is_none()
    }
}

fn as_count(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
}

impl fmt::Display for TokenUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<u64>| v.map_or_else(|| "-".to_string(), |n| n.to_string());
        write!(
            f,
            "input={} output={} total={}",
            show(self.input_tokens),
            show(self.output_tokens),
            show(self.total_tokens)
        )
    }
}
