//! WireMock stub mappings.
//!
//! A [`Mapping`] wraps the raw JSON object returned by the admin API. Every
//! field is kept, including ones this crate never looks at, because the admin
//! API replaces mappings wholesale: whatever is missing from the object sent
//! back is lost on the server.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Keys of the `response` block touched by the mutation operations.
pub mod response_field {
    pub const STATUS: &str = "status";
    pub const BODY: &str = "body";
    pub const BODY_FILE_NAME: &str = "bodyFileName";
    pub const FIXED_DELAY: &str = "fixedDelayMilliseconds";
    pub const DELAY_DISTRIBUTION: &str = "delayDistribution";
    pub const CHUNKED_DRIBBLE_DELAY: &str = "chunkedDribbleDelay";
    pub const FAULT: &str = "fault";

    /// Every per-mapping delay setting
    pub const DELAYS: [&str; 3] = [FIXED_DELAY, DELAY_DISTRIBUTION, CHUNKED_DRIBBLE_DELAY];
}

/// Server-assigned mapping identifier (a UUID string on WireMock, but
/// numeric ids are accepted as well).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingId {
    Number(i64),
    Text(String),
}

impl MappingId {
    /// Read an id from a JSON value; only strings and integers qualify.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(MappingId::Text(s.clone())),
            Value::Number(n) => n.as_i64().map(MappingId::Number),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            MappingId::Number(n) => Value::from(*n),
            MappingId::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for MappingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingId::Number(n) => write!(f, "{n}"),
            MappingId::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MappingId {
    fn from(id: &str) -> Self {
        MappingId::Text(id.to_string())
    }
}

impl From<String> for MappingId {
    fn from(id: String) -> Self {
        MappingId::Text(id)
    }
}

impl From<i64> for MappingId {
    fn from(id: i64) -> Self {
        MappingId::Number(id)
    }
}

/// One stub mapping as stored on the server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mapping(Map<String, Value>);

impl Mapping {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wrap a JSON value; returns `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    pub fn id(&self) -> Option<MappingId> {
        self.0.get("id").and_then(MappingId::from_value)
    }

    pub fn set_id(&mut self, id: &MappingId) {
        self.0.insert("id".to_string(), id.to_value());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The `request` match criteria, if present and an object
    pub fn request(&self) -> Option<&Map<String, Value>> {
        self.section("request")
    }

    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.section("metadata")
    }

    pub fn response(&self) -> Option<&Map<String, Value>> {
        self.section("response")
    }

    /// Edit the `response` block in place. A missing or non-object block is
    /// replaced by an empty object first.
    pub fn update_response<R>(&mut self, edit: impl FnOnce(&mut Map<String, Value>) -> R) -> R {
        let mut response = match self.0.remove("response") {
            Some(Value::Object(response)) => response,
            _ => Map::new(),
        };
        let result = edit(&mut response);
        self.0.insert("response".to_string(), Value::Object(response));
        result
    }

    pub(crate) fn section(&self, key: &str) -> Option<&Map<String, Value>> {
        self.0.get(key).and_then(Value::as_object)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Short `METHOD url` description used in log lines
    pub fn describe(&self) -> String {
        let request = self.request();
        let field = |key: &str| {
            request
                .and_then(|r| r.get(key))
                .and_then(Value::as_str)
                .unwrap_or("-")
                .to_string()
        };
        let url = ["url", "urlPath", "urlPattern", "urlPathPattern"]
            .iter()
            .map(|key| field(key))
            .find(|value| value != "-")
            .unwrap_or_else(|| "-".to_string());
        format!("{} {}", field("method"), url)
    }
}
