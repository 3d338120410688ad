//! Validated inputs for the mutation operations.
//!
//! Everything here is checked before the engine makes its first request, so a
//! bad fault name or status code never results in a partial batch.

use crate::error::ChaosError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Faults WireMock can return instead of a normal response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaultKind {
    /// Close the connection without a response
    EmptyResponse,
    /// Send an OK status header, then garbage, then close
    MalformedResponseChunk,
    /// Send garbage, then close
    RandomDataThenClose,
    /// Close the connection with a TCP reset
    ConnectionResetByPeer,
}

impl FaultKind {
    pub const ALL: [FaultKind; 4] = [
        FaultKind::EmptyResponse,
        FaultKind::MalformedResponseChunk,
        FaultKind::RandomDataThenClose,
        FaultKind::ConnectionResetByPeer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::EmptyResponse => "EMPTY_RESPONSE",
            FaultKind::MalformedResponseChunk => "MALFORMED_RESPONSE_CHUNK",
            FaultKind::RandomDataThenClose => "RANDOM_DATA_THEN_CLOSE",
            FaultKind::ConnectionResetByPeer => "CONNECTION_RESET_BY_PEER",
        }
    }
}

impl FromStr for FaultKind {
    type Err = ChaosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FaultKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ChaosError::InvalidFaultKind(s.to_string()))
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP status code in `100..=599`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode(u16);

impl StatusCode {
    pub fn new(code: i64) -> Result<Self, ChaosError> {
        match u16::try_from(code) {
            Ok(code) if (100..=599).contains(&code) => Ok(Self(code)),
            _ => Err(ChaosError::InvalidStatusCode(code.to_string())),
        }
    }

    /// Accept a JSON integer or a string holding one
    pub fn from_value(value: &Value) -> Result<Self, ChaosError> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| ChaosError::InvalidStatusCode(n.to_string()))
                .and_then(Self::new),
            Value::String(s) => s.parse(),
            other => Err(ChaosError::InvalidStatusCode(other.to_string())),
        }
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

impl FromStr for StatusCode {
    type Err = ChaosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code: i64 = s
            .trim()
            .parse()
            .map_err(|_| ChaosError::InvalidStatusCode(s.to_string()))?;
        Self::new(code)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Replacement response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    /// Inline body text, written to `body`
    Text(String),
    /// File under WireMock's `__files`, written to `bodyFileName`
    File(String),
}

impl ResponseBody {
    /// Pick the body from optional text and file arguments; the file wins when
    /// both are given, empty strings count as absent.
    pub fn select(body: Option<String>, body_file_name: Option<String>) -> Option<Self> {
        let non_empty = |s: Option<String>| s.filter(|s| !s.is_empty());
        non_empty(body_file_name)
            .map(ResponseBody::File)
            .or_else(|| non_empty(body).map(ResponseBody::Text))
    }
}

/// A chunked dribble delay: the response is split into `numberOfChunks`
/// pieces sent over `totalDuration` milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkedDribble(Map<String, Value>);

impl ChunkedDribble {
    pub const REQUIRED_KEYS: [&'static str; 2] = ["numberOfChunks", "totalDuration"];

    /// Validate a delay description. Extra keys are kept as-is.
    pub fn from_value(value: &Value) -> Result<Self, ChaosError> {
        let fields = value.as_object().ok_or_else(|| {
            ChaosError::InvalidDelaySpecification(format!(
                "chunked dribble delay must be an object, got {value}"
            ))
        })?;
        if let Some(missing) = Self::REQUIRED_KEYS
            .iter()
            .find(|key| !fields.contains_key(**key))
        {
            return Err(ChaosError::InvalidDelaySpecification(format!(
                "attribute {missing} not found in chunked dribble delay"
            )));
        }
        Ok(Self(fields.clone()))
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fault_kind_parsing() {
        for kind in FaultKind::ALL {
            assert_eq!(kind.as_str().parse::<FaultKind>().unwrap(), kind);
        }
        assert!(matches!(
            "NOT_A_FAULT".parse::<FaultKind>(),
            Err(ChaosError::InvalidFaultKind(name)) if name == "NOT_A_FAULT"
        ));
        assert!("empty_response".parse::<FaultKind>().is_err());
    }

    #[test]
    fn test_fault_kind_serde_matches_wire_names() {
        assert_eq!(
            serde_json::to_value(FaultKind::ConnectionResetByPeer).unwrap(),
            json!("CONNECTION_RESET_BY_PEER")
        );
        let kind: FaultKind = serde_json::from_value(json!("MALFORMED_RESPONSE_CHUNK")).unwrap();
        assert_eq!(kind, FaultKind::MalformedResponseChunk);
    }

    #[test]
    fn test_status_code_bounds() {
        assert_eq!("404".parse::<StatusCode>().unwrap().as_u16(), 404);
        assert_eq!(" 100 ".parse::<StatusCode>().unwrap().as_u16(), 100);
        assert_eq!("599".parse::<StatusCode>().unwrap().as_u16(), 599);
        for bad in ["700", "99", "600", "-1", "abc", "", "4.04"] {
            assert!(
                matches!(bad.parse::<StatusCode>(), Err(ChaosError::InvalidStatusCode(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_status_code_from_json() {
        assert_eq!(StatusCode::from_value(&json!(503)).unwrap().as_u16(), 503);
        assert_eq!(StatusCode::from_value(&json!("201")).unwrap().as_u16(), 201);
        assert!(StatusCode::from_value(&json!(70000)).is_err());
        assert!(StatusCode::from_value(&json!(200.5)).is_err());
        assert!(StatusCode::from_value(&json!(null)).is_err());
    }

    #[test]
    fn test_response_body_selection() {
        assert_eq!(
            ResponseBody::select(Some("oops".into()), Some("down.json".into())),
            Some(ResponseBody::File("down.json".into()))
        );
        assert_eq!(
            ResponseBody::select(Some("oops".into()), Some(String::new())),
            Some(ResponseBody::Text("oops".into()))
        );
        assert_eq!(ResponseBody::select(None, None), None);
    }

    #[test]
    fn test_chunked_dribble_requires_both_keys() {
        let ok = ChunkedDribble::from_value(&json!({"numberOfChunks": 5, "totalDuration": 1000}));
        assert!(ok.is_ok());

        for bad in [
            json!({"numberOfChunks": 5}),
            json!({"totalDuration": 1000}),
            json!([5, 1000]),
            json!(1000),
        ] {
            assert!(matches!(
                ChunkedDribble::from_value(&bad),
                Err(ChaosError::InvalidDelaySpecification(_))
            ));
        }
    }
}
