//! Error types for the engine, configuration and actions.

use crate::store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving filters and mutating mappings
#[derive(Error, Debug)]
pub enum ChaosError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    #[error("Fault {0} is not available")]
    InvalidFaultKind(String),
    #[error("Incorrect HTTP status code: {0}")]
    InvalidStatusCode(String),
    #[error("Invalid delay specification: {0}")]
    InvalidDelaySpecification(String),
    #[error("Invalid mapping: {0}")]
    InvalidMapping(String),
    #[error("No mapping found for {0}")]
    MappingNotFound(String),
    #[error("Missing configuration: {0}")]
    ConfigurationMissing(String),
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ChaosError {
    /// Whether the WireMock server could not be reached at all.
    ///
    /// This is the only failure actions escalate instead of logging.
    pub fn is_connection(&self) -> bool {
        matches!(self, ChaosError::Store(StoreError::Connection(_)))
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ChaosError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_errors_are_flagged() {
        let err = ChaosError::from(StoreError::Connection("localhost:1".to_string()));
        assert!(err.is_connection());

        let err = ChaosError::from(StoreError::Remote {
            status: 500,
            body: "boom".to_string(),
        });
        assert!(!err.is_connection());
        assert!(!ChaosError::InvalidFaultKind("NOPE".to_string()).is_connection());
    }

    #[test]
    fn test_error_messages() {
        let err = ChaosError::InvalidStatusCode("700".to_string());
        assert_eq!(err.to_string(), "Incorrect HTTP status code: 700");

        let err = ChaosError::from(StoreError::Remote {
            status: 404,
            body: "not found".to_string(),
        });
        assert_eq!(err.to_string(), "Admin API returned 404: not found");
    }
}
