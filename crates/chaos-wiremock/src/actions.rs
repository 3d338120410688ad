//! Configuration-driven chaos actions.
//!
//! Each action validates its input, builds an [`AdminClient`] from the
//! configuration and runs one engine operation. Failures are logged and turned
//! into an empty result (`Vec::new()` or `false`) so an experiment can carry
//! on. The only error an action returns is an unreachable server when the
//! configuration names a host and port.

use crate::config::Configuration;
use crate::engine::{ChunkedDribble, FaultKind, MappingEngine, ResponseBody, StatusCode};
use crate::error::ChaosError;
use crate::filter::MatchMode;
use crate::import;
use crate::mapping::MappingId;
use crate::store::AdminClient;
use serde_json::Value;
use std::path::Path;
use tracing::error;

/// Build the engine for `configuration`; `Ok(None)` when the configuration is
/// unusable (already logged).
async fn engine(
    action: &str,
    configuration: &Configuration,
) -> Result<Option<MappingEngine<AdminClient>>, ChaosError> {
    let client = match configuration.wiremock() {
        Ok(wiremock) => wiremock.client().await,
        Err(e) => Err(e),
    };
    match client {
        Ok(client) => Ok(Some(MappingEngine::new(client))),
        Err(e) if e.is_connection() => Err(e),
        Err(e) => {
            error!("[{}]: {}", action, e);
            Ok(None)
        }
    }
}

/// Log a failed operation and fall back to the empty result
fn settle<T: Default>(action: &str, result: Result<T, ChaosError>) -> T {
    result.unwrap_or_else(|e| {
        error!("[{}]: {}", action, e);
        T::default()
    })
}

/// Validate input before any request is made
fn validate<T>(action: &str, result: Result<T, ChaosError>) -> Option<T> {
    result.map_err(|e| error!("[{}]: {}", action, e)).ok()
}

/// Add mappings; returns the ids created, empty if any create failed
pub async fn add_mappings(
    configuration: &Configuration,
    mappings: &[Value],
) -> Result<Vec<MappingId>, ChaosError> {
    let Some(engine) = engine("add_mappings", configuration).await? else {
        return Ok(Vec::new());
    };
    Ok(settle("add_mappings", engine.populate(mappings).await))
}

/// Add a mapping for every `*.json` file in `dir`
pub async fn populate_from_dir(
    configuration: &Configuration,
    dir: &Path,
) -> Result<Vec<MappingId>, ChaosError> {
    let Some(engine) = engine("populate_from_dir", configuration).await? else {
        return Ok(Vec::new());
    };
    Ok(settle(
        "populate_from_dir",
        import::populate_from_dir(engine.store(), dir).await,
    ))
}

pub async fn delete_mappings(
    configuration: &Configuration,
    filters: &[Value],
) -> Result<Vec<MappingId>, ChaosError> {
    let Some(engine) = engine("delete_mappings", configuration).await? else {
        return Ok(Vec::new());
    };
    Ok(settle("delete_mappings", engine.delete_mappings(filters).await))
}

/// Change the response status of the mappings matched by `filters`
pub async fn update_mappings_status_code(
    configuration: &Configuration,
    filters: &[Value],
    status_code: &str,
) -> Result<Vec<MappingId>, ChaosError> {
    const ACTION: &str = "update_mappings_status_code";
    let Some(status) = validate(ACTION, status_code.parse::<StatusCode>()) else {
        return Ok(Vec::new());
    };
    let Some(engine) = engine(ACTION, configuration).await? else {
        return Ok(Vec::new());
    };
    Ok(settle(ACTION, engine.update_status_code(filters, status).await))
}

/// Change the status and body of every mapping on the server.
///
/// `body_file_name` wins over `body` when both are given.
pub async fn update_all_mappings_status_code_and_body(
    configuration: &Configuration,
    status_code: &str,
    body: Option<String>,
    body_file_name: Option<String>,
) -> Result<Vec<MappingId>, ChaosError> {
    const ACTION: &str = "update_all_mappings_status_code_and_body";
    let Some(status) = validate(ACTION, status_code.parse::<StatusCode>()) else {
        return Ok(Vec::new());
    };
    let body = ResponseBody::select(body, body_file_name);
    let Some(engine) = engine(ACTION, configuration).await? else {
        return Ok(Vec::new());
    };
    Ok(settle(
        ACTION,
        engine.update_all_status_code_and_body(status, body).await,
    ))
}

/// Make the mappings matched by `filters` answer with `fault`
pub async fn update_mappings_fault(
    configuration: &Configuration,
    filters: &[Value],
    fault: &str,
    mode: MatchMode,
) -> Result<Vec<MappingId>, ChaosError> {
    const ACTION: &str = "update_mappings_fault";
    let Some(fault) = validate(ACTION, fault.parse::<FaultKind>()) else {
        return Ok(Vec::new());
    };
    let Some(engine) = engine(ACTION, configuration).await? else {
        return Ok(Vec::new());
    };
    Ok(settle(ACTION, engine.set_fault(filters, fault, mode).await))
}

pub async fn delete_all_mappings(configuration: &Configuration) -> Result<bool, ChaosError> {
    let Some(engine) = engine("delete_all_mappings", configuration).await? else {
        return Ok(false);
    };
    Ok(settle(
        "delete_all_mappings",
        engine.delete_all().await.map(|_| true),
    ))
}

/// Delay every response on the server by `millis`
pub async fn global_fixed_delay(
    configuration: &Configuration,
    millis: u64,
) -> Result<bool, ChaosError> {
    let Some(engine) = engine("global_fixed_delay", configuration).await? else {
        return Ok(false);
    };
    Ok(settle(
        "global_fixed_delay",
        engine.global_fixed_delay(millis).await.map(|_| true),
    ))
}

/// Apply a random delay distribution to every response on the server
pub async fn global_random_delay(
    configuration: &Configuration,
    distribution: &Value,
) -> Result<bool, ChaosError> {
    let Some(engine) = engine("global_random_delay", configuration).await? else {
        return Ok(false);
    };
    Ok(settle(
        "global_random_delay",
        engine.global_random_delay(distribution).await.map(|_| true),
    ))
}

pub async fn fixed_delay(
    configuration: &Configuration,
    filters: &[Value],
    millis: u64,
    mode: MatchMode,
) -> Result<Vec<MappingId>, ChaosError> {
    let Some(engine) = engine("fixed_delay", configuration).await? else {
        return Ok(Vec::new());
    };
    Ok(settle(
        "fixed_delay",
        engine.fixed_delay(filters, millis, mode).await,
    ))
}

/// `requests` are whole request blocks, matched exactly
pub async fn random_delay(
    configuration: &Configuration,
    requests: &[Value],
    distribution: &Value,
) -> Result<Vec<MappingId>, ChaosError> {
    let Some(engine) = engine("random_delay", configuration).await? else {
        return Ok(Vec::new());
    };
    Ok(settle(
        "random_delay",
        engine.random_delay(requests, distribution).await,
    ))
}

pub async fn chunked_dribble_delay(
    configuration: &Configuration,
    requests: &[Value],
    delay: &Value,
) -> Result<Vec<MappingId>, ChaosError> {
    const ACTION: &str = "chunked_dribble_delay";
    let Some(delay) = validate(ACTION, ChunkedDribble::from_value(delay)) else {
        return Ok(Vec::new());
    };
    let Some(engine) = engine(ACTION, configuration).await? else {
        return Ok(Vec::new());
    };
    Ok(settle(
        ACTION,
        engine.chunked_dribble_delay(requests, &delay).await,
    ))
}

/// Take services "down": apply the chunked dribble delay configured under
/// `wiremock.defaults.down` to each exactly-matched request.
pub async fn down(
    configuration: &Configuration,
    requests: &[Value],
) -> Result<Vec<MappingId>, ChaosError> {
    const ACTION: &str = "down";
    let delay = configuration
        .wiremock()
        .and_then(|wiremock| wiremock.down_delay())
        .and_then(ChunkedDribble::from_value);
    let Some(delay) = validate(ACTION, delay) else {
        return Ok(Vec::new());
    };
    let Some(engine) = engine(ACTION, configuration).await? else {
        return Ok(Vec::new());
    };
    Ok(settle(
        ACTION,
        engine.chunked_dribble_delay(requests, &delay).await,
    ))
}

/// Bring services back "up" by removing every delay from their mappings
pub async fn up(
    configuration: &Configuration,
    requests: &[Value],
) -> Result<Vec<MappingId>, ChaosError> {
    let Some(engine) = engine("up", configuration).await? else {
        return Ok(Vec::new());
    };
    Ok(settle("up", engine.up(requests).await))
}

/// Reset the server. This deletes every mapping.
pub async fn reset(configuration: &Configuration) -> Result<bool, ChaosError> {
    let Some(engine) = engine("reset", configuration).await? else {
        return Ok(false);
    };
    Ok(settle("reset", engine.reset().await.map(|_| true)))
}

/// Restore mappings to the ones loaded from the server's mapping files
pub async fn reset_mappings(configuration: &Configuration) -> Result<bool, ChaosError> {
    let Some(engine) = engine("reset_mappings", configuration).await? else {
        return Ok(false);
    };
    Ok(settle(
        "reset_mappings",
        engine.reset_mappings().await.map(|_| true),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WiremockConfig;
    use serde_json::json;

    async fn closed_port() -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    fn config_with(wiremock: WiremockConfig) -> Configuration {
        Configuration {
            wiremock: Some(wiremock),
        }
    }

    #[tokio::test]
    async fn test_missing_configuration_returns_empty() {
        let config = Configuration::default();
        assert!(!reset(&config).await.unwrap());
        assert!(up(&config, &[json!({"url": "/x"})]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_host_port_is_an_error() {
        let config = config_with(WiremockConfig {
            host: Some("127.0.0.1".into()),
            port: Some(closed_port().await),
            timeout: 0.2,
            ..Default::default()
        });
        let result = fixed_delay(&config, &[json!({})], 100, MatchMode::Strict).await;
        assert!(matches!(result, Err(e) if e.is_connection()));
    }

    #[tokio::test]
    async fn test_unreachable_url_is_logged_not_raised() {
        let port = closed_port().await;
        let config = config_with(WiremockConfig {
            url: Some(format!("http://127.0.0.1:{}", port)),
            timeout: 0.2,
            ..Default::default()
        });
        assert!(!reset(&config).await.unwrap());
        assert!(add_mappings(&config, &[json!({"request": {"url": "/a"}})])
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected_before_connecting() {
        // A closed host + port would raise if these actions got as far as
        // building the client.
        let config = config_with(WiremockConfig {
            host: Some("127.0.0.1".into()),
            port: Some(closed_port().await),
            timeout: 0.2,
            ..Default::default()
        });
        let filters = [json!({"url": "/a"})];

        let faulted = update_mappings_fault(&config, &filters, "NOT_A_FAULT", MatchMode::Strict)
            .await
            .unwrap();
        assert!(faulted.is_empty());

        let updated = update_mappings_status_code(&config, &filters, "700")
            .await
            .unwrap();
        assert!(updated.is_empty());

        let updated = update_all_mappings_status_code_and_body(&config, "abc", None, None)
            .await
            .unwrap();
        assert!(updated.is_empty());

        let dribbled = chunked_dribble_delay(&config, &filters, &json!({"numberOfChunks": 5}))
            .await
            .unwrap();
        assert!(dribbled.is_empty());

        // No defaults.down configured
        assert!(down(&config, &filters).await.unwrap().is_empty());
    }
}
