//! Configuration for reaching a WireMock server.
//!
//! Configuration files are YAML (JSON is accepted too, being a subset):
//!
//! ```yaml
//! wiremock:
//!   url: http://localhost:8080   # or host + port
//!   timeout: 1                   # seconds
//!   defaults:
//!     down:
//!       numberOfChunks: 1
//!       totalDuration: 60000
//! ```

use crate::error::ChaosError;
use crate::store::AdminClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

fn default_timeout() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Configuration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wiremock: Option<WiremockConfig>,
}

/// The `wiremock` section
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WiremockConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    #[serde(default)]
    pub defaults: Defaults,
}

impl Default for WiremockConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: None,
            port: None,
            timeout: default_timeout(),
            defaults: Defaults::default(),
        }
    }
}

/// Named delay specifications used by the alias actions
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Defaults {
    /// Chunked dribble delay applied by `down`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<Value>,
}

/// Where the WireMock server lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Checked for reachability before use
    HostPort { host: String, port: u16 },
    /// Used as-is
    Url(String),
}

impl Configuration {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ChaosError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| ChaosError::io(path, e))?;
        contents.parse()
    }

    pub fn wiremock(&self) -> Result<&WiremockConfig, ChaosError> {
        self.wiremock
            .as_ref()
            .ok_or_else(|| ChaosError::ConfigurationMissing("wiremock".to_string()))
    }
}

/// Parse YAML; JSON documents are accepted too
impl FromStr for Configuration {
    type Err = ChaosError;

    fn from_str(contents: &str) -> Result<Self, Self::Err> {
        Ok(serde_yaml::from_str(contents)?)
    }
}

impl WiremockConfig {
    /// `host` + `port` win over `url` when both are given.
    pub fn endpoint(&self) -> Result<Endpoint, ChaosError> {
        match (&self.host, self.port, &self.url) {
            (Some(host), Some(port), _) => Ok(Endpoint::HostPort {
                host: host.clone(),
                port,
            }),
            (_, _, Some(url)) => Ok(Endpoint::Url(url.clone())),
            _ => Err(ChaosError::ConfigurationMissing(
                "wiremock.url or wiremock.host and wiremock.port".to_string(),
            )),
        }
    }

    pub fn timeout(&self) -> Duration {
        match Duration::try_from_secs_f64(self.timeout) {
            Ok(timeout) if !timeout.is_zero() => timeout,
            _ => {
                warn!(
                    "Invalid wiremock.timeout {}, using {}s",
                    self.timeout,
                    default_timeout()
                );
                Duration::from_secs_f64(default_timeout())
            }
        }
    }

    /// The `wiremock.defaults.down` delay specification
    pub fn down_delay(&self) -> Result<&Value, ChaosError> {
        self.defaults
            .down
            .as_ref()
            .ok_or_else(|| ChaosError::ConfigurationMissing("wiremock.defaults.down".to_string()))
    }

    /// Build an admin client, probing the server first when configured by
    /// host and port.
    pub async fn client(&self) -> Result<AdminClient, ChaosError> {
        let timeout = self.timeout();
        let client = match self.endpoint()? {
            Endpoint::HostPort { host, port } => AdminClient::connect(&host, port, timeout).await?,
            Endpoint::Url(url) => AdminClient::from_url(&url, timeout)?,
        };
        Ok(client)
    }
}
