//! HTTP client for the WireMock admin API

use super::reachability::can_connect;
use super::{MappingStore, StoreError};
use crate::mapping::{Mapping, MappingId};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};

/// Response wrapper for the mapping list
#[derive(Debug, Deserialize)]
struct MappingsResponse {
    #[serde(default)]
    mappings: Vec<Mapping>,
}

/// HTTP client for the WireMock admin API
#[derive(Debug, Clone)]
pub struct AdminClient {
    client: Client,
    base_url: String,
    admin_url: String,
    mappings_endpoint: Url,
}

impl AdminClient {
    /// Create a client for an already-known base URL such as
    /// `http://localhost:8080`. No connectivity check is made.
    pub fn from_url(url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        let base_url = url.trim_end_matches('/').to_string();
        let admin_url = format!("{base_url}/__admin");
        let mappings_endpoint = Url::parse(&format!("{admin_url}/mappings"))
            .ok()
            .filter(|endpoint| !endpoint.cannot_be_a_base())
            .ok_or_else(|| StoreError::InvalidUrl(url.to_string()))?;

        Ok(Self {
            client,
            base_url,
            admin_url,
            mappings_endpoint,
        })
    }

    /// Create a client for `http://host:port` after checking the port accepts
    /// TCP connections.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, StoreError> {
        if !can_connect(host, port, timeout).await {
            error!("WireMock server not found at {}:{}", host, port);
            return Err(StoreError::Connection(format!(
                "WireMock server not found at {host}:{port}"
            )));
        }
        Self::from_url(&format!("http://{host}:{port}"), timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn mappings_url(&self) -> String {
        format!("{}/mappings", self.admin_url)
    }

    /// The id is pushed as one percent-encoded path segment
    fn mapping_url(&self, id: &MappingId) -> Url {
        let mut url = self.mappings_endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(&id.to_string());
        }
        url
    }

    /// Post to a settings or reset endpoint that answers 200 on success
    async fn post_admin(
        &self,
        operation: &str,
        path: &str,
        body: Option<Value>,
    ) -> Result<(), StoreError> {
        let url = format!("{}/{}", self.admin_url, path);
        debug!("POST {}", url);
        let request = self.client.post(&url);
        let request = match body {
            Some(body) => request.json(&body),
            None => request,
        };
        let resp = request.send().await?;
        expect_status(operation, resp, StatusCode::OK).await?;
        Ok(())
    }
}

/// Turn any status other than `expected` into [`StoreError::Remote`]
async fn expect_status(
    operation: &str,
    resp: Response,
    expected: StatusCode,
) -> Result<Response, StoreError> {
    let status = resp.status();
    if status == expected {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    error!("[{}]: admin API returned {}: {}", operation, status, body);
    Err(StoreError::Remote {
        status: status.as_u16(),
        body,
    })
}

async fn parse_mapping(resp: Response) -> Result<Mapping, StoreError> {
    let value: Value = resp.json().await?;
    Mapping::from_value(value)
        .ok_or_else(|| StoreError::Parse("expected a mapping object".to_string()))
}

#[async_trait]
impl MappingStore for AdminClient {
    async fn list_mappings(&self) -> Result<Vec<Mapping>, StoreError> {
        let url = self.mappings_url();
        debug!("GET {}", url);
        let resp = self.client.get(&url).send().await?;
        let resp = expect_status("mappings", resp, StatusCode::OK).await?;

        let body: MappingsResponse = resp.json().await?;
        Ok(body.mappings)
    }

    async fn get_mapping(&self, id: &MappingId) -> Result<Option<Mapping>, StoreError> {
        let url = self.mapping_url(id);
        debug!("GET {}", url);
        let resp = self.client.get(url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = expect_status("mapping_by_id", resp, StatusCode::OK).await?;
        parse_mapping(resp).await.map(Some)
    }

    async fn create_mapping(&self, mapping: &Mapping) -> Result<MappingId, StoreError> {
        let url = self.mappings_url();
        debug!("POST {}", url);
        let resp = self.client.post(&url).json(mapping).send().await?;
        let resp = expect_status("add_mapping", resp, StatusCode::CREATED).await?;

        let created = parse_mapping(resp).await?;
        created
            .id()
            .ok_or_else(|| StoreError::Parse("created mapping has no id".to_string()))
    }

    async fn replace_mapping(
        &self,
        id: &MappingId,
        mapping: &Mapping,
    ) -> Result<Mapping, StoreError> {
        let url = self.mapping_url(id);
        debug!("PUT {}", url);
        let resp = self.client.put(url).json(mapping).send().await?;
        let resp = expect_status("update_mapping", resp, StatusCode::OK).await?;
        parse_mapping(resp).await
    }

    async fn delete_mapping(&self, id: &MappingId) -> Result<MappingId, StoreError> {
        let url = self.mapping_url(id);
        debug!("DELETE {}", url);
        let resp = self.client.delete(url).send().await?;
        expect_status("delete_mapping", resp, StatusCode::OK).await?;
        Ok(id.clone())
    }

    async fn delete_all_mappings(&self) -> Result<(), StoreError> {
        let url = self.mappings_url();
        debug!("DELETE {}", url);
        let resp = self.client.delete(&url).send().await?;
        expect_status("delete_all_mappings", resp, StatusCode::OK).await?;
        Ok(())
    }

    async fn reset_all(&self) -> Result<(), StoreError> {
        self.post_admin("reset", "reset", None).await
    }

    async fn reset_mappings(&self) -> Result<(), StoreError> {
        self.post_admin("reset_mappings", "mappings/reset", None).await
    }

    async fn set_global_fixed_delay(&self, millis: u64) -> Result<(), StoreError> {
        self.post_admin(
            "global_fixed_delay",
            "settings",
            Some(json!({ "fixedDelay": millis })),
        )
        .await
    }

    async fn set_global_random_delay(&self, distribution: &Value) -> Result<(), StoreError> {
        self.post_admin(
            "global_random_delay",
            "settings",
            Some(json!({ "delayDistribution": distribution })),
        )
        .await
    }
}
