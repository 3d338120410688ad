//! Read-filter-mutate-write operations.
//!
//! Targets are processed one at a time in caller order. Operations differ in
//! how they treat a failed write: status, body, fault and populate abort the
//! batch, the delay operations log the failure and move on. Returned id lists
//! only contain mappings whose write succeeded.

use super::types::{ChunkedDribble, FaultKind, ResponseBody, StatusCode};
use super::MappingEngine;
use crate::error::ChaosError;
use crate::filter::{parse_all, MatchMode};
use crate::mapping::{response_field, Mapping, MappingId};
use crate::store::MappingStore;
use serde_json::Value;
use std::fmt::Debug;
use tracing::{debug, error, info, warn};

fn not_found(filter: &impl Debug) -> ChaosError {
    ChaosError::MappingNotFound(format!("{filter:?}"))
}

impl<S: MappingStore> MappingEngine<S> {
    /// Send a patched mapping back to the store
    async fn write(&self, operation: &str, mapping: &Mapping) -> Result<MappingId, ChaosError> {
        let id = mapping.id().ok_or_else(|| {
            ChaosError::InvalidMapping(format!("{} has no id", mapping.describe()))
        })?;
        self.store.replace_mapping(&id, mapping).await?;
        info!("[{}]: updated mapping {} ({})", operation, id, mapping.describe());
        Ok(id)
    }

    /// Create every mapping; the first failed create aborts the batch.
    pub async fn populate(&self, mappings: &[Value]) -> Result<Vec<MappingId>, ChaosError> {
        let mappings = mappings
            .iter()
            .map(|value| {
                Mapping::from_value(value.clone()).ok_or_else(|| {
                    ChaosError::InvalidMapping(format!("mapping must be an object, got {value}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut ids = Vec::with_capacity(mappings.len());
        for mapping in &mappings {
            match self.store.create_mapping(mapping).await {
                Ok(id) => ids.push(id),
                Err(e) => {
                    error!("[populate]: Error adding mapping {}: {}", mapping.describe(), e);
                    return Err(e.into());
                }
            }
        }
        Ok(ids)
    }

    /// Delete the first strict match of each filter.
    pub async fn delete_mappings(&self, filters: &[Value]) -> Result<Vec<MappingId>, ChaosError> {
        let descriptions = parse_all(filters)?;

        let mut ids = Vec::new();
        for description in &descriptions {
            let Some(mapping) = self.resolve_first(description, MatchMode::Strict).await else {
                warn!("[delete_mappings]: {}", not_found(description.filter()));
                continue;
            };
            let Some(id) = mapping.id() else {
                warn!("[delete_mappings]: Mapping {} has no id", mapping.describe());
                continue;
            };
            match self.store.delete_mapping(&id).await {
                Ok(id) => {
                    info!("[delete_mappings]: deleted mapping {}", id);
                    ids.push(id);
                }
                Err(e) => error!("[delete_mappings]: Error deleting mapping {}: {}", id, e),
            }
        }
        Ok(ids)
    }

    /// Delete every mapping on the server
    pub async fn delete_all(&self) -> Result<(), ChaosError> {
        self.store.delete_all_mappings().await?;
        info!("[delete_all_mappings]: deleted all mappings");
        Ok(())
    }

    /// Set `response.status` on the first strict match of each filter.
    pub async fn update_status_code(
        &self,
        filters: &[Value],
        status: StatusCode,
    ) -> Result<Vec<MappingId>, ChaosError> {
        let descriptions = parse_all(filters)?;

        let mut targets = Vec::new();
        for description in &descriptions {
            match self.resolve_first(description, MatchMode::Strict).await {
                Some(mapping) => targets.push(mapping),
                None => warn!("[update_status_code]: {}", not_found(description.filter())),
            }
        }
        if targets.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::with_capacity(targets.len());
        for mut mapping in targets {
            mapping.update_response(|response| {
                response.insert(response_field::STATUS.to_string(), status.as_u16().into())
            });
            ids.push(self.write("update_status_code", &mapping).await?);
        }
        Ok(ids)
    }

    /// Set the status and, optionally, the body of every mapping on the server.
    ///
    /// Setting `body` removes `bodyFileName` and vice versa. The status is
    /// written as a JSON number, whatever form the caller parsed it from.
    pub async fn update_all_status_code_and_body(
        &self,
        status: StatusCode,
        body: Option<ResponseBody>,
    ) -> Result<Vec<MappingId>, ChaosError> {
        let mappings = self.snapshot().await;

        let mut ids = Vec::with_capacity(mappings.len());
        for mut mapping in mappings {
            mapping.update_response(|response| {
                response.insert(response_field::STATUS.to_string(), status.as_u16().into());
                match &body {
                    Some(ResponseBody::Text(text)) => {
                        response.remove(response_field::BODY_FILE_NAME);
                        response.insert(response_field::BODY.to_string(), text.clone().into());
                    }
                    Some(ResponseBody::File(name)) => {
                        response.remove(response_field::BODY);
                        response
                            .insert(response_field::BODY_FILE_NAME.to_string(), name.clone().into());
                    }
                    None => {}
                }
            });
            ids.push(self.write("update_status_code_and_body", &mapping).await?);
        }
        Ok(ids)
    }

    /// Replace the response of every mapping matched by `filters` with `fault`.
    pub async fn set_fault(
        &self,
        filters: &[Value],
        fault: FaultKind,
        mode: MatchMode,
    ) -> Result<Vec<MappingId>, ChaosError> {
        let targets = self.resolve_all(filters, mode).await?;

        let mut ids = Vec::with_capacity(targets.len());
        for mut mapping in targets {
            mapping.update_response(|response| {
                response.insert(response_field::FAULT.to_string(), fault.as_str().into())
            });
            ids.push(self.write("update_fault", &mapping).await?);
        }
        Ok(ids)
    }

    /// Add a fixed delay to every mapping matched by `filters`, dropping any
    /// random delay distribution they had.
    pub async fn fixed_delay(
        &self,
        filters: &[Value],
        millis: u64,
        mode: MatchMode,
    ) -> Result<Vec<MappingId>, ChaosError> {
        let targets = self.resolve_all(filters, mode).await?;

        let mut ids = Vec::with_capacity(targets.len());
        for mut mapping in targets {
            mapping.update_response(|response| {
                response.insert(response_field::FIXED_DELAY.to_string(), millis.into());
                response.remove(response_field::DELAY_DISTRIBUTION)
            });
            match self.write("fixed_delay", &mapping).await {
                Ok(id) => ids.push(id),
                Err(e) => error!("[fixed_delay]: Error updating {}: {}", mapping.describe(), e),
            }
        }
        Ok(ids)
    }

    pub async fn global_fixed_delay(&self, millis: u64) -> Result<(), ChaosError> {
        self.store.set_global_fixed_delay(millis).await?;
        info!("[global_fixed_delay]: set to {}ms", millis);
        Ok(())
    }

    /// Set `delayDistribution` on the mapping whose request equals each entry
    /// of `requests`.
    pub async fn random_delay(
        &self,
        requests: &[Value],
        distribution: &Value,
    ) -> Result<Vec<MappingId>, ChaosError> {
        if !distribution.is_object() {
            error!("[random_delay]: parameter has to be an object, got {}", distribution);
        }

        let mut ids = Vec::new();
        for request in requests {
            let Some(mut mapping) = self.find_exact(request).await else {
                error!("[random_delay]: {}", not_found(request));
                continue;
            };
            mapping.update_response(|response| {
                response.insert(
                    response_field::DELAY_DISTRIBUTION.to_string(),
                    distribution.clone(),
                )
            });
            match self.write("random_delay", &mapping).await {
                Ok(id) => ids.push(id),
                Err(e) => error!("[random_delay]: Error updating {}: {}", mapping.describe(), e),
            }
        }
        Ok(ids)
    }

    pub async fn global_random_delay(&self, distribution: &Value) -> Result<(), ChaosError> {
        if !distribution.is_object() {
            error!(
                "[global_random_delay]: parameter has to be an object, got {}",
                distribution
            );
        }
        self.store.set_global_random_delay(distribution).await?;
        info!("[global_random_delay]: set to {}", distribution);
        Ok(())
    }

    /// Set `chunkedDribbleDelay` on the mapping whose request equals each
    /// entry of `requests`.
    pub async fn chunked_dribble_delay(
        &self,
        requests: &[Value],
        delay: &ChunkedDribble,
    ) -> Result<Vec<MappingId>, ChaosError> {
        let mut ids = Vec::new();
        for request in requests {
            let Some(mut mapping) = self.find_exact(request).await else {
                error!("[chunked_dribble_delay]: {}", not_found(request));
                continue;
            };
            mapping.update_response(|response| {
                response.insert(
                    response_field::CHUNKED_DRIBBLE_DELAY.to_string(),
                    delay.to_value(),
                )
            });
            match self.write("chunked_dribble_delay", &mapping).await {
                Ok(id) => ids.push(id),
                Err(e) => error!(
                    "[chunked_dribble_delay]: Error updating {}: {}",
                    mapping.describe(),
                    e
                ),
            }
        }
        Ok(ids)
    }

    /// Remove every delay from the mapping whose request equals each entry of
    /// `requests`. Requests without a mapping are skipped.
    pub async fn up(&self, requests: &[Value]) -> Result<Vec<MappingId>, ChaosError> {
        let mut ids = Vec::new();
        for request in requests {
            let Some(mut mapping) = self.find_exact(request).await else {
                continue;
            };
            debug!("[up]: found mapping {}", mapping.describe());

            mapping.update_response(|response| {
                for key in response_field::DELAYS {
                    response.remove(key);
                }
            });
            match self.write("up", &mapping).await {
                Ok(id) => ids.push(id),
                Err(e) => error!("[up]: Error updating {}: {}", mapping.describe(), e),
            }
        }
        Ok(ids)
    }

    /// Reset the whole server: every mapping is removed
    pub async fn reset(&self) -> Result<(), ChaosError> {
        self.store.reset_all().await?;
        info!("[reset]: server reset");
        Ok(())
    }

    pub async fn reset_mappings(&self) -> Result<(), ChaosError> {
        self.store.reset_mappings().await?;
        info!("[reset_mappings]: mappings reset");
        Ok(())
    }
}
