//! Mapping query and mutation engine.
//!
//! The engine resolves filter descriptions against a fresh snapshot of the
//! store and rewrites the matched mappings. Each mutation patches the fetched
//! JSON object in place and sends the whole object back, so fields the engine
//! does not know about survive the round trip.

mod mutations;
mod types;

pub use types::{ChunkedDribble, FaultKind, ResponseBody, StatusCode};

use crate::error::ChaosError;
use crate::filter::{parse_all, request_matches_exactly, FilterDescription, MatchMode};
use crate::mapping::{Mapping, MappingId};
use crate::store::MappingStore;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, error, warn};

/// Filter resolution and mapping mutations on top of a [`MappingStore`]
pub struct MappingEngine<S> {
    store: S,
}

impl<S: MappingStore> MappingEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// All mappings currently on the server.
    ///
    /// A failed listing is logged and yields an empty snapshot so batch
    /// operations degrade to no-ops.
    pub async fn snapshot(&self) -> Vec<Mapping> {
        match self.store.list_mappings().await {
            Ok(mappings) => mappings,
            Err(e) => {
                error!("[mappings]: Error retrieving mappings: {}", e);
                Vec::new()
            }
        }
    }

    /// Fetch a single mapping by id
    pub async fn mapping(&self, id: &MappingId) -> Result<Mapping, ChaosError> {
        self.store
            .get_mapping(id)
            .await?
            .ok_or_else(|| ChaosError::MappingNotFound(id.to_string()))
    }

    /// Mappings matching `description`, in server order, up to `limit`.
    ///
    /// `None` and `Some(0)` both mean no limit.
    pub async fn resolve_filter(
        &self,
        description: &Value,
        mode: MatchMode,
        limit: Option<usize>,
    ) -> Result<Vec<Mapping>, ChaosError> {
        let description = FilterDescription::parse(description)?;
        Ok(self.resolve(&description, mode, limit).await)
    }

    /// The first mapping matching `description`, if any
    pub async fn find_one(
        &self,
        description: &Value,
        mode: MatchMode,
    ) -> Result<Option<Mapping>, ChaosError> {
        let description = FilterDescription::parse(description)?;
        Ok(self.resolve_first(&description, mode).await)
    }

    /// The first mapping whose whole `request` block equals `request`
    pub async fn find_exact(&self, request: &Value) -> Option<Mapping> {
        self.snapshot()
            .await
            .into_iter()
            .find(|mapping| request_matches_exactly(mapping, request))
    }

    /// Union of the mappings matched by each description, without duplicates.
    ///
    /// Every description is validated before the first listing.
    pub async fn resolve_all(
        &self,
        descriptions: &[Value],
        mode: MatchMode,
    ) -> Result<Vec<Mapping>, ChaosError> {
        let descriptions = parse_all(descriptions)?;

        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        for description in &descriptions {
            let matches = self.resolve(description, mode, None).await;
            if matches.is_empty() {
                warn!("No mappings found for filter {:?}", description.filter());
                continue;
            }
            for mapping in matches {
                let Some(id) = mapping.id() else {
                    warn!("Skipping mapping without id: {}", mapping.describe());
                    continue;
                };
                if seen.insert(id) {
                    resolved.push(mapping);
                }
            }
        }
        Ok(resolved)
    }

    async fn resolve(
        &self,
        description: &FilterDescription,
        mode: MatchMode,
        limit: Option<usize>,
    ) -> Vec<Mapping> {
        let matches = self
            .snapshot()
            .await
            .into_iter()
            .filter(|mapping| description.matches(mapping, mode));
        let matches: Vec<Mapping> = match limit {
            Some(limit) if limit > 0 => matches.take(limit).collect(),
            _ => matches.collect(),
        };
        debug!(
            "Filter on {} matched {} mapping(s)",
            description.target().key(),
            matches.len()
        );
        matches
    }

    async fn resolve_first(
        &self,
        description: &FilterDescription,
        mode: MatchMode,
    ) -> Option<Mapping> {
        self.resolve(description, mode, Some(1)).await.into_iter().next()
    }
}
