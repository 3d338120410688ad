//! Mapping storage backends.
//!
//! [`MappingStore`] is the seam between the engine and the WireMock admin API.
//! [`AdminClient`] talks HTTP to a live server; [`InMemoryStore`] keeps
//! mappings in process with the same replace-wholesale semantics.

mod client;
mod inmemory;
mod reachability;

pub use client::AdminClient;
pub use inmemory::InMemoryStore;
pub use reachability::can_connect;

use crate::mapping::{Mapping, MappingId};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when talking to a mapping store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Admin API returned {status}: {body}")]
    Remote { status: u16, body: String },
    #[error("Failed to parse response: {0}")]
    Parse(String),
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Invalid admin URL: {0}")]
    InvalidUrl(String),
}

/// Backend-agnostic access to stub mappings.
///
/// No method retries. Updates replace the stored mapping entirely.
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Fetch every mapping, in server order
    async fn list_mappings(&self) -> Result<Vec<Mapping>, StoreError>;

    /// Fetch one mapping; `Ok(None)` when the id is unknown
    async fn get_mapping(&self, id: &MappingId) -> Result<Option<Mapping>, StoreError>;

    /// Create a mapping and return the id the server assigned
    async fn create_mapping(&self, mapping: &Mapping) -> Result<MappingId, StoreError>;

    /// Overwrite the mapping stored under `id`
    async fn replace_mapping(&self, id: &MappingId, mapping: &Mapping)
        -> Result<Mapping, StoreError>;

    async fn delete_mapping(&self, id: &MappingId) -> Result<MappingId, StoreError>;

    async fn delete_all_mappings(&self) -> Result<(), StoreError>;

    /// Reset the whole server: mappings, request journal and scenarios
    async fn reset_all(&self) -> Result<(), StoreError>;

    /// Restore mappings to their file-backed defaults
    async fn reset_mappings(&self) -> Result<(), StoreError>;

    /// Delay applied to every response on the server
    async fn set_global_fixed_delay(&self, millis: u64) -> Result<(), StoreError>;

    /// Random delay distribution applied to every response on the server
    async fn set_global_random_delay(&self, distribution: &Value) -> Result<(), StoreError>;
}
