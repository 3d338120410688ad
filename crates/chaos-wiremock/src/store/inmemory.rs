use super::{MappingStore, StoreError};
use crate::mapping::{Mapping, MappingId};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Default)]
struct State {
    mappings: Vec<Mapping>,
    next_id: i64,
    writes: usize,
    failing_ids: HashSet<MappingId>,
    fail_listing: bool,
    global_fixed_delay: Option<u64>,
    global_delay_distribution: Option<Value>,
}

impl State {
    fn position(&self, id: &MappingId) -> Option<usize> {
        self.mappings.iter().position(|m| m.id().as_ref() == Some(id))
    }

    fn check_writable(&self, id: &MappingId) -> Result<(), StoreError> {
        if self.failing_ids.contains(id) {
            return Err(StoreError::Remote {
                status: 500,
                body: format!("write to mapping {id} rejected"),
            });
        }
        Ok(())
    }
}

fn not_found(id: &MappingId) -> StoreError {
    StoreError::Remote {
        status: 404,
        body: format!("mapping {id} not found"),
    }
}

/// In-memory implementation of MappingStore
///
/// Mirrors the admin API semantics: ids are assigned on create, updates
/// replace the whole mapping, listing preserves insertion order. Every
/// mutating call is counted so callers can assert that nothing was written.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store without counting writes. Mappings without an id get one.
    pub fn with_mappings(mappings: impl IntoIterator<Item = Mapping>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock();
            for mut mapping in mappings {
                if mapping.id().is_none() {
                    state.next_id += 1;
                    mapping.set_id(&MappingId::Number(state.next_id));
                }
                state.mappings.push(mapping);
            }
        }
        store
    }

    /// Make every create, replace and delete of `id` fail with a 500
    pub fn fail_writes_for(&self, id: impl Into<MappingId>) {
        self.state.lock().failing_ids.insert(id.into());
    }

    /// Make `list_mappings` fail with a 500
    pub fn fail_listing(&self) {
        self.state.lock().fail_listing = true;
    }

    /// Number of mutating calls that reached the store (successful or not)
    pub fn writes(&self) -> usize {
        self.state.lock().writes
    }

    /// Current mappings, in order
    pub fn mappings(&self) -> Vec<Mapping> {
        self.state.lock().mappings.clone()
    }

    pub fn mapping(&self, id: impl Into<MappingId>) -> Option<Mapping> {
        let id = id.into();
        let state = self.state.lock();
        state.position(&id).map(|i| state.mappings[i].clone())
    }

    pub fn global_fixed_delay(&self) -> Option<u64> {
        self.state.lock().global_fixed_delay
    }

    pub fn global_delay_distribution(&self) -> Option<Value> {
        self.state.lock().global_delay_distribution.clone()
    }
}

#[async_trait]
impl MappingStore for InMemoryStore {
    async fn list_mappings(&self) -> Result<Vec<Mapping>, StoreError> {
        let state = self.state.lock();
        if state.fail_listing {
            return Err(StoreError::Remote {
                status: 500,
                body: "listing rejected".to_string(),
            });
        }
        Ok(state.mappings.clone())
    }

    async fn get_mapping(&self, id: &MappingId) -> Result<Option<Mapping>, StoreError> {
        let state = self.state.lock();
        Ok(state.position(id).map(|i| state.mappings[i].clone()))
    }

    async fn create_mapping(&self, mapping: &Mapping) -> Result<MappingId, StoreError> {
        let mut state = self.state.lock();
        state.writes += 1;

        let id = match mapping.id() {
            Some(id) => id,
            None => {
                state.next_id += 1;
                MappingId::Number(state.next_id)
            }
        };
        state.check_writable(&id)?;

        let mut stored = mapping.clone();
        stored.set_id(&id);
        match state.position(&id) {
            Some(i) => state.mappings[i] = stored,
            None => state.mappings.push(stored),
        }
        Ok(id)
    }

    async fn replace_mapping(
        &self,
        id: &MappingId,
        mapping: &Mapping,
    ) -> Result<Mapping, StoreError> {
        let mut state = self.state.lock();
        state.writes += 1;
        state.check_writable(id)?;

        let index = state.position(id).ok_or_else(|| not_found(id))?;
        let mut stored = mapping.clone();
        stored.set_id(id);
        state.mappings[index] = stored.clone();
        Ok(stored)
    }

    async fn delete_mapping(&self, id: &MappingId) -> Result<MappingId, StoreError> {
        let mut state = self.state.lock();
        state.writes += 1;
        state.check_writable(id)?;

        let index = state.position(id).ok_or_else(|| not_found(id))?;
        state.mappings.remove(index);
        Ok(id.clone())
    }

    async fn delete_all_mappings(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.writes += 1;
        state.mappings.clear();
        Ok(())
    }

    async fn reset_all(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.writes += 1;
        state.mappings.clear();
        state.global_fixed_delay = None;
        state.global_delay_distribution = None;
        Ok(())
    }

    async fn reset_mappings(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.writes += 1;
        state.mappings.clear();
        Ok(())
    }

    async fn set_global_fixed_delay(&self, millis: u64) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.writes += 1;
        state.global_fixed_delay = Some(millis);
        Ok(())
    }

    async fn set_global_random_delay(&self, distribution: &Value) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.writes += 1;
        state.global_delay_distribution = Some(distribution.clone());
        Ok(())
    }
}
