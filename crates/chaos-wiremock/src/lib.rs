//! Chaos engineering actions for WireMock.
//!
//! This crate drives the stub mappings of a running WireMock server through
//! its `/__admin` API: it filters mappings, injects delays and faults, changes
//! response status codes and bodies, and resets the server. Every operation is
//! a fresh read-modify-write against the live server; nothing is cached.
//!
//! # Layers
//!
//! - [`store`]: the [`MappingStore`] trait, the HTTP [`AdminClient`] and an
//!   [`InMemoryStore`] used for tests and local experiments
//! - [`filter`]: strict, recursive and exact mapping predicates
//! - [`engine`]: [`MappingEngine`], the read-filter-mutate-write operations
//! - [`actions`]: configuration-driven entry points that log failures and
//!   return empty results instead of erroring
//!
//! # Example
//!
//! ```no_run
//! use chaos_wiremock::{AdminClient, MappingEngine, MatchMode};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), chaos_wiremock::ChaosError> {
//! let client = AdminClient::from_url("http://localhost:8080", Duration::from_secs(1))?;
//! let engine = MappingEngine::new(client);
//!
//! // Slow down every GET /users mapping by 300ms
//! let filters = vec![json!({"method": "GET", "url": "/users"})];
//! let ids = engine.fixed_delay(&filters, 300, MatchMode::Strict).await?;
//! println!("delayed {} mappings", ids.len());
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod import;
pub mod mapping;
pub mod store;

pub use config::{Configuration, Endpoint, WiremockConfig};
pub use engine::{ChunkedDribble, FaultKind, MappingEngine, ResponseBody, StatusCode};
pub use error::ChaosError;
pub use filter::{Filter, FilterDescription, FilterTarget, FilterValue, MatchMode};
pub use mapping::{Mapping, MappingId};
pub use store::{can_connect, AdminClient, InMemoryStore, MappingStore, StoreError};
