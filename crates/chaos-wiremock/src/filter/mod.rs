//! Mapping filters.
//!
//! A filter description selects mappings by their `request` block (the
//! default) or their `metadata` block:
//!
//! ```json
//! {"request": {"method": "GET", "url": "/users"}}
//! {"metadata": {"team": "payments"}}
//! {"method": "GET", "url": "/users"}
//! ```
//!
//! Two matching modes are available, see [`MatchMode`]. A third predicate,
//! [`request_matches_exactly`], compares a whole `request` block and is used by
//! the single-target delay operations.

mod value;

pub use value::{Filter, FilterValue};

use crate::error::ChaosError;
use crate::mapping::Mapping;
use serde_json::{Map, Value};

/// How filter values are compared with mapping values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Filter keys must exist with deep-equal values
    #[default]
    Strict,
    /// Nested objects recurse and arrays list the allowed values
    Recursive,
}

impl MatchMode {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            MatchMode::Strict
        } else {
            MatchMode::Recursive
        }
    }
}

/// The mapping block a filter is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterTarget {
    Request,
    Metadata,
}

impl FilterTarget {
    pub fn key(&self) -> &'static str {
        match self {
            FilterTarget::Request => "request",
            FilterTarget::Metadata => "metadata",
        }
    }

    pub fn select<'a>(&self, mapping: &'a Mapping) -> Option<&'a Map<String, Value>> {
        match self {
            FilterTarget::Request => mapping.request(),
            FilterTarget::Metadata => mapping.metadata(),
        }
    }
}

/// A validated filter description
#[derive(Debug, Clone, PartialEq)]
pub struct FilterDescription {
    target: FilterTarget,
    filter: Filter,
}

impl FilterDescription {
    /// Parse a caller-supplied description.
    ///
    /// Fails with [`ChaosError::InvalidFilter`] when both `request` and
    /// `metadata` are present, when the description is not an object, or when
    /// the selected block is not an object.
    pub fn parse(description: &Value) -> Result<Self, ChaosError> {
        let fields = description.as_object().ok_or_else(|| {
            ChaosError::InvalidFilter(format!("filter must be an object, got {description}"))
        })?;

        let has_request = fields.contains_key("request");
        let has_metadata = fields.contains_key("metadata");
        if has_request && has_metadata {
            return Err(ChaosError::InvalidFilter(
                "both 'request' and 'metadata' filters defined, only one allowed at a time"
                    .to_string(),
            ));
        }

        let (target, body) = if has_request {
            (FilterTarget::Request, &fields["request"])
        } else if has_metadata {
            (FilterTarget::Metadata, &fields["metadata"])
        } else {
            return Ok(Self {
                target: FilterTarget::Request,
                filter: Filter::compile(fields),
            });
        };

        let body = body.as_object().ok_or_else(|| {
            ChaosError::InvalidFilter(format!("'{}' filter must be an object", target.key()))
        })?;
        Ok(Self {
            target,
            filter: Filter::compile(body),
        })
    }

    pub fn target(&self) -> FilterTarget {
        self.target
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Evaluate against a mapping; a mapping without the target block never matches.
    pub fn matches(&self, mapping: &Mapping, mode: MatchMode) -> bool {
        let Some(node) = self.target.select(mapping) else {
            return false;
        };
        match mode {
            MatchMode::Strict => self.filter.matches_strict(node),
            MatchMode::Recursive => self.filter.matches_recursive(node),
        }
    }
}

/// Parse every description up front so a bad one aborts before any request.
pub fn parse_all(descriptions: &[Value]) -> Result<Vec<FilterDescription>, ChaosError> {
    descriptions.iter().map(FilterDescription::parse).collect()
}

/// Whole-block equality between a mapping's `request` and `request`.
pub fn request_matches_exactly(mapping: &Mapping, request: &Value) -> bool {
    mapping.get("request") == Some(request)
}
