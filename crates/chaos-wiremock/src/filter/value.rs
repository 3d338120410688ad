//! Tagged filter values.
//!
//! Filter descriptions arrive as arbitrary JSON. They are compiled once into a
//! closed [`FilterValue`] tree so matching dispatches on the variant instead of
//! inspecting JSON types on every comparison.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A compiled filter value
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Strings, numbers, booleans and null
    Scalar(Value),
    /// In recursive mode: the set of allowed values
    Sequence(Vec<Value>),
    /// Nested filter object
    Mapping(Filter),
}

impl FilterValue {
    pub fn compile(value: &Value) -> Self {
        match value {
            Value::Array(items) => FilterValue::Sequence(items.clone()),
            Value::Object(fields) => FilterValue::Mapping(Filter::compile(fields)),
            scalar => FilterValue::Scalar(scalar.clone()),
        }
    }

    /// Deep structural equality against a node value.
    pub fn equals(&self, node: &Value) -> bool {
        match (self, node) {
            (FilterValue::Scalar(expected), actual) => expected == actual,
            (FilterValue::Sequence(expected), Value::Array(actual)) => expected == actual,
            (FilterValue::Mapping(expected), Value::Object(actual)) => {
                expected.fields.len() == actual.len() && expected.matches_strict(actual)
            }
            _ => false,
        }
    }

    /// Recursive semantics: objects recurse, sequences are allowed-sets,
    /// scalars compare by equality.
    pub fn admits(&self, node: &Value) -> bool {
        match self {
            FilterValue::Scalar(expected) => expected == node,
            FilterValue::Sequence(allowed) => allowed.contains(node),
            FilterValue::Mapping(nested) => node
                .as_object()
                .is_some_and(|object| nested.matches_recursive(object)),
        }
    }
}

/// A compiled filter object: every key must be present in the node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    fields: BTreeMap<String, FilterValue>,
}

impl Filter {
    pub fn compile(fields: &Map<String, Value>) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|(key, value)| (key.clone(), FilterValue::compile(value)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Every filter key exists in `node` with a deep-equal value.
    pub fn matches_strict(&self, node: &Map<String, Value>) -> bool {
        self.fields
            .iter()
            .all(|(key, expected)| node.get(key).is_some_and(|actual| expected.equals(actual)))
    }

    /// Every filter key exists in `node` and its value is admitted.
    pub fn matches_recursive(&self, node: &Map<String, Value>) -> bool {
        self.fields
            .iter()
            .all(|(key, expected)| node.get(key).is_some_and(|actual| expected.admits(actual)))
    }
}
