//! Per-runner scratch data shared with transaction subscribers.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{QueryError, QueryResult};

/// Key/value bag scoped to one query runner.
///
/// Subscribers receive it by `&mut` at every transaction boundary, so values
/// written in a `before_*` hook are visible in the matching `after_*` hook.
/// The runner clears it on release.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunnerData {
    values: HashMap<String, Value>,
}

impl RunnerData {
    /// Create an empty data bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw JSON value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    /// Serialize and insert a value.
    pub fn insert_as<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> QueryResult<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| QueryError::serialization(e.to_string()).with_source(e))?;
        self.values.insert(key.into(), value);
        Ok(())
    }

    /// Get a raw value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Get a value deserialized into `T`.
    ///
    /// Returns `Ok(None)` when the key is absent.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> QueryResult<Option<T>> {
        match self.values.get(key) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| QueryError::serialization(e.to_string()).with_source(e)),
            None => Ok(None),
        }
    }

    /// Remove a value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Check if a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Iterate over entries.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}
