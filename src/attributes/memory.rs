//! In-memory attribute store.

use super::{normalize_group, AttributeStore};
use crate::error::Result;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Attribute store kept entirely in memory.
///
/// Useful for tests and for sessions that are never written to disk.
#[derive(Debug, Default)]
pub struct MemoryAttributeStore {
    groups: RwLock<HashMap<String, Map<String, Value>>>,
}

impl MemoryAttributeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of groups holding at least one attribute.
    pub fn group_count(&self) -> usize {
        self.groups.read().len()
    }
}

impl AttributeStore for MemoryAttributeStore {
    fn get_attribute(&self, group: &str, key: &str) -> Result<Option<Value>> {
        let groups = self.groups.read();
        Ok(groups
            .get(normalize_group(group))
            .and_then(|attributes| attributes.get(key))
            .cloned())
    }

    fn set_attribute(&self, group: &str, key: &str, value: Value) -> Result<()> {
        self.groups
            .write()
            .entry(normalize_group(group).to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }
}
