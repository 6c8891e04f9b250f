//! Hierarchical attribute stores.
//!
//! An attribute store maps a group path (e.g. `"/"` or `"/volumes/raw"`)
//! to a flat set of JSON attributes. Each `set_attribute` call is atomic
//! from any reader's perspective and leaves the other attributes of the
//! group untouched.

mod filesystem;
mod memory;

pub use filesystem::FsAttributeStore;
pub use memory::MemoryAttributeStore;

use crate::error::Result;
use serde_json::Value;

/// Path-addressed JSON attribute storage.
pub trait AttributeStore: Send + Sync {
    /// Read one attribute. Returns `None` if the group or key is absent.
    fn get_attribute(&self, group: &str, key: &str) -> Result<Option<Value>>;

    /// Write one attribute, replacing any previous value.
    fn set_attribute(&self, group: &str, key: &str, value: Value) -> Result<()>;
}

/// Normalize a group path: strip surrounding slashes, `""` is the root.
pub(crate) fn normalize_group(group: &str) -> &str {
    group.trim_matches('/')
}
