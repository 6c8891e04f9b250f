//! Codec for the ordered source state subtree.
//!
//! Layout:
//!
//! ```text
//! "sourceInfo": {
//!     "0": { "type": "raw", ... },
//!     "1": { "type": "threshold", "ref": 0, ... },
//!     "currentSourceIndex": 1
//! }
//! ```
//!
//! Entries are keyed by their position in the store. On load they are
//! materialized in ascending numeric key order, regardless of the order the
//! keys appear in the document, so that each entry can resolve references
//! to the entries before it.

use crate::error::{ProjectError, Result};
use crate::registry::{DeserializeContext, ResolutionTable, SerializeContext, SerializerRegistry};
use crate::state::{SourceState, SourceStates};
use crate::types::PathSupplier;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Key of the source subtree inside the project document.
pub const SOURCE_INFO_KEY: &str = "sourceInfo";

/// Key of the selected index inside the source subtree.
pub const CURRENT_SOURCE_INDEX_KEY: &str = "currentSourceIndex";

/// Key of the variant tag inside each entry.
pub const TYPE_KEY: &str = "type";

/// Explicit "nothing selected".
const NO_SELECTION: i64 = -1;

/// Encode all states in store order plus the current selection.
pub fn serialize(
    states: &SourceStates,
    registry: &SerializerRegistry,
    project_directory: &PathSupplier,
) -> Result<Map<String, Value>> {
    let mut object = Map::new();

    for (position, state) in states.iter().enumerate() {
        let binding = registry.lookup_by_type(state.as_ref())?;
        let ctx = SerializeContext::new(project_directory, states, position);
        let mut entry = binding.serialize(state.as_ref(), &ctx)?;
        entry.insert(TYPE_KEY.to_string(), Value::String(binding.tag().to_string()));
        object.insert(position.to_string(), Value::Object(entry));
    }

    if let Some(current) = states.current_index() {
        object.insert(CURRENT_SOURCE_INDEX_KEY.to_string(), Value::from(current));
    }

    tracing::debug!(count = states.len(), current = ?states.current_index(), "Serialized source states");
    Ok(object)
}

/// Decode states from `object`, publishing each through `add` in index order.
///
/// `path` locates `object` in the document for error messages. After every
/// entry succeeded, a valid selection is published through `set_current`.
/// The first failure aborts; whatever `add` received by then must be
/// discarded by the caller. Returns the number of states added.
pub fn populate<A, C>(
    object: &Map<String, Value>,
    registry: &SerializerRegistry,
    project_directory: &PathSupplier,
    path: &str,
    mut add: A,
    mut set_current: C,
) -> Result<usize>
where
    A: FnMut(Arc<dyn SourceState>) -> Result<()>,
    C: FnMut(usize) -> Result<()>,
{
    let keys = sorted_index_keys(object, path)?;
    let mut table = ResolutionTable::new();

    for (index, key) in keys {
        let entry_path = format!("{}/{}", path, key);
        let entry = object[key]
            .as_object()
            .ok_or_else(|| ProjectError::malformed(entry_path.clone(), "expected an object"))?;
        let tag = entry
            .get(TYPE_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ProjectError::malformed(format!("{}/{}", entry_path, TYPE_KEY), "expected a string tag")
            })?;

        let binding = registry.lookup_by_tag(tag)?;
        let state = {
            let ctx = DeserializeContext::new(project_directory, &table, entry_path);
            binding.deserialize(entry, &ctx)?
        };

        table.push(Arc::clone(&state));
        add(state)?;
        tracing::trace!(index, tag, "Materialized source state");
    }

    match object.get(CURRENT_SOURCE_INDEX_KEY) {
        None | Some(Value::Null) => {}
        Some(value) if value.as_i64() == Some(NO_SELECTION) => {}
        Some(value) if value.is_i64() || value.is_u64() => {
            match value
                .as_u64()
                .and_then(|index| usize::try_from(index).ok())
                .filter(|&index| index < table.len())
            {
                Some(index) => set_current(index)?,
                None => tracing::warn!(
                    index = %value,
                    len = table.len(),
                    "Current source index out of range, leaving selection unset"
                ),
            }
        }
        Some(value) => {
            return Err(ProjectError::malformed(
                format!("{}/{}", path, CURRENT_SOURCE_INDEX_KEY),
                format!("expected an integer, got {}", value),
            ));
        }
    }

    Ok(table.len())
}

/// Index keys of `object` in ascending numeric order.
///
/// Indices must be canonical decimal numbers forming the range `0..n`.
fn sorted_index_keys<'a>(object: &'a Map<String, Value>, path: &str) -> Result<Vec<(usize, &'a str)>> {
    let mut keys = Vec::new();

    for key in object.keys() {
        if key == CURRENT_SOURCE_INDEX_KEY {
            continue;
        }
        if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
            tracing::warn!(key = %key, path, "Ignoring unexpected key in source info");
            continue;
        }

        let index: usize = key
            .parse()
            .map_err(|_| ProjectError::malformed(format!("{}/{}", path, key), "index out of range"))?;
        if index.to_string() != *key {
            return Err(ProjectError::malformed(
                format!("{}/{}", path, key),
                "index must not have leading zeros",
            ));
        }
        keys.push((index, key.as_str()));
    }

    keys.sort_unstable_by_key(|&(index, _)| index);

    for (expected, &(index, _)) in keys.iter().enumerate() {
        if index != expected {
            return Err(ProjectError::malformed(
                path,
                format!("missing entry for index {}", expected),
            ));
        }
    }

    Ok(keys)
}
