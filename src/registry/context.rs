//! Contexts handed to variant serializers.

use crate::error::{ProjectError, Result};
use crate::state::{downcast_state, SourceState, SourceStates};
use crate::types::PathSupplier;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// What a serializer may ask about the session being saved.
pub struct SerializeContext<'a> {
    project_directory: &'a PathSupplier,
    states: &'a SourceStates,
    position: usize,
}

impl<'a> SerializeContext<'a> {
    pub fn new(project_directory: &'a PathSupplier, states: &'a SourceStates, position: usize) -> Self {
        Self {
            project_directory,
            states,
            position,
        }
    }

    /// Current project directory.
    pub fn project_directory(&self) -> PathBuf {
        (self.project_directory)()
    }

    /// Index the state being serialized will be written under.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Persisted index of a referenced state.
    ///
    /// The reference must point at a state stored before the one being
    /// serialized; anything else would be unresolvable on load.
    pub fn index_of<T: SourceState + ?Sized>(&self, dependency: &Arc<T>) -> Result<usize> {
        match self.states.index_of(dependency) {
            Some(index) if index < self.position => Ok(index),
            Some(index) => Err(ProjectError::DanglingReference(index)),
            None => Err(ProjectError::MissingDependency(dependency.name().to_string())),
        }
    }
}

/// States materialized so far during a load, by persisted index.
///
/// Only lives for the duration of one load.
#[derive(Debug, Default)]
pub struct ResolutionTable {
    states: Vec<Arc<dyn SourceState>>,
}

impl ResolutionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Record the state materialized for the next index.
    pub fn push(&mut self, state: Arc<dyn SourceState>) -> usize {
        self.states.push(state);
        self.states.len() - 1
    }

    /// The state materialized for `index`.
    pub fn resolve(&self, index: usize) -> Result<Arc<dyn SourceState>> {
        self.states
            .get(index)
            .cloned()
            .ok_or(ProjectError::DanglingReference(index))
    }
}

/// What a deserializer may ask while building one state.
pub struct DeserializeContext<'a> {
    project_directory: &'a PathSupplier,
    table: &'a ResolutionTable,
    path: String,
}

impl<'a> DeserializeContext<'a> {
    /// Context for an entry at `path` in the document (used in error messages).
    pub fn new(project_directory: &'a PathSupplier, table: &'a ResolutionTable, path: impl Into<String>) -> Self {
        Self {
            project_directory,
            table,
            path: path.into(),
        }
    }

    /// Current project directory, evaluated now.
    pub fn project_directory(&self) -> PathBuf {
        (self.project_directory)()
    }

    /// Location of the entry in the document.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// An already materialized state.
    pub fn resolve(&self, index: usize) -> Result<Arc<dyn SourceState>> {
        self.table.resolve(index)
    }

    /// An already materialized state of a specific variant.
    ///
    /// `field` names the payload field holding the reference.
    pub fn resolve_as<T: SourceState>(&self, index: usize, field: &str) -> Result<Arc<T>> {
        let state = self.resolve(index)?;
        downcast_state::<T>(&state).ok_or_else(|| {
            ProjectError::malformed(
                format!("{}/{}", self.path, field),
                format!(
                    "state {} is a {}, expected {}",
                    index,
                    state.type_name(),
                    std::any::type_name::<T>()
                ),
            )
        })
    }

    /// Decode the entry payload.
    pub fn parse<P: DeserializeOwned>(&self, payload: &Map<String, Value>) -> Result<P> {
        serde_json::from_value(Value::Object(payload.clone()))
            .map_err(|e| ProjectError::malformed(self.path.clone(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{RawSourceState, ThresholdingSourceState};
    use crate::types::fixed_path;
    use serde_json::json;

    #[test]
    fn test_serialize_index_of() {
        let supplier = fixed_path("/project");
        let mut states = SourceStates::new();
        let raw = Arc::new(RawSourceState::new("raw"));
        let other = Arc::new(RawSourceState::new("other"));
        states.add_state(raw.clone()).unwrap();
        states.add_state(other.clone()).unwrap();

        let ctx = SerializeContext::new(&supplier, &states, 1);
        assert_eq!(ctx.index_of(&raw).unwrap(), 0);
        assert!(matches!(ctx.index_of(&other), Err(ProjectError::DanglingReference(1))));

        let stray = Arc::new(RawSourceState::new("stray"));
        assert!(matches!(ctx.index_of(&stray), Err(ProjectError::MissingDependency(_))));
        assert_eq!(ctx.project_directory(), PathBuf::from("/project"));
    }

    #[test]
    fn test_resolution_table() {
        let mut table = ResolutionTable::new();
        assert!(matches!(table.resolve(0), Err(ProjectError::DanglingReference(0))));

        let raw: Arc<dyn SourceState> = Arc::new(RawSourceState::new("raw"));
        assert_eq!(table.push(raw.clone()), 0);
        assert!(crate::state::same_state(&table.resolve(0).unwrap(), &raw));
        assert!(matches!(table.resolve(1), Err(ProjectError::DanglingReference(1))));
    }

    #[test]
    fn test_resolve_as_wrong_variant() {
        let supplier = fixed_path("/project");
        let mut table = ResolutionTable::new();
        let raw = Arc::new(RawSourceState::new("raw"));
        table.push(Arc::new(ThresholdingSourceState::new("mask", raw)));

        let ctx = DeserializeContext::new(&supplier, &table, "paintera/sourceInfo/1");
        let result = ctx.resolve_as::<RawSourceState>(0, "ref");
        match result {
            Err(ProjectError::MalformedDocument { path, .. }) => {
                assert_eq!(path, "paintera/sourceInfo/1/ref")
            }
            other => panic!("expected malformed document, got {:?}", other),
        }
        assert!(ctx.resolve_as::<ThresholdingSourceState>(0, "ref").is_ok());
    }

    #[test]
    fn test_parse_reports_path() {
        #[derive(Debug, serde::Deserialize)]
        struct Payload {
            #[allow(dead_code)]
            min: f64,
        }

        let supplier = fixed_path("/project");
        let table = ResolutionTable::new();
        let ctx = DeserializeContext::new(&supplier, &table, "paintera/sourceInfo/0");

        let ok = json!({"min": 1.5});
        let ok = ok.as_object().unwrap();
        assert!(ctx.parse::<Payload>(ok).is_ok());

        let bad = json!({"min": "low"});
        let result = ctx.parse::<Payload>(bad.as_object().unwrap());
        assert!(matches!(
            result,
            Err(ProjectError::MalformedDocument { path, .. }) if path == "paintera/sourceInfo/0"
        ));
    }
}
