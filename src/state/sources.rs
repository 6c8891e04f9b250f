//! Ordered arena of source states.

use super::{same_state, SourceState};
use crate::error::{ProjectError, Result};
use std::sync::Arc;

/// Ordered collection of source states plus the current selection.
///
/// Position in the collection is the state's persisted index. A state can
/// only be added once all of its dependencies are present, so every
/// reference points at a strictly lower index.
#[derive(Clone, Debug, Default)]
pub struct SourceStates {
    states: Vec<Arc<dyn SourceState>>,
    current: Option<usize>,
}

impl SourceStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<dyn SourceState>> {
        self.states.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SourceState>> + '_ {
        self.states.iter()
    }

    /// Position of `state` in the store, by object identity.
    pub fn index_of<T: ?Sized>(&self, state: &Arc<T>) -> Option<usize> {
        self.states.iter().position(|s| same_state(s, state))
    }

    pub fn contains<T: ?Sized>(&self, state: &Arc<T>) -> bool {
        self.index_of(state).is_some()
    }

    /// Append a state, returning its index.
    ///
    /// Fails if any dependency of `state` is not already in the store, or if
    /// the very same object was added before.
    pub fn add_state(&mut self, state: Arc<dyn SourceState>) -> Result<usize> {
        if self.contains(&state) {
            return Err(ProjectError::DuplicateState(state.name().to_string()));
        }

        if let Some(missing) = state
            .dependencies()
            .into_iter()
            .find(|dependency| !self.contains(dependency))
        {
            return Err(ProjectError::MissingDependency(missing.name().to_string()));
        }

        self.states.push(state);
        Ok(self.states.len() - 1)
    }

    /// Remove the state at `index`.
    ///
    /// Fails with [`ProjectError::StateInUse`] while another state still
    /// references it. The current selection keeps pointing at the same
    /// state, or is cleared if the removed state was selected.
    pub fn remove_state(&mut self, index: usize) -> Result<Arc<dyn SourceState>> {
        let target = self
            .states
            .get(index)
            .cloned()
            .ok_or(ProjectError::IndexOutOfRange {
                index,
                len: self.states.len(),
            })?;

        for (dependent, state) in self.states.iter().enumerate() {
            if state
                .dependencies()
                .iter()
                .any(|dependency| same_state(dependency, &target))
            {
                return Err(ProjectError::StateInUse { index, dependent });
            }
        }

        self.states.remove(index);
        self.current = match self.current {
            Some(current) if current == index => None,
            Some(current) if current > index => Some(current - 1),
            other => other,
        };

        Ok(target)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_state(&self) -> Option<&Arc<dyn SourceState>> {
        self.current.and_then(|index| self.states.get(index))
    }

    /// Select the state at `index`, or clear the selection with `None`.
    pub fn set_current_index(&mut self, index: Option<usize>) -> Result<()> {
        if let Some(index) = index {
            if index >= self.states.len() {
                return Err(ProjectError::IndexOutOfRange {
                    index,
                    len: self.states.len(),
                });
            }
        }
        self.current = index;
        Ok(())
    }
}
