//! Project save/load orchestration.
//!
//! A project document lives under one reserved attribute key. It holds the
//! [`ProjectProperties`] fields at its top level and the source states
//! under [`SOURCE_INFO_KEY`]:
//!
//! ```text
//! "paintera": {
//!     "screenScales": [...],
//!     "navigationConfig": {...},
//!     ...
//!     "sourceInfo": { "0": {...}, "1": {...}, "currentSourceIndex": 1 }
//! }
//! ```
//!
//! Loading is all-or-nothing: states are materialized into a staging store
//! and only handed to the caller once the whole document parsed.

use crate::attributes::{AttributeStore, FsAttributeStore};
use crate::error::{ProjectError, Result};
use crate::properties::{self, ProjectProperties};
use crate::registry::SerializerRegistry;
use crate::source_info::{self, SOURCE_INFO_KEY};
use crate::state::{SourceState, SourceStates};
use crate::types::{fixed_path, LoadSummary, PathSupplier};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Reserved attribute key holding the project document.
pub const PAINTERA_KEY: &str = "paintera";

/// Project location and document placement.
#[derive(Clone, Debug)]
pub struct ProjectConfig {
    /// Project directory.
    pub directory: PathBuf,

    /// Attribute group holding the document.
    pub attribute_group: String,

    /// Attribute key holding the document.
    pub attribute_key: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./project"),
            attribute_group: "/".to_string(),
            attribute_key: PAINTERA_KEY.to_string(),
        }
    }
}

/// Settings and states of a session, detached from any listeners.
#[derive(Clone, Debug, Default)]
pub struct ProjectSnapshot {
    pub properties: ProjectProperties,
    pub states: SourceStates,
}

/// Called with `(previous, current)` whenever session properties are replaced.
pub type PropertiesListener = Box<dyn Fn(Option<&ProjectProperties>, &ProjectProperties) + Send + Sync>;

/// Live application state: the session a user is working on.
#[derive(Default)]
pub struct Session {
    properties: ProjectProperties,
    states: SourceStates,
    listeners: Vec<PropertiesListener>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn properties(&self) -> &ProjectProperties {
        &self.properties
    }

    /// Replace the properties, then notify listeners.
    pub fn set_properties(&mut self, properties: ProjectProperties) {
        let previous = std::mem::replace(&mut self.properties, properties);
        for listener in &self.listeners {
            listener(Some(&previous), &self.properties);
        }
    }

    /// Register a listener. It is called once immediately with the current
    /// properties and `None` as previous value.
    pub fn on_properties_changed(&mut self, listener: PropertiesListener) {
        listener(None, &self.properties);
        self.listeners.push(listener);
    }

    pub fn states(&self) -> &SourceStates {
        &self.states
    }

    pub fn states_mut(&mut self) -> &mut SourceStates {
        &mut self.states
    }

    /// Append a state; see [`SourceStates::add_state`].
    pub fn add_state(&mut self, state: Arc<dyn SourceState>) -> Result<usize> {
        self.states.add_state(state)
    }

    /// Copy of properties and states, e.g. to save from another thread.
    pub fn snapshot(&self) -> ProjectSnapshot {
        ProjectSnapshot {
            properties: self.properties.clone(),
            states: self.states.clone(),
        }
    }

    /// Replace the whole session content with `snapshot`.
    pub fn apply(&mut self, snapshot: ProjectSnapshot) {
        self.states = snapshot.states;
        self.set_properties(snapshot.properties);
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("properties", &self.properties)
            .field("states", &self.states)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Saves and loads sessions through an attribute store.
///
/// Not reentrant: callers must not run two operations on the same project
/// concurrently. [`crate::ProjectWorker`] provides a single-slot queue.
pub struct Project {
    store: Box<dyn AttributeStore>,
    registry: SerializerRegistry,
    project_directory: PathSupplier,
    config: ProjectConfig,
}

impl Project {
    /// Project stored in `config.directory` with the built-in variants.
    pub fn open(config: ProjectConfig) -> Self {
        let store = FsAttributeStore::new(&config.directory);
        let project_directory = fixed_path(config.directory.clone());
        Self::new(
            Box::new(store),
            SerializerRegistry::with_defaults(),
            project_directory,
            config,
        )
    }

    /// Project over any attribute store and registry.
    ///
    /// `project_directory` is evaluated on every save and load; `config.directory`
    /// is not consulted.
    pub fn new(
        store: Box<dyn AttributeStore>,
        registry: SerializerRegistry,
        project_directory: PathSupplier,
        config: ProjectConfig,
    ) -> Self {
        Self {
            store,
            registry,
            project_directory,
            config,
        }
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn registry(&self) -> &SerializerRegistry {
        &self.registry
    }

    /// Current project directory.
    pub fn directory(&self) -> PathBuf {
        (self.project_directory)()
    }

    /// Write properties and states as one document, atomically.
    pub fn save(&self, properties: &ProjectProperties, states: &SourceStates) -> Result<()> {
        let mut document = properties::serialize(properties)?;
        let sources = source_info::serialize(states, &self.registry, &self.project_directory)?;
        document.insert(SOURCE_INFO_KEY.to_string(), Value::Object(sources));

        self.store.set_attribute(
            &self.config.attribute_group,
            &self.config.attribute_key,
            Value::Object(document),
        )?;

        tracing::info!(
            states = states.len(),
            directory = %self.directory().display(),
            "Saved project"
        );
        Ok(())
    }

    /// Save the content of a live session.
    pub fn save_session(&self, session: &Session) -> Result<()> {
        self.save(session.properties(), session.states())
    }

    /// Read the document into a fresh snapshot.
    ///
    /// An absent (or `null`) document is not an error: it yields default
    /// properties and no states.
    pub fn load(&self) -> Result<ProjectSnapshot> {
        self.load_with_summary().map(|(snapshot, _)| snapshot)
    }

    /// Load into a live session.
    ///
    /// On failure `session` is left exactly as it was. On success its
    /// properties are replaced (notifying listeners) along with all states
    /// and the selection.
    pub fn load_into(&self, session: &mut Session) -> Result<LoadSummary> {
        let (snapshot, summary) = self.load_with_summary()?;
        session.apply(snapshot);
        Ok(summary)
    }

    fn load_with_summary(&self) -> Result<(ProjectSnapshot, LoadSummary)> {
        let key = &self.config.attribute_key;
        let document = match self.store.get_attribute(&self.config.attribute_group, key)? {
            None | Some(Value::Null) => {
                tracing::info!(key = %key, "No project document, using defaults");
                return Ok((ProjectSnapshot::default(), LoadSummary::default()));
            }
            Some(Value::Object(document)) => document,
            Some(other) => {
                return Err(ProjectError::malformed(
                    key.clone(),
                    format!("expected an object, got {}", other),
                ))
            }
        };

        let properties = properties::deserialize(Some(&document), key)?;

        let mut staged = SourceStates::new();
        let sources_path = format!("{}/{}", key, SOURCE_INFO_KEY);
        match document.get(SOURCE_INFO_KEY) {
            None | Some(Value::Null) => {}
            Some(Value::Object(sources)) => {
                let mut current = None;
                source_info::populate(
                    sources,
                    &self.registry,
                    &self.project_directory,
                    &sources_path,
                    |state| staged.add_state(state).map(|_| ()),
                    |index| {
                        current = Some(index);
                        Ok(())
                    },
                )?;
                staged.set_current_index(current)?;
            }
            Some(other) => {
                return Err(ProjectError::malformed(
                    sources_path,
                    format!("expected an object, got {}", other),
                ))
            }
        }

        let summary = LoadSummary {
            document_present: true,
            states_loaded: staged.len(),
            current_index: staged.current_index(),
        };
        tracing::info!(
            states = summary.states_loaded,
            current = ?summary.current_index,
            directory = %self.directory().display(),
            "Loaded project"
        );

        Ok((
            ProjectSnapshot {
                properties,
                states: staged,
            },
            summary,
        ))
    }
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
