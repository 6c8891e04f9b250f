//! # Project Store
//!
//! Persists viewer sessions to a hierarchical attribute store and
//! reconstructs them on demand.
//!
//! ## Core Concepts
//!
//! - **Source states**: typed, named units of configuration, some of which
//!   reference other states
//! - **Source store**: the ordered arena owning all states; position is the
//!   persisted index
//! - **Registry**: explicit table of per-variant serializers
//! - **Properties**: session-wide settings, parsed tolerantly
//! - **Project**: atomic save, all-or-nothing load
//!
//! ## Example
//!
//! ```ignore
//! use project_store::{Project, ProjectConfig, RawSourceState, Session, ThresholdingSourceState};
//! use std::sync::Arc;
//!
//! let project = Project::open(ProjectConfig {
//!     directory: "./my-project".into(),
//!     ..Default::default()
//! });
//!
//! let mut session = Session::new();
//! let raw = Arc::new(RawSourceState::new("em"));
//! session.add_state(raw.clone())?;
//! session.add_state(Arc::new(ThresholdingSourceState::new("mask", raw)))?;
//! project.save_session(&session)?;
//!
//! // Later, or in another process
//! let mut restored = Session::new();
//! project.load_into(&mut restored)?;
//! ```

pub mod attributes;
pub mod error;
pub mod project;
pub mod properties;
pub mod registry;
pub mod source_info;
pub mod state;
pub mod types;
pub mod worker;

// Re-exports
pub use attributes::{AttributeStore, FsAttributeStore, MemoryAttributeStore};
pub use error::{ProjectError, Result};
pub use project::{
    Project, ProjectConfig, ProjectSnapshot, PropertiesListener, Session, PAINTERA_KEY,
};
pub use properties::{
    CrosshairConfig, GridConstraints, LogLevel, LoggingConfig, NavigationConfig,
    ProjectProperties, ScaleBarOverlayConfig,
};
pub use registry::{
    DeserializeContext, DeserializeFn, ResolutionTable, SerializeContext, SerializeFn,
    SerializerRegistry, VariantBinding,
};
pub use source_info::{CURRENT_SOURCE_INDEX_KEY, SOURCE_INFO_KEY, TYPE_KEY};
pub use state::{
    downcast_state, same_state, IntersectingSourceState, LabelSourceState, RawSourceState,
    SourceState, SourceStates, ThresholdingSourceState,
};
pub use types::*;
pub use worker::ProjectWorker;
