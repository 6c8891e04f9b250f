//! Registry of per-variant state serializers.
//!
//! Every concrete [`SourceState`] type that can be persisted has exactly one
//! [`VariantBinding`]: a tag string used in the document, a serialize
//! function and a deserialize function. Bindings come from an explicit
//! table ([`SerializerRegistry::with_defaults`]) plus whatever the
//! application registers on top; there is no runtime discovery.

mod bindings;
mod context;

pub use bindings::default_bindings;
pub use context::{DeserializeContext, ResolutionTable, SerializeContext};

use crate::error::{ProjectError, Result};
use crate::state::SourceState;
use serde_json::{Map, Value};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Turns a state into its payload object (without the `"type"` tag).
pub type SerializeFn = fn(&dyn SourceState, &SerializeContext<'_>) -> Result<Map<String, Value>>;

/// Builds a state from its payload object.
pub type DeserializeFn =
    fn(&Map<String, Value>, &DeserializeContext<'_>) -> Result<Arc<dyn SourceState>>;

/// Serializer pair for one concrete state type.
#[derive(Clone, Copy)]
pub struct VariantBinding {
    tag: &'static str,
    type_id: TypeId,
    type_name: &'static str,
    serialize: SerializeFn,
    deserialize: DeserializeFn,
}

impl VariantBinding {
    /// Bind `T` to `tag`.
    pub fn new<T: SourceState>(
        tag: &'static str,
        serialize: SerializeFn,
        deserialize: DeserializeFn,
    ) -> Self {
        Self {
            tag,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            serialize,
            deserialize,
        }
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn serialize(
        &self,
        state: &dyn SourceState,
        ctx: &SerializeContext<'_>,
    ) -> Result<Map<String, Value>> {
        (self.serialize)(state, ctx)
    }

    pub fn deserialize(
        &self,
        payload: &Map<String, Value>,
        ctx: &DeserializeContext<'_>,
    ) -> Result<Arc<dyn SourceState>> {
        (self.deserialize)(payload, ctx)
    }
}

impl fmt::Debug for VariantBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariantBinding")
            .field("tag", &self.tag)
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Lookup tables from state type and from tag to a binding.
#[derive(Clone, Debug, Default)]
pub struct SerializerRegistry {
    bindings: Vec<VariantBinding>,
    by_tag: HashMap<&'static str, usize>,
    by_type: HashMap<TypeId, usize>,
}

impl SerializerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the bindings of all built-in state variants.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for binding in default_bindings() {
            registry.insert(binding);
        }
        registry
    }

    /// Add a binding. Each tag and each type may only be bound once.
    pub fn register(&mut self, binding: VariantBinding) -> Result<()> {
        if self.by_tag.contains_key(binding.tag) || self.by_type.contains_key(&binding.type_id) {
            return Err(ProjectError::VariantExists(binding.tag.to_string()));
        }
        self.insert(binding);
        Ok(())
    }

    fn insert(&mut self, binding: VariantBinding) {
        let slot = self.bindings.len();
        self.by_tag.insert(binding.tag, slot);
        self.by_type.insert(binding.type_id, slot);
        self.bindings.push(binding);
    }

    /// Binding for the concrete type of `state`.
    pub fn lookup_by_type(&self, state: &dyn SourceState) -> Result<&VariantBinding> {
        self.by_type
            .get(&state.as_any().type_id())
            .map(|&slot| &self.bindings[slot])
            .ok_or_else(|| ProjectError::UnsupportedVariant(state.type_name().to_string()))
    }

    /// Binding registered under `tag`.
    pub fn lookup_by_tag(&self, tag: &str) -> Result<&VariantBinding> {
        self.by_tag
            .get(tag)
            .map(|&slot| &self.bindings[slot])
            .ok_or_else(|| ProjectError::UnknownVariant(tag.to_string()))
    }

    /// Registered tags, in registration order.
    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.bindings.iter().map(VariantBinding::tag)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
