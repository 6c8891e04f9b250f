//! Source states and the ordered store that owns them.
//!
//! A source state is a typed, named unit of viewer configuration. States are
//! shared as `Arc<dyn SourceState>`; a state that depends on another holds
//! an `Arc` to it, and the [`SourceStates`] arena guarantees that every
//! dependency sits at a lower position than its dependents.

mod sources;
mod variants;

pub use sources::SourceStates;
pub use variants::{
    IntersectingSourceState, LabelSourceState, RawSourceState, ThresholdingSourceState,
};

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A persisted unit of session configuration.
pub trait SourceState: Any + Send + Sync + fmt::Debug {
    /// Display name of the state.
    fn name(&self) -> &str;

    /// States this state references. They must precede it in the store.
    fn dependencies(&self) -> Vec<Arc<dyn SourceState>> {
        Vec::new()
    }

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// Rust type name of the concrete variant, for diagnostics.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Whether two handles point at the same state object.
pub fn same_state<A: ?Sized, B: ?Sized>(a: &Arc<A>, b: &Arc<B>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Downcast a shared state to its concrete variant.
pub fn downcast_state<T: SourceState>(state: &Arc<dyn SourceState>) -> Option<Arc<T>> {
    Arc::clone(state).into_any().downcast::<T>().ok()
}
