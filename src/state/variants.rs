//! Concrete source state variants.

use super::SourceState;
use crate::types::{AxisOrder, Composite};
use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;

/// Default foreground color of new sources.
pub(crate) const DEFAULT_COLOR: &str = "white";

/// Default background color of thresholded sources.
pub(crate) const DEFAULT_BACKGROUND_COLOR: &str = "black";

/// Intensity image shown through a linear contrast converter.
#[derive(Clone, Debug, PartialEq)]
pub struct RawSourceState {
    pub name: String,
    pub color: String,
    pub alpha: f64,
    /// Lower bound of the contrast range.
    pub min: f64,
    /// Upper bound of the contrast range.
    pub max: f64,
    pub composite: Composite,
    pub axis_order: AxisOrder,
    pub visible: bool,
}

impl RawSourceState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: DEFAULT_COLOR.to_string(),
            alpha: 1.0,
            min: 0.0,
            max: 255.0,
            composite: Composite::AlphaAdd,
            axis_order: AxisOrder::XYZ,
            visible: true,
        }
    }
}

impl SourceState for RawSourceState {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Binary mask derived from a raw source by an intensity window.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdingSourceState {
    pub name: String,
    /// The thresholded raw source.
    pub source: Arc<RawSourceState>,
    pub min: f64,
    pub max: f64,
    pub color: String,
    pub background_color: String,
    pub alpha: f64,
    /// Use `min`/`max` instead of following the raw source's contrast range.
    pub control_separately: bool,
}

impl ThresholdingSourceState {
    /// Threshold `source` over its current contrast range.
    pub fn new(name: impl Into<String>, source: Arc<RawSourceState>) -> Self {
        Self {
            name: name.into(),
            min: source.min,
            max: source.max,
            source,
            color: DEFAULT_COLOR.to_string(),
            background_color: DEFAULT_BACKGROUND_COLOR.to_string(),
            alpha: 1.0,
            control_separately: false,
        }
    }

    /// The window actually applied to the raw intensities.
    pub fn effective_range(&self) -> (f64, f64) {
        if self.control_separately {
            (self.min, self.max)
        } else {
            (self.source.min, self.source.max)
        }
    }

    /// Whether `value` falls inside the effective window.
    pub fn contains(&self, value: f64) -> bool {
        let (min, max) = self.effective_range();
        value >= min && value <= max
    }
}

impl SourceState for ThresholdingSourceState {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<Arc<dyn SourceState>> {
        vec![self.source.clone() as Arc<dyn SourceState>]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Segmentation volume with per-segment coloring.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelSourceState {
    pub name: String,
    /// Location of the label data. Absolute in memory; persisted relative to
    /// the project directory when it lies inside it.
    pub data: PathBuf,
    /// Seed of the golden-angle color stream.
    pub seed: u64,
    pub alpha: f64,
    pub selected_ids: Vec<u64>,
    pub locked_segments: Vec<u64>,
    pub composite: Composite,
}

impl LabelSourceState {
    pub fn new(name: impl Into<String>, data: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            seed: 1,
            alpha: 0.45,
            selected_ids: Vec::new(),
            locked_segments: Vec::new(),
            composite: Composite::AlphaYCbCr,
        }
    }

    pub fn is_locked(&self, id: u64) -> bool {
        self.locked_segments.contains(&id)
    }
}

impl SourceState for LabelSourceState {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Label segments that overlap a thresholded mask.
#[derive(Clone, Debug, PartialEq)]
pub struct IntersectingSourceState {
    pub name: String,
    pub threshold: Arc<ThresholdingSourceState>,
    pub label: Arc<LabelSourceState>,
    pub color: String,
}

impl IntersectingSourceState {
    pub fn new(
        name: impl Into<String>,
        threshold: Arc<ThresholdingSourceState>,
        label: Arc<LabelSourceState>,
    ) -> Self {
        Self {
            name: name.into(),
            threshold,
            label,
            color: DEFAULT_COLOR.to_string(),
        }
    }
}

impl SourceState for IntersectingSourceState {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<Arc<dyn SourceState>> {
        vec![
            self.threshold.clone() as Arc<dyn SourceState>,
            self.label.clone() as Arc<dyn SourceState>,
        ]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::same_state;

    #[test]
    fn test_threshold_follows_source_range() {
        let mut raw = RawSourceState::new("raw");
        raw.min = 10.0;
        raw.max = 200.0;
        let threshold = ThresholdingSourceState::new("mask", Arc::new(raw));

        assert_eq!((threshold.min, threshold.max), (10.0, 200.0));
        assert_eq!(threshold.effective_range(), (10.0, 200.0));
        assert!(threshold.contains(100.0));
        assert!(!threshold.contains(5.0));
    }

    #[test]
    fn test_threshold_controlled_separately() {
        let mut threshold = ThresholdingSourceState::new("mask", Arc::new(RawSourceState::new("raw")));
        threshold.min = 50.0;
        threshold.max = 60.0;

        assert_eq!(threshold.effective_range(), (0.0, 255.0));
        threshold.control_separately = true;
        assert_eq!(threshold.effective_range(), (50.0, 60.0));
        assert!(!threshold.contains(100.0));
    }

    #[test]
    fn test_dependencies() {
        let raw = Arc::new(RawSourceState::new("raw"));
        let threshold = Arc::new(ThresholdingSourceState::new("mask", raw.clone()));
        let label = Arc::new(LabelSourceState::new("labels", "/data/labels.n5"));
        let intersecting = IntersectingSourceState::new("overlap", threshold.clone(), label.clone());

        assert!(raw.dependencies().is_empty());
        assert_eq!(threshold.dependencies().len(), 1);
        assert!(same_state(&threshold.dependencies()[0], &raw));

        let deps = intersecting.dependencies();
        assert_eq!(deps.len(), 2);
        assert!(same_state(&deps[0], &threshold));
        assert!(same_state(&deps[1], &label));
    }

    #[test]
    fn test_label_locks() {
        let mut label = LabelSourceState::new("labels", "/data/labels.n5");
        label.locked_segments = vec![3, 7];
        assert!(label.is_locked(7));
        assert!(!label.is_locked(4));
    }
}
