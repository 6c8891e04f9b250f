//! Serializers for the built-in state variants.
//!
//! Payload fields are camelCase. Plain settings are optional on load and
//! fall back to the variant's defaults; references (`ref`, `threshold`,
//! `label`) are required.

use super::{DeserializeContext, SerializeContext, VariantBinding};
use crate::error::{ProjectError, Result};
use crate::state::{
    IntersectingSourceState, LabelSourceState, RawSourceState, SourceState,
    ThresholdingSourceState,
};
use crate::types::{AxisOrder, Composite};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// Bindings for all built-in variants, in registration order.
pub fn default_bindings() -> Vec<VariantBinding> {
    vec![
        VariantBinding::new::<RawSourceState>("raw", serialize_raw, deserialize_raw),
        VariantBinding::new::<ThresholdingSourceState>(
            "threshold",
            serialize_threshold,
            deserialize_threshold,
        ),
        VariantBinding::new::<LabelSourceState>("label", serialize_label, deserialize_label),
        VariantBinding::new::<IntersectingSourceState>(
            "intersecting",
            serialize_intersecting,
            deserialize_intersecting,
        ),
    ]
}

fn expect_variant<T: SourceState>(state: &dyn SourceState) -> Result<&T> {
    state
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| ProjectError::UnsupportedVariant(state.type_name().to_string()))
}

fn to_object(payload: &impl Serialize) -> Result<Map<String, Value>> {
    match serde_json::to_value(payload)? {
        Value::Object(map) => Ok(map),
        other => Err(ProjectError::Serialization(format!(
            "state payload must be an object, got {}",
            other
        ))),
    }
}

// --- raw ---

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPayload {
    name: Option<String>,
    color: Option<String>,
    alpha: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
    composite: Option<Composite>,
    axis_order: Option<AxisOrder>,
    is_visible: Option<bool>,
}

fn serialize_raw(state: &dyn SourceState, _ctx: &SerializeContext<'_>) -> Result<Map<String, Value>> {
    let raw = expect_variant::<RawSourceState>(state)?;
    to_object(&RawPayload {
        name: Some(raw.name.clone()),
        color: Some(raw.color.clone()),
        alpha: Some(raw.alpha),
        min: Some(raw.min),
        max: Some(raw.max),
        composite: Some(raw.composite),
        axis_order: Some(raw.axis_order),
        is_visible: Some(raw.visible),
    })
}

fn deserialize_raw(
    payload: &Map<String, Value>,
    ctx: &DeserializeContext<'_>,
) -> Result<Arc<dyn SourceState>> {
    let p: RawPayload = ctx.parse(payload)?;
    let defaults = RawSourceState::new("raw");
    Ok(Arc::new(RawSourceState {
        name: p.name.unwrap_or(defaults.name),
        color: p.color.unwrap_or(defaults.color),
        alpha: p.alpha.unwrap_or(defaults.alpha),
        min: p.min.unwrap_or(defaults.min),
        max: p.max.unwrap_or(defaults.max),
        composite: p.composite.unwrap_or(defaults.composite),
        axis_order: p.axis_order.unwrap_or(defaults.axis_order),
        visible: p.is_visible.unwrap_or(defaults.visible),
    }))
}

// --- threshold ---

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThresholdPayload {
    #[serde(rename = "ref")]
    source: usize,
    name: Option<String>,
    min: Option<f64>,
    max: Option<f64>,
    color: Option<String>,
    background_color: Option<String>,
    alpha: Option<f64>,
    control_separately: Option<bool>,
}

fn serialize_threshold(
    state: &dyn SourceState,
    ctx: &SerializeContext<'_>,
) -> Result<Map<String, Value>> {
    let threshold = expect_variant::<ThresholdingSourceState>(state)?;
    to_object(&ThresholdPayload {
        source: ctx.index_of(&threshold.source)?,
        name: Some(threshold.name.clone()),
        min: Some(threshold.min),
        max: Some(threshold.max),
        color: Some(threshold.color.clone()),
        background_color: Some(threshold.background_color.clone()),
        alpha: Some(threshold.alpha),
        control_separately: Some(threshold.control_separately),
    })
}

fn deserialize_threshold(
    payload: &Map<String, Value>,
    ctx: &DeserializeContext<'_>,
) -> Result<Arc<dyn SourceState>> {
    let p: ThresholdPayload = ctx.parse(payload)?;
    let source = ctx.resolve_as::<RawSourceState>(p.source, "ref")?;

    // Missing window falls back to the source's contrast range.
    let mut threshold = ThresholdingSourceState::new(p.name.unwrap_or_else(|| "threshold".into()), source);
    if let Some(min) = p.min {
        threshold.min = min;
    }
    if let Some(max) = p.max {
        threshold.max = max;
    }
    if let Some(color) = p.color {
        threshold.color = color;
    }
    if let Some(background_color) = p.background_color {
        threshold.background_color = background_color;
    }
    if let Some(alpha) = p.alpha {
        threshold.alpha = alpha;
    }
    if let Some(control_separately) = p.control_separately {
        threshold.control_separately = control_separately;
    }
    Ok(Arc::new(threshold))
}

// --- label ---

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LabelPayload {
    data: PathBuf,
    /// `data` was written relative to the project directory.
    project_relative: Option<bool>,
    name: Option<String>,
    seed: Option<u64>,
    alpha: Option<f64>,
    selected_ids: Option<Vec<u64>>,
    locked_segments: Option<Vec<u64>>,
    composite: Option<Composite>,
}

fn serialize_label(state: &dyn SourceState, ctx: &SerializeContext<'_>) -> Result<Map<String, Value>> {
    let label = expect_variant::<LabelSourceState>(state)?;
    let project_directory = ctx.project_directory();
    let (data, project_relative) = match label.data.strip_prefix(&project_directory) {
        Ok(relative) if label.data.is_absolute() => (relative.to_path_buf(), true),
        _ => (label.data.clone(), false),
    };

    to_object(&LabelPayload {
        data,
        project_relative: Some(project_relative),
        name: Some(label.name.clone()),
        seed: Some(label.seed),
        alpha: Some(label.alpha),
        selected_ids: Some(label.selected_ids.clone()),
        locked_segments: Some(label.locked_segments.clone()),
        composite: Some(label.composite),
    })
}

fn deserialize_label(
    payload: &Map<String, Value>,
    ctx: &DeserializeContext<'_>,
) -> Result<Arc<dyn SourceState>> {
    let p: LabelPayload = ctx.parse(payload)?;
    // Paths without the marker are taken as given.
    let data = if p.project_relative.unwrap_or(false) {
        ctx.project_directory().join(&p.data)
    } else {
        p.data
    };

    let defaults = LabelSourceState::new("label", PathBuf::new());
    Ok(Arc::new(LabelSourceState {
        name: p.name.unwrap_or(defaults.name),
        data,
        seed: p.seed.unwrap_or(defaults.seed),
        alpha: p.alpha.unwrap_or(defaults.alpha),
        selected_ids: p.selected_ids.unwrap_or_default(),
        locked_segments: p.locked_segments.unwrap_or_default(),
        composite: p.composite.unwrap_or(defaults.composite),
    }))
}

// --- intersecting ---

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntersectingPayload {
    threshold: usize,
    label: usize,
    name: Option<String>,
    color: Option<String>,
}

fn serialize_intersecting(
    state: &dyn SourceState,
    ctx: &SerializeContext<'_>,
) -> Result<Map<String, Value>> {
    let intersecting = expect_variant::<IntersectingSourceState>(state)?;
    to_object(&IntersectingPayload {
        threshold: ctx.index_of(&intersecting.threshold)?,
        label: ctx.index_of(&intersecting.label)?,
        name: Some(intersecting.name.clone()),
        color: Some(intersecting.color.clone()),
    })
}

fn deserialize_intersecting(
    payload: &Map<String, Value>,
    ctx: &DeserializeContext<'_>,
) -> Result<Arc<dyn SourceState>> {
    let p: IntersectingPayload = ctx.parse(payload)?;
    let threshold = ctx.resolve_as::<ThresholdingSourceState>(p.threshold, "threshold")?;
    let label = ctx.resolve_as::<LabelSourceState>(p.label, "label")?;

    let mut intersecting =
        IntersectingSourceState::new(p.name.unwrap_or_else(|| "intersecting".into()), threshold, label);
    if let Some(color) = p.color {
        intersecting.color = color;
    }
    Ok(Arc::new(intersecting))
}
