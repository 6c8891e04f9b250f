//! Core value types shared by source states and codecs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Lazily evaluated project directory.
///
/// Evaluated at (de)serialization time, not when the registry or project is
/// built, because the project location may change during a session.
pub type PathSupplier = Arc<dyn Fn() -> PathBuf + Send + Sync>;

/// Path supplier that always yields `path`.
pub fn fixed_path(path: impl Into<PathBuf>) -> PathSupplier {
    let path = path.into();
    Arc::new(move || path.clone())
}

/// How a source is blended on top of the sources below it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Composite {
    #[default]
    AlphaAdd,
    AlphaYCbCr,
    Copy,
}

/// Mapping of data axes onto viewer axes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisOrder {
    #[default]
    XYZ,
    XZY,
    YXZ,
    YZX,
    ZXY,
    ZYX,
}

impl fmt::Display for AxisOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AxisOrder::XYZ => "XYZ",
            AxisOrder::XZY => "XZY",
            AxisOrder::YXZ => "YXZ",
            AxisOrder::YZX => "YZX",
            AxisOrder::ZXY => "ZXY",
            AxisOrder::ZYX => "ZYX",
        };
        f.write_str(s)
    }
}

/// Summary of a completed load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Whether the reserved key was present in the attribute store.
    pub document_present: bool,
    /// Number of states materialized.
    pub states_loaded: usize,
    /// Selected index after load.
    pub current_index: Option<usize>,
}
