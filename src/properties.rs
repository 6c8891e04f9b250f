//! Shared viewer settings and their codec.
//!
//! Unlike source states, settings are parsed tolerantly: any field missing
//! from the document takes its default, so projects written by older
//! versions keep loading as settings grow. A field that is present with
//! the wrong type is still an error.

use crate::error::{ProjectError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Settings shared by the whole session, independent of any source state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectProperties {
    /// Render scale factors, finest first.
    pub screen_scales: Vec<f64>,
    pub navigation_config: NavigationConfig,
    pub crosshair_config: CrosshairConfig,
    pub grid_constraints: GridConstraints,
    pub scale_bar_overlay_config: ScaleBarOverlayConfig,
    pub logging_config: LoggingConfig,
}

impl Default for ProjectProperties {
    fn default() -> Self {
        Self {
            screen_scales: vec![1.0, 0.5, 0.25, 0.125, 0.0625],
            navigation_config: NavigationConfig::default(),
            crosshair_config: CrosshairConfig::default(),
            grid_constraints: GridConstraints::default(),
            scale_bar_overlay_config: ScaleBarOverlayConfig::default(),
            logging_config: LoggingConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NavigationConfig {
    pub allow_rotations: bool,
    pub zoom_speed: f64,
    pub translation_speed: f64,
    pub rotation_speed: f64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            allow_rotations: true,
            zoom_speed: 1.0,
            translation_speed: 1.0,
            rotation_speed: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CrosshairConfig {
    pub show_crosshairs: bool,
    pub on_focus_color: String,
    pub out_of_focus_color: String,
}

impl Default for CrosshairConfig {
    fn default() -> Self {
        Self {
            show_crosshairs: true,
            on_focus_color: "#ffffff80".to_string(),
            out_of_focus_color: "#ffffff33".to_string(),
        }
    }
}

/// Relative size of the top-left cell of the orthogonal view grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridConstraints {
    pub top_left_width: f64,
    pub top_left_height: f64,
}

impl Default for GridConstraints {
    fn default() -> Self {
        Self {
            top_left_width: 0.5,
            top_left_height: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScaleBarOverlayConfig {
    pub is_showing: bool,
    pub num_decimals: u32,
    /// Target length of the scale bar in screen pixels.
    pub target_scale_bar_length: f64,
}

impl Default for ScaleBarOverlayConfig {
    fn default() -> Self {
        Self {
            is_showing: true,
            num_decimals: 2,
            target_scale_bar_length: 200.0,
        }
    }
}

/// Log verbosity, as written in project files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl fmt::Display for LogLevel {
    /// Lowercase form understood by `tracing` filter directives.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    pub is_logging_enabled: bool,
    pub root_logger_level: LogLevel,
    /// Per-target overrides of the root level.
    pub logger_levels: BTreeMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            is_logging_enabled: true,
            root_logger_level: LogLevel::Info,
            logger_levels: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Render as a `tracing` filter directive, e.g. `info,project_store=debug`.
    pub fn filter_directives(&self) -> String {
        if !self.is_logging_enabled {
            return LogLevel::Off.to_string();
        }

        let mut directives = vec![self.root_logger_level.to_string()];
        directives.extend(
            self.logger_levels
                .iter()
                .map(|(target, level)| format!("{}={}", target, level)),
        );
        directives.join(",")
    }
}

/// Encode settings as a document object.
pub fn serialize(properties: &ProjectProperties) -> Result<Map<String, Value>> {
    match serde_json::to_value(properties)? {
        Value::Object(map) => Ok(map),
        other => Err(ProjectError::Serialization(format!(
            "properties must encode to an object, got {}",
            other
        ))),
    }
}

/// Decode settings from a document object, defaulting anything missing.
///
/// `None` yields the defaults. Keys that are not settings (such as the
/// source subtree stored alongside) are ignored.
pub fn deserialize(object: Option<&Map<String, Value>>, path: &str) -> Result<ProjectProperties> {
    match object {
        None => Ok(ProjectProperties::default()),
        Some(object) => serde_json::from_value(Value::Object(object.clone()))
            .map_err(|e| ProjectError::malformed(path, e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_yields_defaults() {
        let properties = deserialize(None, "paintera").unwrap();
        assert_eq!(properties, ProjectProperties::default());
        assert_eq!(properties.screen_scales.len(), 5);
    }

    #[test]
    fn test_empty_object_yields_defaults() {
        let properties = deserialize(Some(&Map::new()), "paintera").unwrap();
        assert_eq!(properties, ProjectProperties::default());
    }

    #[test]
    fn test_partial_nested_object_keeps_other_defaults() {
        let doc = json!({
            "navigationConfig": {"zoomSpeed": 2.5},
            "screenScales": [1.0, 0.5],
            "sourceInfo": {"0": {"type": "raw"}}
        });
        let properties = deserialize(doc.as_object(), "paintera").unwrap();

        assert_eq!(properties.navigation_config.zoom_speed, 2.5);
        assert!(properties.navigation_config.allow_rotations);
        assert_eq!(properties.screen_scales, vec![1.0, 0.5]);
        assert_eq!(properties.crosshair_config, CrosshairConfig::default());
    }

    #[test]
    fn test_wrong_type_is_malformed() {
        let doc = json!({"gridConstraints": {"topLeftWidth": "wide"}});
        let result = deserialize(doc.as_object(), "paintera");
        assert!(matches!(
            result,
            Err(ProjectError::MalformedDocument { path, .. }) if path == "paintera"
        ));
    }

    #[test]
    fn test_serialize_uses_camel_case() {
        let map = serialize(&ProjectProperties::default()).unwrap();
        assert!(map.contains_key("screenScales"));
        assert_eq!(map["scaleBarOverlayConfig"]["numDecimals"], json!(2));
        assert_eq!(map["loggingConfig"]["rootLoggerLevel"], json!("INFO"));
    }

    #[test]
    fn test_roundtrip_modified_properties() {
        let mut properties = ProjectProperties::default();
        properties.grid_constraints.top_left_width = 0.7;
        properties.crosshair_config.show_crosshairs = false;
        properties
            .logging_config
            .logger_levels
            .insert("project_store::source_info".into(), LogLevel::Trace);

        let map = serialize(&properties).unwrap();
        let restored = deserialize(Some(&map), "paintera").unwrap();
        assert_eq!(restored, properties);
    }

    #[test]
    fn test_filter_directives() {
        let mut logging = LoggingConfig::default();
        assert_eq!(logging.filter_directives(), "info");

        logging.root_logger_level = LogLevel::Warn;
        logging.logger_levels.insert("project_store".into(), LogLevel::Debug);
        logging.logger_levels.insert("attributes".into(), LogLevel::Error);
        assert_eq!(logging.filter_directives(), "warn,attributes=error,project_store=debug");

        logging.is_logging_enabled = false;
        assert_eq!(logging.filter_directives(), "off");
    }

    #[test]
    fn test_filter_directives_parse_as_env_filter() {
        let mut logging = LoggingConfig::default();
        logging.logger_levels.insert("project_store".into(), LogLevel::Trace);
        assert!(tracing_subscriber::EnvFilter::try_new(logging.filter_directives()).is_ok());
    }

    #[test]
    fn test_unknown_log_level_is_malformed() {
        let doc = json!({"loggingConfig": {"rootLoggerLevel": "CHATTY"}});
        assert!(deserialize(doc.as_object(), "paintera").is_err());
    }
}
