//! Viewer configuration parsed from host-provided JSON.
//!
//! Every field is optional; missing fields fall back to the defaults in
//! `consts.rs`, so `{}` is a valid configuration.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::{Deserialize, Serialize};

use crate::consts::{
    ACTIVE_TOOL_COLOR, CONTEXT_MENU_KINDS, SLIDER_RESIZE_DEBOUNCE_MS, TOOL_COLOR, ZOOM_MAX_SCALE, ZOOM_MIN_SCALE,
};
use crate::error::ViewerError;
use crate::policy::MeasurementCap;
use crate::tool::ToolKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerConfig {
    /// Tool activated when a series opens and nothing was active before.
    pub default_tool: ToolKind,
    pub active_color: String,
    pub tool_color: String,
    pub zoom_min_scale: f64,
    pub zoom_max_scale: f64,
    pub measurement_cap: MeasurementCap,
    /// Kinds the context menu looks for, in priority order.
    pub context_menu_kinds: Vec<ToolKind>,
    pub resize_debounce_ms: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_tool: ToolKind::Wwwc,
            active_color: ACTIVE_TOOL_COLOR.to_string(),
            tool_color: TOOL_COLOR.to_string(),
            zoom_min_scale: ZOOM_MIN_SCALE,
            zoom_max_scale: ZOOM_MAX_SCALE,
            measurement_cap: MeasurementCap::default(),
            context_menu_kinds: CONTEXT_MENU_KINDS.to_vec(),
            resize_debounce_ms: SLIDER_RESIZE_DEBOUNCE_MS,
        }
    }
}

impl ViewerConfig {
    /// Parse and validate a JSON config object.
    ///
    /// # Errors
    ///
    /// `Config` if the JSON is malformed or fails [`Self::validate`].
    pub fn from_json(raw: &str) -> Result<Self, ViewerError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the viewer cannot honor.
    ///
    /// # Errors
    ///
    /// `Config` describing the first invalid field.
    pub fn validate(&self) -> Result<(), ViewerError> {
        if self.measurement_cap.max_per_image == 0 {
            return Err(ViewerError::Config("measurementCap.maxPerImage must be at least 1".into()));
        }
        let zoom_ok = self.zoom_min_scale > 0.0 && self.zoom_min_scale < self.zoom_max_scale;
        if !zoom_ok {
            return Err(ViewerError::Config(format!(
                "zoom limits must satisfy 0 < min < max (got {} .. {})",
                self.zoom_min_scale, self.zoom_max_scale
            )));
        }
        if let Some(kind) = self.context_menu_kinds.iter().find(|k| !k.is_annotation()) {
            return Err(ViewerError::Config(format!("{kind} draws no annotations; not a context menu kind")));
        }
        if self.resize_debounce_ms.is_nan() || self.resize_debounce_ms < 0.0 {
            return Err(ViewerError::Config("resizeDebounceMs must be non-negative".into()));
        }
        Ok(())
    }
}
