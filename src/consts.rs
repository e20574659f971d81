//! Shared defaults for the viewer crate.

use crate::tool::ToolKind;

// ── Tools ───────────────────────────────────────────────────────

/// Tool activated when a series opens and nothing was active before.
pub const DEFAULT_TOOL: &str = "wwwc";

/// Color of the tool under the pointer / being edited.
pub const ACTIVE_TOOL_COLOR: &str = "greenyellow";

/// Color of every other annotation.
pub const TOOL_COLOR: &str = "white";

/// Smallest zoom scale the zoom tool may reach.
pub const ZOOM_MIN_SCALE: f64 = 0.3;

/// Largest zoom scale the zoom tool may reach.
pub const ZOOM_MAX_SCALE: f64 = 10.0;

// ── Measurements ────────────────────────────────────────────────

/// Maximum number of length measurements kept on the displayed image.
pub const MAX_LENGTH_MEASUREMENTS: usize = 1;

/// Kinds the context menu looks for under the pointer, in priority order.
pub const CONTEXT_MENU_KINDS: [ToolKind; 4] =
    [ToolKind::Bidirectional, ToolKind::Length, ToolKind::Angle, ToolKind::ArrowAnnotate];

// ── Stack ───────────────────────────────────────────────────────

/// Quiet period before a window resize re-measures the slider.
pub const SLIDER_RESIZE_DEBOUNCE_MS: f64 = 150.0;

/// Slider step between two frames.
pub const SLIDER_STEP: usize = 1;

// ── Device detection ────────────────────────────────────────────

/// User-agent fragments that mark a touch-first device (case-insensitive).
pub const TOUCH_USER_AGENTS: [&str; 4] = ["iphone", "ipad", "ipod", "android"];
