//! Capabilities consumed from the external imaging toolkit.
//!
//! DESIGN
//! ======
//! The toolkit does all the real work: decoding, rendering, gesture
//! recognition, measurement math, hit-testing. The viewer core only talks to
//! it through the traits below, so the browser bridge and the test fakes are
//! interchangeable. Everything runs on one UI thread; the async trait is
//! declared `?Send` because browser futures are not `Send`.

#[cfg(test)]
#[path = "toolkit_test.rs"]
mod toolkit_test;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::annotation::{Annotation, ImageId};
use crate::error::{LoadError, ToolkitError};
use crate::input::{InputSource, Point};
use crate::tool::{ButtonMask, ToolKind, ToolVariant};

// =============================================================================
// RENDERING SURFACE
// =============================================================================

/// A decoded image as reported by the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub image_id: ImageId,
    pub columns: u32,
    pub rows: u32,
}

/// Display parameters of a surface, carried over unchanged between frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Viewport {
    pub scale: f64,
    pub translation: Translation,
    pub window_width: f64,
    pub window_center: f64,
    pub invert: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Translation {
    pub x: f64,
    pub y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translation: Translation::default(),
            window_width: 400.0,
            window_center: 40.0,
            invert: false,
        }
    }
}

/// The element images are drawn into.
#[async_trait::async_trait(?Send)]
pub trait RenderingSurface {
    /// Id of the image currently displayed, if any.
    fn current_image_id(&self) -> Option<ImageId>;

    /// Fetch (or reuse from cache) and decode an image.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] when the loader rejects.
    async fn load_and_cache_image(&self, image_id: &str) -> Result<Image, LoadError>;

    /// Show `image` with the given display parameters.
    fn display_image(&self, image: &Image, viewport: &Viewport);

    /// Redraw the current image and its annotations.
    fn update_image(&self);

    /// Current display parameters.
    fn viewport(&self) -> Viewport;
}

// =============================================================================
// TOOL LIBRARY
// =============================================================================

/// Options for the toolkit's interactive label prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LabelCaptureOptions {
    /// Hide the prompt's confirmation button; picking a value commits it.
    pub skip_button: bool,
}

/// Callback run once the label prompt closes.
pub type LabelDone = Box<dyn FnOnce()>;

/// Tool registration and configuration entry points.
pub trait ToolLibrary {
    /// Make a tool respond to input on the bound surface.
    ///
    /// # Errors
    ///
    /// `ToolNotFound` if the toolkit has no such variant.
    fn activate(&self, variant: ToolVariant, buttons: ButtonMask) -> Result<(), ToolkitError>;

    /// Stop a tool from responding to input.
    ///
    /// # Errors
    ///
    /// `ToolNotFound` if the toolkit has no such variant.
    fn deactivate(&self, variant: ToolVariant, buttons: ButtonMask) -> Result<(), ToolkitError>;

    /// Draw a tool's annotations without making it interactive.
    ///
    /// # Errors
    ///
    /// `ToolNotFound` if the toolkit has no such tool.
    fn enable(&self, kind: ToolKind) -> Result<(), ToolkitError>;

    /// Hide a tool's annotations.
    ///
    /// # Errors
    ///
    /// `ToolNotFound` if the toolkit has no such tool.
    fn disable(&self, kind: ToolKind) -> Result<(), ToolkitError>;

    /// Start listening to a raw input stream.
    fn enable_input(&self, source: InputSource);

    /// Turn background prefetch of stack images on or off.
    fn set_stack_prefetch(&self, enabled: bool);

    /// Colors for the active and the inactive annotations.
    fn set_tool_colors(&self, active: &str, inactive: &str);

    /// Clamp the zoom tool's scale range.
    fn set_zoom_limits(&self, min_scale: f64, max_scale: f64);

    /// Open the interactive label prompt for `annotation`; `done` runs when it closes.
    ///
    /// # Errors
    ///
    /// `ToolNotFound` if `kind` has no label prompt.
    fn capture_label(
        &self,
        kind: ToolKind,
        annotation: &Annotation,
        options: LabelCaptureOptions,
        done: LabelDone,
    ) -> Result<(), ToolkitError>;
}

// =============================================================================
// HIT TESTS
// =============================================================================

/// Per-kind test: is the pointer within tolerance of this annotation?
pub type HitTestFn = Box<dyn Fn(&Annotation, Point) -> bool>;

/// Hit-test functions registered once at startup, looked up by tool kind.
#[derive(Default)]
pub struct HitTestTable {
    entries: HashMap<ToolKind, HitTestFn>,
}

impl HitTestTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the hit test for `kind`.
    pub fn register(&mut self, kind: ToolKind, test: impl Fn(&Annotation, Point) -> bool + 'static) {
        self.entries.insert(kind, Box::new(test));
    }

    /// Register a hit test that reads the annotation as JSON, the form a
    /// toolkit outside Rust understands. An annotation that cannot be
    /// serialized is logged and counts as a miss.
    pub fn register_json(&mut self, kind: ToolKind, test: impl Fn(&str, Point) -> bool + 'static) {
        self.register(kind, move |annotation: &Annotation, pointer: Point| {
            match serde_json::to_string(annotation) {
                Ok(json) => test(&json, pointer),
                Err(err) => {
                    warn!(error = %err, %kind, id = %annotation.id, "annotation not serializable; treated as a miss");
                    false
                }
            }
        });
    }

    /// Builder form of [`Self::register`].
    #[must_use]
    pub fn with(mut self, kind: ToolKind, test: impl Fn(&Annotation, Point) -> bool + 'static) -> Self {
        self.register(kind, test);
        self
    }

    /// Run the registered test for `kind`.
    ///
    /// # Errors
    ///
    /// `ToolNotFound` if nothing is registered for `kind`.
    pub fn point_near(&self, kind: ToolKind, annotation: &Annotation, pointer: Point) -> Result<bool, ToolkitError> {
        let test = self
            .entries
            .get(&kind)
            .ok_or_else(|| ToolkitError::ToolNotFound(format!("{kind} hit test")))?;
        Ok(test(annotation, pointer))
    }

    #[must_use]
    pub fn contains(&self, kind: ToolKind) -> bool {
        self.entries.contains_key(&kind)
    }
}

impl fmt::Debug for HitTestTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.entries.keys().collect();
        kinds.sort();
        f.debug_struct("HitTestTable").field("kinds", &kinds).finish()
    }
}
