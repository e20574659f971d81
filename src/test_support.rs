//! Recording fakes for the toolkit capabilities, shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use serde_json::json;
use tokio::sync::oneshot;

use crate::annotation::{Annotation, AnnotationId, ImageId};
use crate::error::{LoadError, ToolkitError};
use crate::input::{InputSource, Point};
use crate::stack::{SliderRange, SliderWidget};
use crate::tool::{ButtonMask, ToolKind, ToolVariant};
use crate::toolkit::{HitTestTable, Image, LabelCaptureOptions, LabelDone, RenderingSurface, ToolLibrary, Viewport};

// =============================================================================
// TOOLKIT
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ToolkitCall {
    Activate(ToolVariant, ButtonMask),
    Deactivate(ToolVariant, ButtonMask),
    Enable(ToolKind),
    Disable(ToolKind),
    EnableInput(InputSource),
    StackPrefetch(bool),
    ToolColors(String, String),
    ZoomLimits(f64, f64),
    CaptureLabel(ToolKind, AnnotationId, LabelCaptureOptions),
}

#[derive(Default)]
pub struct RecordingToolkit {
    calls: RefCell<Vec<ToolkitCall>>,
    missing: RefCell<HashSet<String>>,
    pending_label: RefCell<Option<LabelDone>>,
}

impl RecordingToolkit {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Make the toolkit report `ToolNotFound` for a variant name.
    pub fn without(&self, name: &str) {
        self.missing.borrow_mut().insert(name.to_string());
    }

    pub fn calls(&self) -> Vec<ToolkitCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Activations and deactivations only, in order.
    pub fn switches(&self) -> Vec<ToolkitCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, ToolkitCall::Activate(..) | ToolkitCall::Deactivate(..)))
            .collect()
    }

    /// Close the label prompt, running its completion callback.
    pub fn finish_label(&self) -> bool {
        let done = self.pending_label.borrow_mut().take();
        match done {
            Some(done) => {
                done();
                true
            }
            None => false,
        }
    }

    fn check(&self, name: &str) -> Result<(), ToolkitError> {
        if self.missing.borrow().contains(name) {
            return Err(ToolkitError::ToolNotFound(name.to_string()));
        }
        Ok(())
    }

    fn record(&self, call: ToolkitCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl ToolLibrary for RecordingToolkit {
    fn activate(&self, variant: ToolVariant, buttons: ButtonMask) -> Result<(), ToolkitError> {
        self.check(&variant.name())?;
        self.record(ToolkitCall::Activate(variant, buttons));
        Ok(())
    }

    fn deactivate(&self, variant: ToolVariant, buttons: ButtonMask) -> Result<(), ToolkitError> {
        self.check(&variant.name())?;
        self.record(ToolkitCall::Deactivate(variant, buttons));
        Ok(())
    }

    fn enable(&self, kind: ToolKind) -> Result<(), ToolkitError> {
        self.check(kind.as_str())?;
        self.record(ToolkitCall::Enable(kind));
        Ok(())
    }

    fn disable(&self, kind: ToolKind) -> Result<(), ToolkitError> {
        self.check(kind.as_str())?;
        self.record(ToolkitCall::Disable(kind));
        Ok(())
    }

    fn enable_input(&self, source: InputSource) {
        self.record(ToolkitCall::EnableInput(source));
    }

    fn set_stack_prefetch(&self, enabled: bool) {
        self.record(ToolkitCall::StackPrefetch(enabled));
    }

    fn set_tool_colors(&self, active: &str, inactive: &str) {
        self.record(ToolkitCall::ToolColors(active.to_string(), inactive.to_string()));
    }

    fn set_zoom_limits(&self, min_scale: f64, max_scale: f64) {
        self.record(ToolkitCall::ZoomLimits(min_scale, max_scale));
    }

    fn capture_label(
        &self,
        kind: ToolKind,
        annotation: &Annotation,
        options: LabelCaptureOptions,
        done: LabelDone,
    ) -> Result<(), ToolkitError> {
        self.check(&format!("{kind}Label"))?;
        self.record(ToolkitCall::CaptureLabel(kind, annotation.id, options));
        *self.pending_label.borrow_mut() = Some(done);
        Ok(())
    }
}

// =============================================================================
// SURFACE
// =============================================================================

type Gate = oneshot::Receiver<Result<(), String>>;

#[derive(Default)]
pub struct FakeSurface {
    current: RefCell<Option<ImageId>>,
    loads: RefCell<Vec<ImageId>>,
    displayed: RefCell<Vec<ImageId>>,
    gates: RefCell<HashMap<ImageId, Gate>>,
    failing: RefCell<HashSet<ImageId>>,
    updates: Cell<usize>,
    viewport: Cell<Viewport>,
}

impl FakeSurface {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn showing(image_id: &str) -> Rc<Self> {
        let surface = Self::new();
        surface.set_current(image_id);
        surface
    }

    pub fn set_current(&self, image_id: &str) {
        *self.current.borrow_mut() = Some(image_id.to_string());
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.viewport.set(viewport);
    }

    /// Hold the next load of `image_id` until the returned sender fires.
    pub fn hold(&self, image_id: &str) -> oneshot::Sender<Result<(), String>> {
        let (tx, rx) = oneshot::channel();
        self.gates.borrow_mut().insert(image_id.to_string(), rx);
        tx
    }

    pub fn fail(&self, image_id: &str) {
        self.failing.borrow_mut().insert(image_id.to_string());
    }

    pub fn loads(&self) -> Vec<ImageId> {
        self.loads.borrow().clone()
    }

    pub fn displayed(&self) -> Vec<ImageId> {
        self.displayed.borrow().clone()
    }

    pub fn updates(&self) -> usize {
        self.updates.get()
    }
}

#[async_trait::async_trait(?Send)]
impl RenderingSurface for FakeSurface {
    fn current_image_id(&self) -> Option<ImageId> {
        self.current.borrow().clone()
    }

    async fn load_and_cache_image(&self, image_id: &str) -> Result<Image, LoadError> {
        self.loads.borrow_mut().push(image_id.to_string());
        let gate = self.gates.borrow_mut().remove(image_id);
        let fail = |reason: String| LoadError { image_id: image_id.to_string(), reason };
        if let Some(gate) = gate {
            match gate.await {
                Ok(Ok(())) => {}
                Ok(Err(reason)) => return Err(fail(reason)),
                Err(_) => return Err(fail("load abandoned".into())),
            }
        }
        if self.failing.borrow().contains(image_id) {
            return Err(fail("404".into()));
        }
        Ok(Image { image_id: image_id.to_string(), columns: 512, rows: 512 })
    }

    fn display_image(&self, image: &Image, viewport: &Viewport) {
        self.viewport.set(*viewport);
        self.displayed.borrow_mut().push(image.image_id.clone());
        self.set_current(&image.image_id);
    }

    fn update_image(&self) {
        self.updates.set(self.updates.get() + 1);
    }

    fn viewport(&self) -> Viewport {
        self.viewport.get()
    }
}

// =============================================================================
// SLIDER
// =============================================================================

#[derive(Default)]
pub struct RecordingSlider {
    pub ranges: RefCell<Vec<SliderRange>>,
    pub values: RefCell<Vec<usize>>,
    pub lengths: RefCell<Vec<f64>>,
}

impl RecordingSlider {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn value(&self) -> Option<usize> {
        self.values.borrow().last().copied()
    }

    pub fn range(&self) -> Option<SliderRange> {
        self.ranges.borrow().last().copied()
    }
}

impl SliderWidget for RecordingSlider {
    fn configure(&self, range: SliderRange) {
        self.ranges.borrow_mut().push(range);
    }

    fn set_value(&self, value: usize) {
        self.values.borrow_mut().push(value);
    }

    fn set_length_px(&self, px: f64) {
        self.lengths.borrow_mut().push(px);
    }
}

// =============================================================================
// ANNOTATIONS
// =============================================================================

/// Annotation whose geometry is a single handle at `(x, y)`.
pub fn handle_at(x: f64, y: f64) -> Annotation {
    Annotation::new(json!({ "handles": { "start": { "x": x, "y": y } } }))
}

/// Hit test over `handle_at` geometry with a fixed pixel tolerance.
pub fn near_handle(tolerance: f64) -> impl Fn(&Annotation, Point) -> bool {
    move |annotation: &Annotation, pointer: Point| {
        let start = &annotation.geometry["handles"]["start"];
        match (start["x"].as_f64(), start["y"].as_f64()) {
            (Some(x), Some(y)) => (x - pointer.x).hypot(y - pointer.y) <= tolerance,
            _ => false,
        }
    }
}

/// Hit tests for every annotation kind with a 6px tolerance.
pub fn hit_tests() -> HitTestTable {
    let mut table = HitTestTable::new();
    for kind in ToolKind::ALL.into_iter().filter(|k| k.is_annotation()) {
        table.register(kind, near_handle(6.0));
    }
    table
}
