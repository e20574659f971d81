//! Image stack: the ordered frames of the open series and the slider bound to them.
//!
//! DESIGN
//! ======
//! `StackController` is a cheap `Rc` handle so the host can keep one copy in
//! the viewer and move another into a spawned load. Loads are the only await
//! point in the crate; state is never borrowed across it.
//!
//! Every selection bumps a generation counter, and so does re-initializing
//! the stack. A load that completes after a newer selection (or after a new
//! series was opened) is dropped instead of overwriting `current_index`, so
//! the last issued selection wins rather than the last completed one.

#[cfg(test)]
#[path = "stack_test.rs"]
mod stack_test;

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::annotation::ImageId;
use crate::consts::{SLIDER_RESIZE_DEBOUNCE_MS, SLIDER_STEP};
use crate::error::ViewerError;
use crate::toolkit::{RenderingSurface, ToolLibrary};

// =============================================================================
// TYPES
// =============================================================================

/// Domain of the stack slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliderRange {
    pub min: usize,
    pub max: usize,
    pub step: usize,
}

/// The range input that scrubs through the stack.
pub trait SliderWidget {
    /// Set min, max, and step.
    fn configure(&self, range: SliderRange);

    /// Move the thumb without firing an input event.
    fn set_value(&self, value: usize);

    /// Resize the (vertical) slider to match the viewport.
    fn set_length_px(&self, px: f64);
}

/// Ordered image ids of a series plus the displayed position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageStack {
    image_ids: Vec<ImageId>,
    current_index: usize,
}

impl ImageStack {
    fn new(image_ids: Vec<ImageId>) -> Self {
        Self { image_ids, current_index: 0 }
    }

    #[must_use]
    pub fn image_ids(&self) -> &[ImageId] {
        &self.image_ids
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn current_image_id(&self) -> Option<&ImageId> {
        self.image_ids.get(self.current_index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.image_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.image_ids.is_empty()
    }

    fn position(&self, image_id: &str) -> Option<usize> {
        self.image_ids.iter().position(|id| id == image_id)
    }
}

/// Result of a `select_image` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Out of range, already displayed, or no stack: nothing was loaded.
    Ignored,
    /// The image was loaded and is now displayed.
    Displayed { index: usize },
    /// The load finished after a newer selection; its result was dropped.
    Superseded,
}

#[derive(Debug, Default)]
struct StackState {
    stack: Option<ImageStack>,
    /// Bumped by every selection and re-initialization.
    generation: u64,
    /// Index of the selection currently loading, if any.
    pending: Option<usize>,
}

struct StackInner {
    surface: Rc<dyn RenderingSurface>,
    toolkit: Rc<dyn ToolLibrary>,
    slider: Rc<dyn SliderWidget>,
    state: RefCell<StackState>,
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Owns the image stack of one surface and keeps its slider in sync.
#[derive(Clone)]
pub struct StackController {
    inner: Rc<StackInner>,
}

impl StackController {
    #[must_use]
    pub fn new(surface: Rc<dyn RenderingSurface>, toolkit: Rc<dyn ToolLibrary>, slider: Rc<dyn SliderWidget>) -> Self {
        Self {
            inner: Rc::new(StackInner { surface, toolkit, slider, state: RefCell::new(StackState::default()) }),
        }
    }

    /// Replace the stack with a new series, starting at its first image.
    ///
    /// # Errors
    ///
    /// Returns `EmptyStack` if `image_ids` is empty; the previous stack is kept.
    pub fn init_stack(&self, image_ids: Vec<ImageId>) -> Result<(), ViewerError> {
        if image_ids.is_empty() {
            return Err(ViewerError::EmptyStack);
        }
        let len = image_ids.len();
        {
            let mut state = self.inner.state.borrow_mut();
            state.generation += 1;
            state.pending = None;
            state.stack = Some(ImageStack::new(image_ids));
        }

        // Drop prefetch requests queued for the previous series.
        self.inner.toolkit.set_stack_prefetch(false);
        self.inner.slider.configure(SliderRange { min: 0, max: len, step: SLIDER_STEP });
        self.inner.slider.set_value(0);
        self.inner.toolkit.set_stack_prefetch(true);

        info!(images = len, "image stack initialized");
        Ok(())
    }

    /// Forget the current series. Pending loads are discarded on completion.
    pub fn reset(&self) {
        let mut state = self.inner.state.borrow_mut();
        state.generation += 1;
        state.pending = None;
        state.stack = None;
    }

    /// Load and display the image at `index`.
    ///
    /// # Errors
    ///
    /// Returns `Load` if the loader rejects. Nothing is retried.
    pub async fn select_image(&self, index: usize) -> Result<SelectOutcome, ViewerError> {
        let (image_id, generation) = {
            let mut state = self.inner.state.borrow_mut();
            let Some(stack) = state.stack.as_ref() else {
                return Ok(SelectOutcome::Ignored);
            };
            if index == stack.current_index {
                // Scrubbed back to the displayed frame: cancel whatever is in flight.
                if state.pending.take().is_some() {
                    state.generation += 1;
                }
                return Ok(SelectOutcome::Ignored);
            }
            let Some(image_id) = stack.image_ids.get(index).cloned() else {
                return Ok(SelectOutcome::Ignored);
            };
            state.generation += 1;
            state.pending = Some(index);
            (image_id, state.generation)
        };

        debug!(%image_id, index, "loading stack image");
        let image = match self.inner.surface.load_and_cache_image(&image_id).await {
            Ok(image) => image,
            Err(err) => {
                let mut state = self.inner.state.borrow_mut();
                if state.generation == generation {
                    state.pending = None;
                }
                warn!(%image_id, index, error = %err, "stack image failed to load");
                return Err(err.into());
            }
        };

        {
            let mut state = self.inner.state.borrow_mut();
            if state.generation != generation {
                debug!(%image_id, index, "stale stack load dropped");
                return Ok(SelectOutcome::Superseded);
            }
            state.pending = None;
            let Some(stack) = state.stack.as_mut() else {
                return Ok(SelectOutcome::Superseded);
            };
            stack.current_index = index;
        }

        let viewport = self.inner.surface.viewport();
        self.inner.surface.display_image(&image, &viewport);
        Ok(SelectOutcome::Displayed { index })
    }

    /// Select from the slider's raw string value. Unparsable input is ignored.
    ///
    /// # Errors
    ///
    /// Same as [`Self::select_image`].
    pub async fn select_from_slider(&self, raw: &str) -> Result<SelectOutcome, ViewerError> {
        let Ok(index) = raw.trim().parse::<usize>() else {
            debug!(value = raw, "ignoring non-numeric slider value");
            return Ok(SelectOutcome::Ignored);
        };
        self.select_image(index).await
    }

    /// The surface switched images (slider, wheel, keyboard, or touch scroll).
    /// Track the new position and move the slider thumb to it.
    pub fn on_image_changed(&self, image_id: &str) {
        let value = {
            let mut state = self.inner.state.borrow_mut();
            let Some(stack) = state.stack.as_mut() else {
                return;
            };
            if let Some(index) = stack.position(image_id) {
                stack.current_index = index;
            }
            stack.current_index
        };
        self.inner.slider.set_value(value);
    }

    /// Match the slider's length to the viewport height.
    pub fn resize_slider(&self, viewport_height_px: f64) {
        self.inner.slider.set_length_px(viewport_height_px);
    }

    // --- Queries ---

    /// Copy of the current stack, if a series is open.
    #[must_use]
    pub fn stack(&self) -> Option<ImageStack> {
        self.inner.state.borrow().stack.clone()
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.inner.state.borrow().stack.as_ref().map(ImageStack::current_index)
    }

    #[must_use]
    pub fn current_image_id(&self) -> Option<ImageId> {
        self.inner
            .state
            .borrow()
            .stack
            .as_ref()
            .and_then(|stack| stack.current_image_id().cloned())
    }

    /// Whether a selection is still loading.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().pending.is_some()
    }
}

// =============================================================================
// RESIZE DEBOUNCE
// =============================================================================

/// Collapses a burst of window resizes into one slider re-measure.
///
/// Timestamps are supplied by the host (`performance.now()` in the browser).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeDebounce {
    delay_ms: f64,
    pending: Option<(f64, f64)>,
}

impl Default for ResizeDebounce {
    fn default() -> Self {
        Self::new(SLIDER_RESIZE_DEBOUNCE_MS)
    }
}

impl ResizeDebounce {
    #[must_use]
    pub fn new(delay_ms: f64) -> Self {
        Self { delay_ms, pending: None }
    }

    /// Record a resize at `now_ms`; restarts the quiet period.
    pub fn schedule(&mut self, now_ms: f64, height_px: f64) {
        self.pending = Some((now_ms + self.delay_ms, height_px));
    }

    /// Forget a scheduled resize.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// The height to apply once the quiet period has elapsed.
    pub fn poll(&mut self, now_ms: f64) -> Option<f64> {
        match self.pending {
            Some((deadline, height)) if now_ms >= deadline => {
                self.pending = None;
                Some(height)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
