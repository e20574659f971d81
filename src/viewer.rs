//! Per-surface orchestrator: owns the controllers and routes host events.
//!
//! DESIGN
//! ======
//! One `ViewerCore` per rendering surface; nothing is global. The host calls
//! `init_tools` every time a series is opened. That sequence is safe to
//! repeat:
//! - annotation state is wiped by restoring an empty snapshot;
//! - the default bindings are re-applied (the toolkit treats them as set
//!   operations);
//! - the previously active tool is re-activated, or the configured default;
//! - listeners are attached under fixed keys, replacing earlier instances.
//!
//! All methods take `&self` so the web bridge can share the core through an
//! `Rc`. Mutable state sits in `RefCell`s that are never held across an
//! await; async selection goes through a cloned `StackController` handle.

#[cfg(test)]
#[path = "viewer_test.rs"]
mod viewer_test;

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, info};

use crate::annotation::{AnnotationBucketMap, AnnotationStore, ImageId};
use crate::config::ViewerConfig;
use crate::controller::{ActiveTool, ToolController};
use crate::error::ViewerError;
use crate::events::{ListenerKey, Listeners, SurfaceEvent};
use crate::input::{InputSource, Point};
use crate::locator::Locator;
use crate::menu::{ContextMenu, ContextMenuPresenter, MenuAction};
use crate::policy::MeasurementCapPolicy;
use crate::stack::{ResizeDebounce, SelectOutcome, SliderWidget, StackController};
use crate::tool::{ButtonMask, DeviceClass, ToolKind, ToolVariant};
use crate::toolkit::{HitTestTable, RenderingSurface, ToolLibrary};

/// Always-on gesture and input bindings that need no button.
const GESTURE_VARIANTS: [ToolVariant; 3] =
    [ToolVariant::ZoomTouchPinch, ToolVariant::PanMultiTouch, ToolVariant::StackScrollMultiTouch];

const SCROLL_VARIANTS: [ToolVariant; 2] = [ToolVariant::StackScrollWheel, ToolVariant::StackScrollKeyboard];

/// Capabilities a surface is wired to.
pub struct Capabilities {
    pub toolkit: Rc<dyn ToolLibrary>,
    pub surface: Rc<dyn RenderingSurface>,
    pub store: Rc<dyn AnnotationStore>,
    pub slider: Rc<dyn SliderWidget>,
    pub hit_tests: HitTestTable,
}

pub struct ViewerCore {
    config: ViewerConfig,
    toolkit: Rc<dyn ToolLibrary>,
    store: Rc<dyn AnnotationStore>,
    tools: RefCell<ToolController>,
    stack: StackController,
    menu: ContextMenuPresenter,
    policy: Rc<MeasurementCapPolicy>,
    listeners: RefCell<Listeners>,
    resize: RefCell<ResizeDebounce>,
}

impl ViewerCore {
    /// # Errors
    ///
    /// `Config` if `config` fails validation.
    pub fn new(config: ViewerConfig, caps: Capabilities, device: DeviceClass) -> Result<Self, ViewerError> {
        config.validate()?;
        let Capabilities { toolkit, surface, store, slider, hit_tests } = caps;

        let locator = Locator::new(Rc::clone(&store), Rc::new(hit_tests));
        let menu = ContextMenuPresenter::new(
            locator,
            Rc::clone(&store),
            Rc::clone(&surface),
            Rc::clone(&toolkit),
            config.context_menu_kinds.clone(),
        );
        let policy = MeasurementCapPolicy::new(config.measurement_cap, Rc::clone(&store), Rc::clone(&surface));
        let stack = StackController::new(surface, Rc::clone(&toolkit), slider);

        Ok(Self {
            tools: RefCell::new(ToolController::new(Rc::clone(&toolkit), device)),
            resize: RefCell::new(ResizeDebounce::new(config.resize_debounce_ms)),
            policy: Rc::new(policy),
            listeners: RefCell::new(Listeners::new()),
            config,
            toolkit,
            store,
            stack,
            menu,
        })
    }

    // =========================================================================
    // INITIALIZATION
    // =========================================================================

    /// Bind a freshly opened series to the surface.
    ///
    /// # Errors
    ///
    /// `EmptyStack` before anything is touched, or `ToolNotFound` if the
    /// toolkit lacks one of the default bindings.
    pub fn init_tools(&self, image_ids: Vec<ImageId>) -> Result<(), ViewerError> {
        if image_ids.is_empty() {
            return Err(ViewerError::EmptyStack);
        }

        self.store.restore(AnnotationBucketMap::new());
        for source in InputSource::ALL {
            self.toolkit.enable_input(source);
        }
        self.stack.init_stack(image_ids)?;
        self.apply_default_bindings()?;

        let tool = self.tools.borrow().active_kind().unwrap_or(self.config.default_tool);
        self.tools.borrow_mut().activate(Some(tool))?;

        self.attach_listeners();
        info!(tool = %tool, "viewer tools initialized");
        Ok(())
    }

    fn apply_default_bindings(&self) -> Result<(), ViewerError> {
        for variant in GESTURE_VARIANTS {
            self.toolkit.activate(variant, ButtonMask::NONE)?;
        }
        // Length measurements stay visible whatever tool is active.
        self.toolkit.enable(ToolKind::Length)?;
        for variant in SCROLL_VARIANTS {
            self.toolkit.activate(variant, ButtonMask::NONE)?;
        }
        self.toolkit.activate(ToolVariant::Mouse(ToolKind::Pan), ButtonMask::MIDDLE)?;
        self.toolkit.activate(ToolVariant::Mouse(ToolKind::Zoom), ButtonMask::RIGHT)?;
        self.toolkit.set_tool_colors(&self.config.active_color, &self.config.tool_color);
        self.toolkit.set_zoom_limits(self.config.zoom_min_scale, self.config.zoom_max_scale);
        Ok(())
    }

    fn attach_listeners(&self) {
        let mut listeners = self.listeners.borrow_mut();

        let policy = Rc::clone(&self.policy);
        listeners.attach(ListenerKey::MeasurementCap, move |event| {
            policy.handle(event);
        });

        let stack = self.stack.clone();
        listeners.attach(ListenerKey::SliderSync, move |event| {
            if let SurfaceEvent::ImageChanged { image_id } = event {
                stack.on_image_changed(image_id);
            }
        });
    }

    // =========================================================================
    // ROUTING
    // =========================================================================

    /// Tool selector clicked. An empty identifier is ignored.
    ///
    /// # Errors
    ///
    /// `ToolNotFound` for an unknown identifier or a variant the toolkit lacks.
    pub fn select_tool(&self, name: &str) -> Result<Option<ToolVariant>, ViewerError> {
        self.tools.borrow_mut().activate_named(name)
    }

    /// Deliver a toolkit or surface notification. Returns how many handlers ran.
    pub fn dispatch(&self, event: &SurfaceEvent) -> usize {
        // Handlers may call back into the core; release the borrow first.
        let listeners = self.listeners.borrow().clone();
        let delivered = listeners.emit(event);
        debug!(?event, delivered, "surface event dispatched");
        delivered
    }

    /// Right-click or long-press at `pointer`.
    ///
    /// # Errors
    ///
    /// As [`ContextMenuPresenter::build_menu`].
    pub fn context_menu(&self, pointer: Point, is_touch: bool) -> Result<Option<ContextMenu>, ViewerError> {
        self.menu.build_menu(pointer, is_touch)
    }

    /// Run a context-menu entry, then `on_close`.
    ///
    /// # Errors
    ///
    /// As [`ContextMenuPresenter::choose`].
    pub fn choose_menu_item(
        &self,
        menu: ContextMenu,
        index: usize,
        on_close: impl FnOnce(),
    ) -> Result<Option<MenuAction>, ViewerError> {
        self.menu.choose(menu, index, on_close)
    }

    /// Load and display stack image `index`.
    ///
    /// # Errors
    ///
    /// `Load` if the loader rejects.
    pub async fn select_image(&self, index: usize) -> Result<SelectOutcome, ViewerError> {
        self.stack.select_image(index).await
    }

    /// Window resized at `now_ms`; the slider follows once resizing settles.
    pub fn resize(&self, now_ms: f64, viewport_height_px: f64) {
        self.resize.borrow_mut().schedule(now_ms, viewport_height_px);
    }

    /// Size the slider to the viewport right away, e.g. once the surface has
    /// been laid out after `init_tools`. Drops any resize still settling.
    pub fn size_slider(&self, viewport_height_px: f64) {
        self.resize.borrow_mut().cancel();
        self.stack.resize_slider(viewport_height_px);
    }

    /// Apply a settled resize. Returns whether the slider was resized.
    pub fn flush_resize(&self, now_ms: f64) -> bool {
        let settled = self.resize.borrow_mut().poll(now_ms);
        match settled {
            Some(height) => {
                self.stack.resize_slider(height);
                true
            }
            None => false,
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Handle to the stack controller, for spawning selections.
    #[must_use]
    pub fn stack(&self) -> StackController {
        self.stack.clone()
    }

    #[must_use]
    pub fn active_tool(&self) -> Option<ActiveTool> {
        self.tools.borrow().active()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}
