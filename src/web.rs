//! Browser bridge: exposes a `Viewer` class to JavaScript.
//!
//! DESIGN
//! ======
//! The imaging toolkit lives in JavaScript. The host passes three plain
//! objects (toolkit, surface, store) whose methods are declared in the
//! `extern` block below; thin adapters turn them into the crate's capability
//! traits. The stack slider is an `<input type="range">`.
//!
//! Toolkit entry points return `false` when the named tool is not
//! registered and throw for anything else, so "tool not found" stays
//! distinguishable from a toolkit failure.
//!
//! Annotation state crosses the boundary as JSON and is parsed per bucket,
//! so kinds this crate does not know ride along untouched. Only a payload
//! that is not an object of per-image objects is refused, and `transact`
//! then skips the mutation rather than writing back an empty store.
//!
//! Logging: call `initLogging(level)` once at startup. `tracing` events are
//! forwarded to `log` and printed with `console_log`; panics go to the
//! console through `console_error_panic_hook`.
//!
//! Errors reach JavaScript as strings prefixed with the stable error code,
//! e.g. `"E_TOOL_NOT_FOUND: tool not found: lengthTouch"`.

use std::rc::Rc;

use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::HtmlInputElement;

use crate::annotation::{Annotation, AnnotationBucketMap, AnnotationStore, ImageId};
use crate::config::ViewerConfig;
use crate::error::{LoadError, ToolkitError, ViewerError};
use crate::telemetry;
use crate::events::SurfaceEvent;
use crate::input::{InputSource, Point};
use crate::menu::ContextMenu;
use crate::stack::{SliderRange, SliderWidget};
use crate::tool::{ButtonMask, DeviceClass, ToolKind, ToolVariant};
use crate::toolkit::{HitTestTable, Image, LabelCaptureOptions, LabelDone, RenderingSurface, ToolLibrary, Viewport};
use crate::viewer::{Capabilities, ViewerCore};

// =============================================================================
// JS IMPORTS
// =============================================================================

#[wasm_bindgen]
extern "C" {
    /// Host-side tool registry and configuration.
    pub type JsToolkit;

    #[wasm_bindgen(method, catch)]
    fn activate(this: &JsToolkit, name: &str, mask: u8) -> Result<bool, JsValue>;
    #[wasm_bindgen(method, catch)]
    fn deactivate(this: &JsToolkit, name: &str, mask: u8) -> Result<bool, JsValue>;
    #[wasm_bindgen(method, catch)]
    fn enable(this: &JsToolkit, name: &str) -> Result<bool, JsValue>;
    #[wasm_bindgen(method, catch)]
    fn disable(this: &JsToolkit, name: &str) -> Result<bool, JsValue>;
    #[wasm_bindgen(method, js_name = enableInput)]
    fn enable_input(this: &JsToolkit, name: &str);
    #[wasm_bindgen(method, js_name = setStackPrefetch)]
    fn set_stack_prefetch(this: &JsToolkit, enabled: bool);
    #[wasm_bindgen(method, js_name = setToolColors)]
    fn set_tool_colors(this: &JsToolkit, active: &str, inactive: &str);
    #[wasm_bindgen(method, js_name = setZoomLimits)]
    fn set_zoom_limits(this: &JsToolkit, min_scale: f64, max_scale: f64);
    #[wasm_bindgen(method, catch, js_name = captureLabel)]
    fn capture_label(
        this: &JsToolkit,
        kind: &str,
        annotation_json: &str,
        skip_button: bool,
        done: &js_sys::Function,
    ) -> Result<bool, JsValue>;
    #[wasm_bindgen(method, js_name = pointNearTool)]
    fn point_near_tool(this: &JsToolkit, kind: &str, annotation_json: &str, x: f64, y: f64) -> bool;

    /// Host-side rendering element.
    pub type JsSurface;

    #[wasm_bindgen(method, js_name = currentImageId)]
    fn current_image_id(this: &JsSurface) -> Option<String>;
    /// Resolves to `{ columns, rows }` once the image is decoded and cached.
    #[wasm_bindgen(method, js_name = loadAndCacheImage)]
    fn load_and_cache_image(this: &JsSurface, image_id: &str) -> js_sys::Promise;
    #[wasm_bindgen(method, js_name = displayImage)]
    fn display_image(this: &JsSurface, image_id: &str, viewport_json: &str);
    #[wasm_bindgen(method, js_name = updateImage)]
    fn update_image(this: &JsSurface);
    #[wasm_bindgen(method)]
    fn viewport(this: &JsSurface) -> String;

    /// Host-side annotation state.
    pub type JsStore;

    #[wasm_bindgen(method)]
    fn snapshot(this: &JsStore) -> String;
    #[wasm_bindgen(method)]
    fn restore(this: &JsStore, snapshot_json: &str);
}

fn js_message(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

fn to_js(err: ViewerError) -> JsValue {
    JsValue::from_str(&format!("{}: {err}", err.error_code()))
}

// =============================================================================
// ADAPTERS
// =============================================================================

struct ToolkitAdapter(Rc<JsToolkit>);

impl ToolkitAdapter {
    fn found(name: String, result: Result<bool, JsValue>) -> Result<(), ToolkitError> {
        match result {
            Ok(true) => Ok(()),
            Ok(false) => Err(ToolkitError::ToolNotFound(name)),
            Err(err) => Err(ToolkitError::Rejected(format!("{name}: {}", js_message(&err)))),
        }
    }
}

impl ToolLibrary for ToolkitAdapter {
    fn activate(&self, variant: ToolVariant, buttons: ButtonMask) -> Result<(), ToolkitError> {
        let name = variant.name();
        let result = self.0.activate(&name, buttons.bits());
        Self::found(name, result)
    }

    fn deactivate(&self, variant: ToolVariant, buttons: ButtonMask) -> Result<(), ToolkitError> {
        let name = variant.name();
        let result = self.0.deactivate(&name, buttons.bits());
        Self::found(name, result)
    }

    fn enable(&self, kind: ToolKind) -> Result<(), ToolkitError> {
        Self::found(kind.to_string(), self.0.enable(kind.as_str()))
    }

    fn disable(&self, kind: ToolKind) -> Result<(), ToolkitError> {
        Self::found(kind.to_string(), self.0.disable(kind.as_str()))
    }

    fn enable_input(&self, source: InputSource) {
        self.0.enable_input(source.as_str());
    }

    fn set_stack_prefetch(&self, enabled: bool) {
        self.0.set_stack_prefetch(enabled);
    }

    fn set_tool_colors(&self, active: &str, inactive: &str) {
        self.0.set_tool_colors(active, inactive);
    }

    fn set_zoom_limits(&self, min_scale: f64, max_scale: f64) {
        self.0.set_zoom_limits(min_scale, max_scale);
    }

    fn capture_label(
        &self,
        kind: ToolKind,
        annotation: &Annotation,
        options: LabelCaptureOptions,
        done: LabelDone,
    ) -> Result<(), ToolkitError> {
        let payload = serde_json::to_string(annotation).map_err(|err| ToolkitError::Rejected(err.to_string()))?;
        let done = Closure::once_into_js(move || done());
        let result = self.0.capture_label(kind.as_str(), &payload, options.skip_button, done.unchecked_ref());
        Self::found(format!("{kind}Label"), result)
    }
}

struct SurfaceAdapter(JsSurface);

#[async_trait::async_trait(?Send)]
impl RenderingSurface for SurfaceAdapter {
    fn current_image_id(&self) -> Option<ImageId> {
        self.0.current_image_id()
    }

    async fn load_and_cache_image(&self, image_id: &str) -> Result<Image, LoadError> {
        let fail = |reason: String| LoadError { image_id: image_id.to_string(), reason };
        let loaded = JsFuture::from(self.0.load_and_cache_image(image_id))
            .await
            .map_err(|err| fail(js_message(&err)))?;
        let dims = |field: &str| {
            js_sys::Reflect::get(&loaded, &JsValue::from_str(field))
                .map_err(|err| fail(js_message(&err)))
                .map(|v| v.as_f64().unwrap_or_default())
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (columns, rows) = (dims("columns")? as u32, dims("rows")? as u32);
        Ok(Image { image_id: image_id.to_string(), columns, rows })
    }

    fn display_image(&self, image: &Image, viewport: &Viewport) {
        match serde_json::to_string(viewport) {
            Ok(json) => self.0.display_image(&image.image_id, &json),
            Err(err) => warn!(error = %err, image_id = %image.image_id, "viewport not serializable; image not displayed"),
        }
    }

    fn update_image(&self) {
        self.0.update_image();
    }

    fn viewport(&self) -> Viewport {
        serde_json::from_str(&self.0.viewport()).unwrap_or_else(|err| {
            warn!(error = %err, "unreadable viewport; using defaults");
            Viewport::default()
        })
    }
}

struct StoreAdapter(JsStore);

impl StoreAdapter {
    fn parse(&self) -> Result<AnnotationBucketMap, serde_json::Error> {
        AnnotationBucketMap::from_json(&self.0.snapshot())
    }
}

impl AnnotationStore for StoreAdapter {
    fn snapshot(&self) -> AnnotationBucketMap {
        self.parse().unwrap_or_else(|err| {
            warn!(error = %err, "unreadable annotation snapshot; treating as empty");
            AnnotationBucketMap::new()
        })
    }

    fn restore(&self, snapshot: AnnotationBucketMap) {
        match snapshot.to_json() {
            Ok(json) => self.0.restore(&json),
            Err(err) => warn!(error = %err, "annotation snapshot not serializable; store unchanged"),
        }
    }

    fn transact(&self, f: &mut dyn FnMut(&mut AnnotationBucketMap)) {
        match self.parse() {
            Ok(mut state) => {
                f(&mut state);
                self.restore(state);
            }
            Err(err) => warn!(error = %err, "unreadable annotation snapshot; mutation skipped"),
        }
    }
}

struct SliderAdapter(HtmlInputElement);

impl SliderWidget for SliderAdapter {
    fn configure(&self, range: SliderRange) {
        self.0.set_min(&range.min.to_string());
        self.0.set_max(&range.max.to_string());
        self.0.set_step(&range.step.to_string());
    }

    fn set_value(&self, value: usize) {
        self.0.set_value(&value.to_string());
    }

    fn set_length_px(&self, px: f64) {
        // The slider is rotated to run vertically, so its width is the visible length.
        if let Err(err) = self.0.style().set_property("width", &format!("{px}px")) {
            warn!(error = %js_message(&err), "slider resize rejected");
        }
    }
}

/// Hit tests that defer to the toolkit's own `pointNearTool`.
fn js_hit_tests(toolkit: &Rc<JsToolkit>) -> HitTestTable {
    let mut table = HitTestTable::new();
    for kind in ToolKind::ALL.into_iter().filter(|k| k.is_annotation()) {
        let toolkit = Rc::clone(toolkit);
        table.register_json(kind, move |json: &str, pointer: Point| {
            toolkit.point_near_tool(kind.as_str(), json, pointer.x, pointer.y)
        });
    }
    table
}

fn detect_device() -> DeviceClass {
    let agent = web_sys::window().map(|w| w.navigator().user_agent());
    match agent {
        Some(Ok(agent)) => DeviceClass::from_user_agent(&agent),
        _ => DeviceClass::Mouse,
    }
}

// =============================================================================
// VIEWER
// =============================================================================

/// Send `tracing` output at `level` and above to the browser console and
/// report panics there. Safe to call more than once.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(level: &str) {
    console_error_panic_hook::set_once();
    let level = telemetry::parse_level(level);
    if let Err(err) = console_log::init_with_level(telemetry::console_level(level)) {
        debug!(error = %err, "console logger already installed");
    }
}

/// One viewer per rendering element.
#[wasm_bindgen]
pub struct Viewer {
    core: Rc<ViewerCore>,
}

#[wasm_bindgen]
impl Viewer {
    /// `config_json` may be omitted; every field has a default.
    #[wasm_bindgen(constructor)]
    pub fn new(
        toolkit: JsToolkit,
        surface: JsSurface,
        store: JsStore,
        slider: HtmlInputElement,
        config_json: Option<String>,
    ) -> Result<Viewer, JsValue> {
        let config = match config_json.as_deref() {
            Some(raw) => ViewerConfig::from_json(raw).map_err(to_js)?,
            None => ViewerConfig::default(),
        };
        let toolkit = Rc::new(toolkit);
        let caps = Capabilities {
            hit_tests: js_hit_tests(&toolkit),
            toolkit: Rc::new(ToolkitAdapter(toolkit)),
            surface: Rc::new(SurfaceAdapter(surface)),
            store: Rc::new(StoreAdapter(store)),
            slider: Rc::new(SliderAdapter(slider)),
        };
        let device = detect_device();
        debug!(?device, "viewer created");
        let core = ViewerCore::new(config, caps, device).map_err(to_js)?;
        Ok(Self { core: Rc::new(core) })
    }

    /// Bind a newly opened series.
    #[wasm_bindgen(js_name = initTools)]
    pub fn init_tools(&self, image_ids: Vec<String>) -> Result<(), JsValue> {
        self.core.init_tools(image_ids).map_err(to_js)
    }

    /// Tool selector clicked. Returns the toolkit name that was activated.
    #[wasm_bindgen(js_name = selectTool)]
    pub fn select_tool(&self, name: &str) -> Result<Option<String>, JsValue> {
        let variant = self.core.select_tool(name).map_err(to_js)?;
        Ok(variant.map(|v| v.name()))
    }

    /// The toolkit finished drawing an annotation of `kind`.
    #[wasm_bindgen(js_name = annotationAdded)]
    pub fn annotation_added(&self, kind: &str) -> Result<usize, JsValue> {
        let kind = kind.parse::<ToolKind>().map_err(|err| to_js(err.into()))?;
        Ok(self.core.dispatch(&SurfaceEvent::AnnotationAdded { kind }))
    }

    /// The surface now shows `image_id`.
    #[wasm_bindgen(js_name = imageChanged)]
    pub fn image_changed(&self, image_id: String) -> usize {
        self.core.dispatch(&SurfaceEvent::ImageChanged { image_id })
    }

    /// Slider `input` event with the range element's raw value.
    #[wasm_bindgen(js_name = sliderInput)]
    pub fn slider_input(&self, raw: String) {
        let stack = self.core.stack();
        spawn_local(async move {
            if let Err(err) = stack.select_from_slider(&raw).await {
                warn!(error = %err, code = err.error_code(), "slider selection failed");
            }
        });
    }

    /// Show stack image `index` once it has loaded.
    #[wasm_bindgen(js_name = selectImage)]
    pub fn select_image(&self, index: usize) {
        let stack = self.core.stack();
        spawn_local(async move {
            if let Err(err) = stack.select_image(index).await {
                warn!(error = %err, code = err.error_code(), index, "image selection failed");
            }
        });
    }

    /// Right-click or long-press at canvas coordinates.
    #[wasm_bindgen(js_name = contextMenu)]
    pub fn context_menu(&self, x: f64, y: f64, is_touch: bool) -> Result<Option<ContextMenuHandle>, JsValue> {
        let menu = self.core.context_menu(Point::new(x, y), is_touch).map_err(to_js)?;
        Ok(menu.map(|menu| ContextMenuHandle { core: Rc::clone(&self.core), menu: Some(menu) }))
    }

    /// Size the slider now, without waiting for the resize debounce.
    #[wasm_bindgen(js_name = sizeSlider)]
    pub fn size_slider(&self, viewport_height_px: f64) {
        self.core.size_slider(viewport_height_px);
    }

    /// Window resized; call `flushResize` from a timer or animation frame.
    pub fn resize(&self, now_ms: f64, viewport_height_px: f64) {
        self.core.resize(now_ms, viewport_height_px);
    }

    #[wasm_bindgen(js_name = flushResize)]
    pub fn flush_resize(&self, now_ms: f64) -> bool {
        self.core.flush_resize(now_ms)
    }

    #[wasm_bindgen(js_name = activeTool)]
    pub fn active_tool(&self) -> Option<String> {
        self.core.active_tool().map(|t| t.variant.name())
    }
}

/// A built context menu, usable once.
#[wasm_bindgen]
pub struct ContextMenuHandle {
    core: Rc<ViewerCore>,
    menu: Option<ContextMenu>,
}

#[wasm_bindgen]
impl ContextMenuHandle {
    #[wasm_bindgen(getter)]
    pub fn x(&self) -> f64 {
        self.menu.as_ref().map_or(0.0, |m| m.position.x)
    }

    #[wasm_bindgen(getter)]
    pub fn y(&self) -> f64 {
        self.menu.as_ref().map_or(0.0, |m| m.position.y)
    }

    /// Entry texts in display order; empty once an entry was chosen.
    pub fn texts(&self) -> Vec<String> {
        self.menu
            .as_ref()
            .map(|m| m.texts().into_iter().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Run entry `index`, then `on_close`. Later calls only close.
    pub fn choose(&mut self, index: usize, on_close: &js_sys::Function) -> Result<(), JsValue> {
        let close = || {
            if let Err(err) = on_close.call0(&JsValue::NULL) {
                warn!(error = %js_message(&err), "context menu close callback threw");
            }
        };
        match self.menu.take() {
            Some(menu) => self.core.choose_menu_item(menu, index, close).map(|_| ()).map_err(to_js),
            None => {
                close();
                Ok(())
            }
        }
    }
}
