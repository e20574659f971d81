#![allow(clippy::float_cmp)]

use std::cell::Cell;

use super::*;
use crate::annotation::MemoryAnnotationStore;
use crate::test_support::{FakeSurface, RecordingSlider, RecordingToolkit, ToolkitCall, handle_at, hit_tests};

struct Fixture {
    core: ViewerCore,
    toolkit: Rc<RecordingToolkit>,
    surface: Rc<FakeSurface>,
    store: Rc<MemoryAnnotationStore>,
    slider: Rc<RecordingSlider>,
}

fn fixture_with(config: ViewerConfig, device: DeviceClass) -> Fixture {
    let toolkit = RecordingToolkit::new();
    let surface = FakeSurface::new();
    let store = Rc::new(MemoryAnnotationStore::new());
    let slider = RecordingSlider::new();
    let caps = Capabilities {
        toolkit: toolkit.clone(),
        surface: surface.clone(),
        store: store.clone(),
        slider: slider.clone(),
        hit_tests: hit_tests(),
    };
    let core = ViewerCore::new(config, caps, device).unwrap();
    Fixture { core, toolkit, surface, store, slider }
}

fn fixture() -> Fixture {
    fixture_with(ViewerConfig::default(), DeviceClass::Mouse)
}

fn series(names: &[&str]) -> Vec<ImageId> {
    names.iter().map(|s| (*s).to_string()).collect()
}

fn length_added() -> SurfaceEvent {
    SurfaceEvent::AnnotationAdded { kind: ToolKind::Length }
}

// =============================================================
// construction
// =============================================================

#[test]
fn invalid_config_is_rejected() {
    let config = ViewerConfig { zoom_min_scale: 3.0, zoom_max_scale: 1.0, ..ViewerConfig::default() };
    let caps = Capabilities {
        toolkit: RecordingToolkit::new(),
        surface: FakeSurface::new(),
        store: Rc::new(MemoryAnnotationStore::new()),
        slider: RecordingSlider::new(),
        hit_tests: HitTestTable::new(),
    };
    let err = ViewerCore::new(config, caps, DeviceClass::Mouse).err().unwrap();
    assert_eq!(err.error_code(), "E_CONFIG");
}

// =============================================================
// init_tools
// =============================================================

#[test]
fn init_tools_runs_full_sequence_in_order() {
    let f = fixture();
    f.core.init_tools(series(&["a", "b"])).unwrap();

    let expected = vec![
        ToolkitCall::EnableInput(InputSource::Mouse),
        ToolkitCall::EnableInput(InputSource::Touch),
        ToolkitCall::EnableInput(InputSource::MouseWheel),
        ToolkitCall::EnableInput(InputSource::Keyboard),
        ToolkitCall::StackPrefetch(false),
        ToolkitCall::StackPrefetch(true),
        ToolkitCall::Activate(ToolVariant::ZoomTouchPinch, ButtonMask::NONE),
        ToolkitCall::Activate(ToolVariant::PanMultiTouch, ButtonMask::NONE),
        ToolkitCall::Activate(ToolVariant::StackScrollMultiTouch, ButtonMask::NONE),
        ToolkitCall::Enable(ToolKind::Length),
        ToolkitCall::Activate(ToolVariant::StackScrollWheel, ButtonMask::NONE),
        ToolkitCall::Activate(ToolVariant::StackScrollKeyboard, ButtonMask::NONE),
        ToolkitCall::Activate(ToolVariant::Mouse(ToolKind::Pan), ButtonMask::MIDDLE),
        ToolkitCall::Activate(ToolVariant::Mouse(ToolKind::Zoom), ButtonMask::RIGHT),
        ToolkitCall::ToolColors("greenyellow".into(), "white".into()),
        ToolkitCall::ZoomLimits(0.3, 10.0),
        ToolkitCall::Activate(ToolVariant::Mouse(ToolKind::Wwwc), ButtonMask::LEFT),
    ];
    assert_eq!(f.toolkit.calls(), expected);
    assert_eq!(f.slider.range().map(|r| r.max), Some(2));
    assert_eq!(f.core.listener_count(), 2);
}

#[test]
fn init_tools_clears_annotations() {
    let f = fixture();
    f.store.insert("old", ToolKind::Length, handle_at(1.0, 1.0));
    f.core.init_tools(series(&["a"])).unwrap();
    assert!(f.store.snapshot().is_empty());
}

#[test]
fn init_tools_rejects_empty_series_without_side_effects() {
    let f = fixture();
    f.store.insert("old", ToolKind::Length, handle_at(1.0, 1.0));
    let err = f.core.init_tools(Vec::new()).unwrap_err();
    assert!(matches!(err, ViewerError::EmptyStack));
    assert!(f.toolkit.calls().is_empty());
    assert_eq!(f.store.snapshot().len(), 1);
}

#[test]
fn init_tools_reactivates_previous_tool() {
    let f = fixture();
    f.core.init_tools(series(&["a"])).unwrap();
    f.core.select_tool("length").unwrap();
    f.toolkit.clear_calls();

    f.core.init_tools(series(&["b"])).unwrap();

    let switches = f.toolkit.switches();
    let last_two = &switches[switches.len() - 2..];
    assert_eq!(
        last_two,
        &[
            ToolkitCall::Deactivate(ToolVariant::Mouse(ToolKind::Length), ButtonMask::LEFT),
            ToolkitCall::Activate(ToolVariant::Mouse(ToolKind::Length), ButtonMask::LEFT),
        ]
    );
    assert_eq!(f.core.active_tool().map(|t| t.kind), Some(ToolKind::Length));
}

#[test]
fn init_tools_uses_configured_default_tool() {
    let config = ViewerConfig { default_tool: ToolKind::Pan, ..ViewerConfig::default() };
    let f = fixture_with(config, DeviceClass::Touch);
    f.core.init_tools(series(&["a"])).unwrap();
    assert_eq!(
        f.core.active_tool().map(|t| t.variant),
        Some(ToolVariant::TouchDrag(ToolKind::Pan))
    );
}

#[test]
fn init_tools_reports_missing_default_binding() {
    let f = fixture();
    f.toolkit.without("zoomTouchPinch");
    let err = f.core.init_tools(series(&["a"])).unwrap_err();
    assert!(matches!(err, ViewerError::ToolNotFound(ref name) if name == "zoomTouchPinch"));
}

#[test]
fn init_twice_fires_one_cap_handler_per_event() {
    let f = fixture();
    f.core.init_tools(series(&["a", "b"])).unwrap();
    f.core.init_tools(series(&["a", "b"])).unwrap();
    assert_eq!(f.core.listener_count(), 2);

    f.surface.set_current("a");
    f.store.insert("a", ToolKind::Length, handle_at(1.0, 1.0));
    f.store.insert("a", ToolKind::Length, handle_at(2.0, 2.0));

    assert_eq!(f.core.dispatch(&length_added()), 2);
    // One cap handler means one redraw.
    assert_eq!(f.surface.updates(), 1);
    assert_eq!(f.store.bucket("a", ToolKind::Length).len(), 1);
}

// =============================================================
// routing
// =============================================================

#[test]
fn dispatch_before_init_reaches_nobody() {
    let f = fixture();
    assert_eq!(f.core.dispatch(&length_added()), 0);
}

#[test]
fn length_added_enforces_cap_across_images() {
    let f = fixture();
    f.core.init_tools(series(&["a", "b"])).unwrap();
    f.surface.set_current("b");
    f.store.insert("a", ToolKind::Length, handle_at(1.0, 1.0));
    let newest = handle_at(2.0, 2.0);
    f.store.insert("b", ToolKind::Length, newest.clone());

    f.core.dispatch(&length_added());

    assert!(f.store.bucket("a", ToolKind::Length).is_empty());
    assert_eq!(f.store.bucket("b", ToolKind::Length), vec![newest]);
}

#[test]
fn image_changed_moves_slider() {
    let f = fixture();
    f.core.init_tools(series(&["a", "b", "c"])).unwrap();
    f.core.dispatch(&SurfaceEvent::ImageChanged { image_id: "c".into() });
    assert_eq!(f.slider.value(), Some(2));
    assert_eq!(f.core.stack().current_index(), Some(2));
}

#[test]
fn select_tool_routes_to_controller() {
    let f = fixture();
    f.core.init_tools(series(&["a"])).unwrap();
    assert_eq!(f.core.select_tool("angle").unwrap(), Some(ToolVariant::Mouse(ToolKind::Angle)));
    assert_eq!(f.core.select_tool("").unwrap(), None);
    assert!(f.core.select_tool("lasso").is_err());
    assert_eq!(f.core.active_tool().map(|t| t.kind), Some(ToolKind::Angle));
}

#[test]
fn context_menu_delete_round_trip() {
    let f = fixture();
    f.core.init_tools(series(&["a"])).unwrap();
    f.surface.set_current("a");
    f.store.insert("a", ToolKind::Bidirectional, handle_at(40.0, 40.0));

    let menu = f.core.context_menu(Point::new(41.0, 40.0), false).unwrap().unwrap();
    assert_eq!(menu.texts(), vec!["Delete measurement", "Add Label"]);

    let closed = Cell::new(0);
    let action = f.core.choose_menu_item(menu, 0, || closed.set(closed.get() + 1)).unwrap();
    assert_eq!(action, Some(MenuAction::Delete));
    assert_eq!(closed.get(), 1);
    assert!(f.store.bucket("a", ToolKind::Bidirectional).is_empty());
}

#[tokio::test]
async fn select_image_displays_frame() {
    let f = fixture();
    f.core.init_tools(series(&["a", "b"])).unwrap();
    let outcome = f.core.select_image(1).await.unwrap();
    assert_eq!(outcome, SelectOutcome::Displayed { index: 1 });
    assert_eq!(f.surface.displayed(), series(&["b"]));
}

#[test]
fn resize_is_debounced() {
    let f = fixture();
    f.core.resize(0.0, 300.0);
    f.core.resize(100.0, 480.0);
    assert!(!f.core.flush_resize(200.0));
    assert!(f.core.flush_resize(250.0));
    assert_eq!(*f.slider.lengths.borrow(), vec![480.0]);
    assert!(!f.core.flush_resize(400.0));
}

#[test]
fn size_slider_applies_immediately_and_drops_pending_resize() {
    let f = fixture();
    f.core.init_tools(series(&["a", "b"])).unwrap();
    f.core.resize(0.0, 300.0);
    f.core.size_slider(512.0);
    assert_eq!(*f.slider.lengths.borrow(), vec![512.0]);
    assert!(!f.core.flush_resize(1_000.0));
    assert_eq!(*f.slider.lengths.borrow(), vec![512.0]);
}
