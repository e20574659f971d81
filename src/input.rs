//! Input model: canvas points and the input sources the toolkit listens to.

/// A point in canvas space (CSS pixels, origin at the top-left of the surface).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Raw input streams the toolkit can be told to listen to on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Mouse,
    Touch,
    MouseWheel,
    Keyboard,
}

impl InputSource {
    /// Every source, in the order they are enabled on a fresh surface.
    pub const ALL: [InputSource; 4] = [Self::Mouse, Self::Touch, Self::MouseWheel, Self::Keyboard];

    /// Name of the toolkit's input module for this source.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mouse => "mouseInput",
            Self::Touch => "touchInput",
            Self::MouseWheel => "mouseWheelInput",
            Self::Keyboard => "keyboardInput",
        }
    }
}
