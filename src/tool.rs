//! Tool model: tool kinds, device classes, and the concrete toolkit variants.
//!
//! A `ToolKind` is what the user picks in the tool selector. The toolkit,
//! however, registers separate entry points per input device (a mouse
//! "length" tool, a touch "lengthTouch" tool, a "wwwcTouchDrag" tool, ...).
//! `DeviceClass::variant_for` is the single, enumerated mapping from the
//! former to the latter; nothing in the crate builds toolkit names by hand.

#[cfg(test)]
#[path = "tool_test.rs"]
mod tool_test;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::TOUCH_USER_AGENTS;
use crate::error::ToolkitError;

/// A user-selectable interaction tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolKind {
    /// Window width / window center (contrast) adjustment.
    Wwwc,
    /// Drag to pan the image.
    Pan,
    /// Drag to zoom the image.
    Zoom,
    /// Drag to scroll through the stack.
    StackScroll,
    /// Two-point length measurement.
    Length,
    /// Three-point angle measurement.
    Angle,
    /// Single-pixel value probe.
    Probe,
    /// Elliptical region of interest.
    EllipticalRoi,
    /// Rectangular region of interest.
    RectangleRoi,
    /// Long-axis / short-axis measurement with a location label.
    Bidirectional,
    /// Free-form arrow with a text annotation.
    ArrowAnnotate,
}

impl ToolKind {
    /// Every tool kind, in selector order.
    pub const ALL: [ToolKind; 11] = [
        Self::Wwwc,
        Self::Pan,
        Self::Zoom,
        Self::StackScroll,
        Self::Length,
        Self::Angle,
        Self::Probe,
        Self::EllipticalRoi,
        Self::RectangleRoi,
        Self::Bidirectional,
        Self::ArrowAnnotate,
    ];

    /// Identifier carried by tool-selector elements and used as the toolkit's base name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wwwc => "wwwc",
            Self::Pan => "pan",
            Self::Zoom => "zoom",
            Self::StackScroll => "stackScroll",
            Self::Length => "length",
            Self::Angle => "angle",
            Self::Probe => "probe",
            Self::EllipticalRoi => "ellipticalRoi",
            Self::RectangleRoi => "rectangleRoi",
            Self::Bidirectional => "bidirectional",
            Self::ArrowAnnotate => "arrowAnnotate",
        }
    }

    /// Whether the tool acts on the whole image while dragging instead of
    /// drawing an annotation.
    #[must_use]
    pub const fn is_drag(self) -> bool {
        matches!(self, Self::Wwwc | Self::Pan | Self::Zoom | Self::StackScroll)
    }

    /// Whether the tool leaves annotations in the store.
    #[must_use]
    pub const fn is_annotation(self) -> bool {
        !self.is_drag()
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolKind {
    type Err = ToolkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ToolkitError::ToolNotFound(s.to_string()))
    }
}

/// Input device class of the host, decided once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceClass {
    #[default]
    Mouse,
    Touch,
}

impl DeviceClass {
    /// Classify a browser user-agent string.
    #[must_use]
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        if TOUCH_USER_AGENTS.iter().any(|needle| ua.contains(needle)) {
            Self::Touch
        } else {
            Self::Mouse
        }
    }

    /// Resolve a selectable tool to the toolkit variant for this device.
    ///
    /// On touch, drag tools map to `<tool>TouchDrag` and annotation tools to
    /// their single-touch `<tool>Touch` entry point.
    #[must_use]
    pub fn variant_for(self, kind: ToolKind) -> ToolVariant {
        match self {
            Self::Mouse => ToolVariant::Mouse(kind),
            Self::Touch if kind.is_drag() => ToolVariant::TouchDrag(kind),
            Self::Touch => ToolVariant::Touch(kind),
        }
    }
}

/// A concrete toolkit entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolVariant {
    /// Mouse/pointer variant, registered under the tool's base name.
    Mouse(ToolKind),
    /// Single-finger drag variant of a drag tool.
    TouchDrag(ToolKind),
    /// Touch variant of an annotation tool.
    Touch(ToolKind),
    /// Pinch to zoom.
    ZoomTouchPinch,
    /// Two-finger pan.
    PanMultiTouch,
    /// Three-or-more finger stack scroll.
    StackScrollMultiTouch,
    /// Mouse wheel stack scroll.
    StackScrollWheel,
    /// Arrow-key stack scroll.
    StackScrollKeyboard,
}

impl ToolVariant {
    /// Name under which the toolkit registers this entry point.
    #[must_use]
    pub fn name(self) -> String {
        match self {
            Self::Mouse(kind) => kind.as_str().to_string(),
            Self::TouchDrag(kind) => format!("{kind}TouchDrag"),
            Self::Touch(kind) => format!("{kind}Touch"),
            Self::ZoomTouchPinch => "zoomTouchPinch".into(),
            Self::PanMultiTouch => "panMultiTouch".into(),
            Self::StackScrollMultiTouch => "stackScrollMultiTouch".into(),
            Self::StackScrollWheel => "stackScrollWheel".into(),
            Self::StackScrollKeyboard => "stackScrollKeyboard".into(),
        }
    }

    /// The selectable tool behind this variant, if it is one.
    #[must_use]
    pub fn kind(self) -> Option<ToolKind> {
        match self {
            Self::Mouse(kind) | Self::TouchDrag(kind) | Self::Touch(kind) => Some(kind),
            _ => None,
        }
    }
}

impl fmt::Display for ToolVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Mouse buttons a tool is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonMask(pub u8);

impl ButtonMask {
    /// Gesture and wheel tools are not bound to a button.
    pub const NONE: Self = Self(0);
    pub const LEFT: Self = Self(1);
    pub const MIDDLE: Self = Self(2);
    pub const RIGHT: Self = Self(4);

    #[must_use]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for ButtonMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}
