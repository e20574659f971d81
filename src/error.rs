//! Error types surfaced by the viewer core.
//!
//! DESIGN
//! ======
//! Toolkit and loader failures keep their own enums so fakes and bridges can
//! produce them without knowing about the viewer. `ViewerError` wraps both and
//! adds the failures the core itself detects. A locator miss is never an
//! error; it is `Ok(None)`.

use crate::annotation::ImageId;

// =============================================================================
// TOOLKIT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolkitError {
    #[error("tool not found: {0}")]
    ToolNotFound(String),
    #[error("toolkit rejected call: {0}")]
    Rejected(String),
}

// =============================================================================
// LOADER
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to load image {image_id}: {reason}")]
pub struct LoadError {
    pub image_id: ImageId,
    pub reason: String,
}

// =============================================================================
// VIEWER
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("tool not found: {0}")]
    ToolNotFound(String),
    #[error(transparent)]
    Toolkit(ToolkitError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("image stack must contain at least one image")]
    EmptyStack,
    #[error("no image is displayed on the surface")]
    NoImageDisplayed,
    #[error("invalid config: {0}")]
    Config(String),
}

impl From<ToolkitError> for ViewerError {
    fn from(err: ToolkitError) -> Self {
        match err {
            ToolkitError::ToolNotFound(name) => Self::ToolNotFound(name),
            other @ ToolkitError::Rejected(_) => Self::Toolkit(other),
        }
    }
}

impl From<serde_json::Error> for ViewerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl ViewerError {
    /// Stable code handed to the host alongside the message.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ToolNotFound(_) => "E_TOOL_NOT_FOUND",
            Self::Toolkit(_) => "E_TOOLKIT",
            Self::Load(_) => "E_LOAD_FAILURE",
            Self::EmptyStack => "E_EMPTY_STACK",
            Self::NoImageDisplayed => "E_NO_IMAGE",
            Self::Config(_) => "E_CONFIG",
        }
    }
}
