//! Active-tool controller: exactly one interactive tool per surface.

#[cfg(test)]
#[path = "controller_test.rs"]
mod controller_test;

use std::rc::Rc;

use tracing::{debug, info};

use crate::error::ViewerError;
use crate::tool::{ButtonMask, DeviceClass, ToolKind, ToolVariant};
use crate::toolkit::ToolLibrary;

/// The tool currently bound to the primary button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveTool {
    pub kind: ToolKind,
    pub variant: ToolVariant,
}

/// Switches the primary-button tool of one surface.
pub struct ToolController {
    toolkit: Rc<dyn ToolLibrary>,
    device: DeviceClass,
    active: Option<ActiveTool>,
}

impl ToolController {
    /// `device` is fixed for the controller's lifetime.
    #[must_use]
    pub fn new(toolkit: Rc<dyn ToolLibrary>, device: DeviceClass) -> Self {
        Self { toolkit, device, active: None }
    }

    /// Make `tool` the active tool, deactivating the previous one first.
    ///
    /// `None` (an unbound selector) is a no-op. Returns the toolkit variant
    /// that was activated.
    ///
    /// # Errors
    ///
    /// `ToolNotFound` if the toolkit lacks the variant. If the previous tool
    /// could not be deactivated it stays active; if the new one could not be
    /// activated no tool is active.
    pub fn activate(&mut self, tool: Option<ToolKind>) -> Result<Option<ToolVariant>, ViewerError> {
        let Some(kind) = tool else {
            debug!("activate called without a tool; ignoring");
            return Ok(None);
        };

        if let Some(previous) = self.active {
            self.toolkit.deactivate(previous.variant, ButtonMask::LEFT)?;
            self.active = None;
        }

        let variant = self.device.variant_for(kind);
        self.toolkit.activate(variant, ButtonMask::LEFT)?;
        self.active = Some(ActiveTool { kind, variant });

        info!(tool = %variant, "tool activated");
        Ok(Some(variant))
    }

    /// Activate by tool-selector identifier. An empty identifier is a no-op.
    ///
    /// # Errors
    ///
    /// `ToolNotFound` for an unknown identifier, otherwise as [`Self::activate`].
    pub fn activate_named(&mut self, name: &str) -> Result<Option<ToolVariant>, ViewerError> {
        let name = name.trim();
        if name.is_empty() {
            return self.activate(None);
        }
        let kind = name.parse::<ToolKind>()?;
        self.activate(Some(kind))
    }

    /// Deactivate `kind` on the toolkit. Does not change which tool is recorded active.
    ///
    /// # Errors
    ///
    /// `ToolNotFound` if the toolkit lacks the variant.
    pub fn deactivate(&self, kind: ToolKind) -> Result<(), ViewerError> {
        let variant = self.device.variant_for(kind);
        self.toolkit.deactivate(variant, ButtonMask::LEFT)?;
        debug!(tool = %variant, "tool deactivated");
        Ok(())
    }

    /// Deactivate the active tool, if any, and forget it.
    ///
    /// # Errors
    ///
    /// `ToolNotFound` if the toolkit lacks the variant; the tool stays recorded.
    pub fn deactivate_active(&mut self) -> Result<(), ViewerError> {
        if let Some(active) = self.active {
            self.toolkit.deactivate(active.variant, ButtonMask::LEFT)?;
            self.active = None;
            debug!(tool = %active.variant, "active tool cleared");
        }
        Ok(())
    }

    // --- Queries ---

    #[must_use]
    pub fn active(&self) -> Option<ActiveTool> {
        self.active
    }

    #[must_use]
    pub fn active_kind(&self) -> Option<ToolKind> {
        self.active.map(|a| a.kind)
    }

    #[must_use]
    pub fn device(&self) -> DeviceClass {
        self.device
    }
}
