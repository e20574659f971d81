//! Context menu for the measurement under the pointer.
//!
//! DESIGN
//! ======
//! Building a menu is a pure read: locate the nearest candidate annotation
//! and describe what can be done with it. Choosing an item takes the menu by
//! value, so a menu can act at most once. The host's close callback runs
//! after the action whether or not the action succeeded.

#[cfg(test)]
#[path = "menu_test.rs"]
mod menu_test;

use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::annotation::AnnotationStore;
use crate::error::ViewerError;
use crate::input::Point;
use crate::locator::{Locator, NearbyToolMatch};
use crate::tool::ToolKind;
use crate::toolkit::{LabelCaptureOptions, RenderingSurface, ToolLibrary};

// =============================================================================
// TYPES
// =============================================================================

/// Effect of a menu entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Remove the annotation from its bucket.
    Delete,
    /// Open the toolkit's label prompt for the annotation.
    EditLabel,
}

/// One clickable entry bound to the annotation it acts on.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    pub action: MenuAction,
    pub text: String,
    pub target: NearbyToolMatch,
}

/// A menu ready to render at `position` (canvas coordinates).
#[derive(Debug, Clone, PartialEq)]
pub struct ContextMenu {
    pub position: Point,
    pub items: Vec<MenuItem>,
}

impl ContextMenu {
    /// Entry texts in display order.
    #[must_use]
    pub fn texts(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.text.as_str()).collect()
    }
}

fn items_for(target: &NearbyToolMatch) -> Vec<MenuItem> {
    let mut items = vec![MenuItem {
        action: MenuAction::Delete,
        text: "Delete measurement".to_string(),
        target: target.clone(),
    }];
    if target.kind == ToolKind::Bidirectional {
        let verb = if target.annotation.has_label() { "Edit" } else { "Add" };
        items.push(MenuItem {
            action: MenuAction::EditLabel,
            text: format!("{verb} Label"),
            target: target.clone(),
        });
    }
    items
}

// =============================================================================
// PRESENTER
// =============================================================================

/// Builds context menus for one surface and carries out the chosen entry.
pub struct ContextMenuPresenter {
    locator: Locator,
    store: Rc<dyn AnnotationStore>,
    surface: Rc<dyn RenderingSurface>,
    toolkit: Rc<dyn ToolLibrary>,
    candidates: Vec<ToolKind>,
}

impl ContextMenuPresenter {
    /// `candidates` is the kind order the locator scans.
    #[must_use]
    pub fn new(
        locator: Locator,
        store: Rc<dyn AnnotationStore>,
        surface: Rc<dyn RenderingSurface>,
        toolkit: Rc<dyn ToolLibrary>,
        candidates: Vec<ToolKind>,
    ) -> Self {
        Self { locator, store, surface, toolkit, candidates }
    }

    #[must_use]
    pub fn candidates(&self) -> &[ToolKind] {
        &self.candidates
    }

    /// Menu for a right-click or long-press at `pointer`. `None` means nothing
    /// to show.
    ///
    /// Touch presses on an arrow annotation get no menu; that tool has its
    /// own press-to-edit handle.
    ///
    /// # Errors
    ///
    /// `NoImageDisplayed` when the surface is empty, or `ToolNotFound` from
    /// the locator.
    pub fn build_menu(&self, pointer: Point, is_touch: bool) -> Result<Option<ContextMenu>, ViewerError> {
        let image_id = self.surface.current_image_id().ok_or(ViewerError::NoImageDisplayed)?;
        let Some(target) = self.locator.find_nearby(&image_id, pointer, &self.candidates)? else {
            debug!(%image_id, x = pointer.x, y = pointer.y, "no annotation near pointer");
            return Ok(None);
        };
        if is_touch && target.kind == ToolKind::ArrowAnnotate {
            debug!(%image_id, "touch press on arrow annotation; menu suppressed");
            return Ok(None);
        }
        Ok(Some(ContextMenu { position: pointer, items: items_for(&target) }))
    }

    /// Run entry `index` of `menu`, then `on_close`. Returns the action that
    /// ran, or `None` for an index past the end.
    ///
    /// # Errors
    ///
    /// `ToolNotFound` if the toolkit has no label prompt for the kind.
    /// `on_close` still runs.
    pub fn choose(
        &self,
        menu: ContextMenu,
        index: usize,
        on_close: impl FnOnce(),
    ) -> Result<Option<MenuAction>, ViewerError> {
        let result = match menu.items.into_iter().nth(index) {
            Some(item) => self.apply(item).map(Some),
            None => Ok(None),
        };
        on_close();
        result
    }

    fn apply(&self, item: MenuItem) -> Result<MenuAction, ViewerError> {
        let NearbyToolMatch { image_id, kind, annotation, .. } = item.target;
        match item.action {
            MenuAction::Delete => {
                if self.store.remove(&image_id, kind, annotation.id) {
                    info!(%image_id, %kind, id = %annotation.id, "measurement deleted");
                } else {
                    warn!(%image_id, %kind, id = %annotation.id, "measurement already gone");
                }
                self.surface.update_image();
            }
            MenuAction::EditLabel => {
                let surface = Rc::clone(&self.surface);
                self.toolkit.capture_label(
                    kind,
                    &annotation,
                    LabelCaptureOptions { skip_button: true },
                    Box::new(move || surface.update_image()),
                )?;
                debug!(%image_id, %kind, id = %annotation.id, "label prompt opened");
            }
        }
        Ok(item.action)
    }
}
