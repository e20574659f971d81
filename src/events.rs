//! Surface notifications and the keyed listener registry.
//!
//! Initialization can run many times over a surface's lifetime (every new
//! series re-runs it). Listeners are therefore registered under a fixed key,
//! and attaching under a key that is already taken replaces the old handler
//! instead of stacking a second one.

#[cfg(test)]
#[path = "events_test.rs"]
mod events_test;

use std::fmt;
use std::rc::Rc;

use crate::annotation::ImageId;
use crate::tool::ToolKind;

/// Notifications raised by the toolkit or the rendering surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// The toolkit finished drawing a new annotation.
    AnnotationAdded { kind: ToolKind },
    /// The surface now displays a different image.
    ImageChanged { image_id: ImageId },
}

/// Identity of a listener slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKey {
    MeasurementCap,
    SliderSync,
}

pub type Handler = Rc<dyn Fn(&SurfaceEvent)>;

/// Ordered set of event handlers, at most one per key.
#[derive(Default, Clone)]
pub struct Listeners {
    handlers: Vec<(ListenerKey, Handler)>,
}

impl Listeners {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `key`, detaching any handler already there.
    pub fn attach(&mut self, key: ListenerKey, handler: impl Fn(&SurfaceEvent) + 'static) {
        self.detach(key);
        self.handlers.push((key, Rc::new(handler)));
    }

    /// Remove the handler under `key`. Returns whether one was attached.
    pub fn detach(&mut self, key: ListenerKey) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(k, _)| *k != key);
        self.handlers.len() != before
    }

    /// Deliver `event` to every handler in attach order. Returns how many ran.
    pub fn emit(&self, event: &SurfaceEvent) -> usize {
        for (_, handler) in &self.handlers {
            handler(event);
        }
        self.handlers.len()
    }

    #[must_use]
    pub fn is_attached(&self, key: ListenerKey) -> bool {
        self.handlers.iter().any(|(k, _)| *k == key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<_> = self.handlers.iter().map(|(k, _)| k).collect();
        f.debug_struct("Listeners").field("keys", &keys).finish()
    }
}
