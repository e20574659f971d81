//! Measurement cap: at most N (normally one) measurements of a kind, and only
//! on the displayed image.
//!
//! DESIGN
//! ======
//! Runs on every "annotation added" notification for the capped kind. The
//! whole sweep happens inside one `AnnotationStore::transact`:
//! - every other image loses its bucket for the kind entirely;
//! - the displayed image's bucket drops its oldest entries until it fits.
//!
//! Missing buckets count as already empty, so a sparse store never aborts
//! the sweep.

#[cfg(test)]
#[path = "policy_test.rs"]
mod policy_test;

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::annotation::{AnnotationBucketMap, AnnotationId, AnnotationStore, ImageId};
use crate::consts::MAX_LENGTH_MEASUREMENTS;
use crate::events::SurfaceEvent;
use crate::tool::ToolKind;
use crate::toolkit::RenderingSurface;

/// Which kind is capped, and to how many per image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementCap {
    pub kind: ToolKind,
    pub max_per_image: usize,
}

impl Default for MeasurementCap {
    fn default() -> Self {
        Self { kind: ToolKind::Length, max_per_image: MAX_LENGTH_MEASUREMENTS }
    }
}

/// What one enforcement pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapReport {
    /// Images whose bucket for the capped kind was dropped.
    pub purged_images: Vec<ImageId>,
    /// Annotations evicted from the displayed image, oldest first.
    pub evicted: Vec<AnnotationId>,
}

impl CapReport {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.purged_images.is_empty() && self.evicted.is_empty()
    }
}

impl MeasurementCap {
    /// Apply the cap to a snapshot, keeping `current_image_id` as the only
    /// image with measurements of this kind.
    pub fn enforce(&self, state: &mut AnnotationBucketMap, current_image_id: &str) -> CapReport {
        let others: Vec<ImageId> = state
            .image_ids()
            .filter(|id| id.as_str() != current_image_id)
            .cloned()
            .collect();

        let mut report = CapReport::default();
        for image_id in others {
            if state.remove_bucket(&image_id, self.kind).is_some() {
                report.purged_images.push(image_id);
            }
        }

        if let Some(bucket) = state.bucket_mut(current_image_id, self.kind) {
            let excess = bucket.len().saturating_sub(self.max_per_image);
            report.evicted = bucket.drain(..excess).map(|a| a.id).collect();
        }
        report
    }
}

/// Listens for new measurements and trims the store to the cap.
pub struct MeasurementCapPolicy {
    cap: MeasurementCap,
    store: Rc<dyn AnnotationStore>,
    surface: Rc<dyn RenderingSurface>,
}

impl MeasurementCapPolicy {
    #[must_use]
    pub fn new(cap: MeasurementCap, store: Rc<dyn AnnotationStore>, surface: Rc<dyn RenderingSurface>) -> Self {
        Self { cap, store, surface }
    }

    #[must_use]
    pub fn cap(&self) -> MeasurementCap {
        self.cap
    }

    /// Handle a surface notification. Returns `None` when the event is not an
    /// addition of the capped kind or no image is displayed.
    pub fn handle(&self, event: &SurfaceEvent) -> Option<CapReport> {
        let SurfaceEvent::AnnotationAdded { kind } = event else {
            return None;
        };
        if *kind != self.cap.kind {
            return None;
        }
        let Some(current) = self.surface.current_image_id() else {
            warn!(kind = %self.cap.kind, "annotation added with no image displayed; cap not applied");
            return None;
        };
        Some(self.enforce_on(&current))
    }

    /// Enforce the cap with `current_image_id` as the displayed image and refresh.
    pub fn enforce_on(&self, current_image_id: &str) -> CapReport {
        let mut report = CapReport::default();
        self.store.transact(&mut |state| {
            report = self.cap.enforce(state, current_image_id);
        });
        self.surface.update_image();

        if report.is_noop() {
            debug!(kind = %self.cap.kind, image_id = current_image_id, "measurement within cap");
        } else {
            info!(
                kind = %self.cap.kind,
                image_id = current_image_id,
                purged_images = report.purged_images.len(),
                evicted = report.evicted.len(),
                "measurement cap enforced"
            );
        }
        report
    }
}
