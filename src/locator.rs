//! Nearby-annotation lookup for context menus.
//!
//! Candidate kinds are scanned in the order given and each bucket in
//! insertion order; the first annotation whose hit test passes is returned.
//! There is no distance ranking: an earlier kind beats a closer annotation of
//! a later kind.

#[cfg(test)]
#[path = "locator_test.rs"]
mod locator_test;

use std::rc::Rc;

use tracing::trace;

use crate::annotation::{Annotation, AnnotationStore, ImageId};
use crate::error::ViewerError;
use crate::input::Point;
use crate::tool::ToolKind;
use crate::toolkit::HitTestTable;

/// An annotation under the pointer and where it lives in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyToolMatch {
    pub image_id: ImageId,
    pub kind: ToolKind,
    /// Position within the `(image_id, kind)` bucket.
    pub index: usize,
    pub annotation: Annotation,
}

/// Read-only view over the store plus the registered hit tests.
#[derive(Clone)]
pub struct Locator {
    store: Rc<dyn AnnotationStore>,
    hit_tests: Rc<HitTestTable>,
}

impl Locator {
    #[must_use]
    pub fn new(store: Rc<dyn AnnotationStore>, hit_tests: Rc<HitTestTable>) -> Self {
        Self { store, hit_tests }
    }

    /// First annotation of `candidates` on `image_id` within tolerance of `pointer`.
    ///
    /// # Errors
    ///
    /// `ToolNotFound` if a candidate kind with annotations has no hit test.
    pub fn find_nearby(
        &self,
        image_id: &str,
        pointer: Point,
        candidates: &[ToolKind],
    ) -> Result<Option<NearbyToolMatch>, ViewerError> {
        for &kind in candidates {
            let bucket = self.store.bucket(image_id, kind);
            for (index, annotation) in bucket.into_iter().enumerate() {
                if self.hit_tests.point_near(kind, &annotation, pointer)? {
                    trace!(%kind, index, "annotation near pointer");
                    return Ok(Some(NearbyToolMatch { image_id: image_id.to_string(), kind, index, annotation }));
                }
            }
        }
        Ok(None)
    }
}
