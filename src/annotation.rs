//! Annotation model: records, per-image buckets, and the store capability.
//!
//! Annotations are created and edited by the external toolkit; this crate
//! only reads them and selectively deletes them. They are grouped first by
//! image id and then by tool kind, and each bucket keeps insertion order
//! (oldest first), which the measurement cap relies on for FIFO eviction.
//!
//! `AnnotationStore` is the seam to whoever owns that state. Implementations
//! only need `snapshot` and `restore`; everything else has a default built on
//! `transact`, which is the one place a read-modify-write happens.

#[cfg(test)]
#[path = "annotation_test.rs"]
mod annotation_test;

use std::cell::RefCell;
use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::tool::ToolKind;

/// Identifier of an image as understood by the rendering surface.
pub type ImageId = String;

/// Unique identifier for an annotation.
pub type AnnotationId = Uuid;

/// A single annotation drawn by the toolkit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireAnnotation")]
pub struct Annotation {
    /// Unique identifier for this annotation.
    pub id: AnnotationId,
    /// Toolkit-owned geometry (handles, cached stats, ...).
    pub geometry: Value,
    /// Free-text label, e.g. the lesion location of a bidirectional measurement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Annotation {
    /// Create an unlabeled annotation with a fresh id.
    #[must_use]
    pub fn new(geometry: Value) -> Self {
        Self { id: Uuid::new_v4(), geometry, label: None }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Whether a non-empty label is attached.
    #[must_use]
    pub fn has_label(&self) -> bool {
        self.label.as_deref().is_some_and(|l| !l.is_empty())
    }
}

/// An annotation as the toolkit hands it over. The toolkit may name the
/// identifier `uuid` or leave it out entirely.
#[derive(Deserialize)]
struct WireAnnotation {
    #[serde(default, alias = "uuid")]
    id: Option<AnnotationId>,
    #[serde(default)]
    geometry: Value,
    #[serde(default)]
    label: Option<String>,
}

impl From<WireAnnotation> for Annotation {
    fn from(wire: WireAnnotation) -> Self {
        // Content-derived, so every snapshot of the same record agrees on it.
        let id = wire
            .id
            .unwrap_or_else(|| Uuid::new_v5(&Uuid::NAMESPACE_OID, wire.geometry.to_string().as_bytes()));
        Self { id, geometry: wire.geometry, label: wire.label }
    }
}

/// Annotation buckets of one image, keyed by tool kind.
pub type ToolBuckets = BTreeMap<ToolKind, Vec<Annotation>>;

/// Everything stored for one image.
///
/// Buckets whose key is not a known tool kind, or whose contents do not parse
/// as annotations, are kept verbatim in `passthrough` and written back
/// unchanged, so one odd bucket never hides the rest of the image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageBuckets {
    known: ToolBuckets,
    passthrough: BTreeMap<String, Value>,
}

impl ImageBuckets {
    /// Raw buckets this crate could not interpret, by their original key.
    #[must_use]
    pub fn passthrough(&self) -> &BTreeMap<String, Value> {
        &self.passthrough
    }
}

impl Serialize for ImageBuckets {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.known.len() + self.passthrough.len()))?;
        for (kind, bucket) in &self.known {
            map.serialize_entry(kind.as_str(), bucket)?;
        }
        for (key, raw) in &self.passthrough {
            map.serialize_entry(key, raw)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ImageBuckets {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let mut buckets = Self::default();
        for (key, value) in raw {
            let Ok(kind) = key.parse::<ToolKind>() else {
                buckets.passthrough.insert(key, value);
                continue;
            };
            match serde_json::from_value::<Vec<Annotation>>(value.clone()) {
                Ok(bucket) => {
                    buckets.known.insert(kind, bucket);
                }
                Err(err) => {
                    warn!(kind = %key, error = %err, "annotation bucket kept unparsed");
                    buckets.passthrough.insert(key, value);
                }
            }
        }
        Ok(buckets)
    }
}

/// All annotations known to the store: image id → tool kind → bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationBucketMap {
    images: BTreeMap<ImageId, ImageBuckets>,
}

impl AnnotationBucketMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The bucket for `(image_id, kind)`. Missing buckets read as empty.
    #[must_use]
    pub fn bucket(&self, image_id: &str, kind: ToolKind) -> &[Annotation] {
        self.images
            .get(image_id)
            .and_then(|buckets| buckets.known.get(&kind))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Mutable access to an existing bucket.
    pub fn bucket_mut(&mut self, image_id: &str, kind: ToolKind) -> Option<&mut Vec<Annotation>> {
        self.images.get_mut(image_id)?.known.get_mut(&kind)
    }

    /// Append an annotation, creating the bucket if needed.
    pub fn push(&mut self, image_id: impl Into<ImageId>, kind: ToolKind, annotation: Annotation) {
        self.images
            .entry(image_id.into())
            .or_default()
            .known
            .entry(kind)
            .or_default()
            .push(annotation);
    }

    /// Drop a whole bucket, returning it if it existed. An unparsed bucket
    /// under the same kind is dropped too and reads back as empty.
    pub fn remove_bucket(&mut self, image_id: &str, kind: ToolKind) -> Option<Vec<Annotation>> {
        let buckets = self.images.get_mut(image_id)?;
        let raw = buckets.passthrough.remove(kind.as_str());
        buckets.known.remove(&kind).or_else(|| raw.map(|_| Vec::new()))
    }

    /// Remove one annotation by id, preserving the order of the rest.
    pub fn remove_annotation(&mut self, image_id: &str, kind: ToolKind, id: AnnotationId) -> Option<Annotation> {
        let bucket = self.bucket_mut(image_id, kind)?;
        let index = bucket.iter().position(|a| a.id == id)?;
        Some(bucket.remove(index))
    }

    /// Find an annotation by id within a bucket.
    #[must_use]
    pub fn find(&self, image_id: &str, kind: ToolKind, id: AnnotationId) -> Option<&Annotation> {
        self.bucket(image_id, kind).iter().find(|a| a.id == id)
    }

    /// Image ids that have at least one bucket entry in the map.
    pub fn image_ids(&self) -> impl Iterator<Item = &ImageId> {
        self.images.keys()
    }

    /// Whether `(image_id, kind)` has a bucket, even an empty one.
    #[must_use]
    pub fn has_bucket(&self, image_id: &str, kind: ToolKind) -> bool {
        self.images.get(image_id).is_some_and(|buckets| {
            buckets.known.contains_key(&kind) || buckets.passthrough.contains_key(kind.as_str())
        })
    }

    /// Total number of annotations across every image and kind.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images
            .values()
            .flat_map(|buckets| buckets.known.values())
            .map(Vec::len)
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Everything stored for one image, including unparsed buckets.
    #[must_use]
    pub fn image(&self, image_id: &str) -> Option<&ImageBuckets> {
        self.images.get(image_id)
    }

    /// Parse a snapshot serialized by the host toolkit.
    ///
    /// Parsing is per bucket: unknown kinds and malformed buckets are kept
    /// as raw JSON rather than failing the whole snapshot.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the payload is not an object of per-image
    /// objects.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Serialize for handing back to the host toolkit.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if a geometry payload cannot be serialized.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// =============================================================================
// STORE CAPABILITY
// =============================================================================

/// Access to the toolkit's annotation state.
///
/// All calls happen on the single UI thread, so `transact` needs no locking
/// here. A host that shares one store between threads must make `transact`
/// atomic (lock or compare-and-swap around snapshot → mutate → restore).
pub trait AnnotationStore {
    /// Copy of the entire state.
    fn snapshot(&self) -> AnnotationBucketMap;

    /// Replace the entire state.
    fn restore(&self, snapshot: AnnotationBucketMap);

    /// Run one read-modify-write over the entire state.
    fn transact(&self, f: &mut dyn FnMut(&mut AnnotationBucketMap)) {
        let mut snapshot = self.snapshot();
        f(&mut snapshot);
        self.restore(snapshot);
    }

    /// Ordered copy of one bucket.
    fn bucket(&self, image_id: &str, kind: ToolKind) -> Vec<Annotation> {
        self.snapshot().bucket(image_id, kind).to_vec()
    }

    /// Remove one annotation; returns whether it was present.
    fn remove(&self, image_id: &str, kind: ToolKind, id: AnnotationId) -> bool {
        let mut removed = false;
        self.transact(&mut |state| {
            removed = state.remove_annotation(image_id, kind, id).is_some();
        });
        removed
    }

    /// Drop the bucket for `(image_id, kind)`.
    fn clear(&self, image_id: &str, kind: ToolKind) {
        self.transact(&mut |state| {
            state.remove_bucket(image_id, kind);
        });
    }
}

/// Annotation store kept on the Rust side of the host.
#[derive(Debug, Default)]
pub struct MemoryAnnotationStore {
    state: RefCell<AnnotationBucketMap>,
}

impl MemoryAnnotationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an annotation the toolkit just drew.
    pub fn insert(&self, image_id: impl Into<ImageId>, kind: ToolKind, annotation: Annotation) {
        self.state.borrow_mut().push(image_id, kind, annotation);
    }

    /// Set or replace the label of an annotation. Returns false if it doesn't exist.
    pub fn set_label(&self, image_id: &str, kind: ToolKind, id: AnnotationId, label: impl Into<String>) -> bool {
        let mut state = self.state.borrow_mut();
        let Some(annotation) = state
            .bucket_mut(image_id, kind)
            .and_then(|bucket| bucket.iter_mut().find(|a| a.id == id))
        else {
            return false;
        };
        annotation.label = Some(label.into());
        true
    }
}

impl AnnotationStore for MemoryAnnotationStore {
    fn snapshot(&self) -> AnnotationBucketMap {
        self.state.borrow().clone()
    }

    fn restore(&self, snapshot: AnnotationBucketMap) {
        *self.state.borrow_mut() = snapshot;
    }

    fn transact(&self, f: &mut dyn FnMut(&mut AnnotationBucketMap)) {
        f(&mut self.state.borrow_mut());
    }

    fn bucket(&self, image_id: &str, kind: ToolKind) -> Vec<Annotation> {
        self.state.borrow().bucket(image_id, kind).to_vec()
    }
}
