//! Render surface capability interface.
//!
//! The core never depends on a concrete rendering engine; everything it
//! needs from one is "submit an aggregate geometry, toggle its visibility,
//! remove it". Visibility changes must never require resubmission.

use std::collections::BTreeMap;

use crate::batch::BatchGeometry;

/// Opaque handle to a submitted batch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BatchId(pub u64);

/// Style applied uniformly to one batch.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BatchStyle {
    pub color: [f32; 4],
}

impl Default for BatchStyle {
    fn default() -> Self {
        Self {
            color: [0.72, 0.72, 0.78, 1.0],
        }
    }
}

pub trait RenderSurface {
    /// Submits one aggregate geometry and returns its handle. Batches are
    /// submitted visible.
    fn submit_batch(&mut self, geometry: &BatchGeometry, style: &BatchStyle) -> BatchId;

    /// Show/hide transition on an existing batch; no geometry transfer.
    fn set_visible(&mut self, id: BatchId, visible: bool);

    /// Detaches the batch and releases its resources.
    fn remove(&mut self, id: BatchId);
}

/// In-memory surface for tests: records submissions, visibility, and
/// removals so callers can assert on exactly what reached the engine.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    next_id: u64,
    submit_count: u32,
    batches: BTreeMap<BatchId, RecordedBatch>,
}

#[derive(Debug)]
pub struct RecordedBatch {
    pub triangle_count: usize,
    pub visible: bool,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of geometry submissions ever made.
    pub fn submit_count(&self) -> u32 {
        self.submit_count
    }

    pub fn live_batches(&self) -> usize {
        self.batches.len()
    }

    pub fn is_visible(&self, id: BatchId) -> Option<bool> {
        self.batches.get(&id).map(|b| b.visible)
    }

    pub fn batch(&self, id: BatchId) -> Option<&RecordedBatch> {
        self.batches.get(&id)
    }
}

impl RenderSurface for RecordingSurface {
    fn submit_batch(&mut self, geometry: &BatchGeometry, _style: &BatchStyle) -> BatchId {
        let id = BatchId(self.next_id);
        self.next_id += 1;
        self.submit_count += 1;
        self.batches.insert(
            id,
            RecordedBatch {
                triangle_count: geometry.indices.len() / 3,
                visible: true,
            },
        );
        id
    }

    fn set_visible(&mut self, id: BatchId, visible: bool) {
        if let Some(batch) = self.batches.get_mut(&id) {
            batch.visible = visible;
        }
    }

    fn remove(&mut self, id: BatchId) {
        self.batches.remove(&id);
    }
}
