use std::collections::{BTreeMap, BTreeSet};

use foundation::tile::TileAddress;

use crate::batch::BatchGeometry;
use crate::surface::{BatchId, BatchStyle, RenderSurface};

/// Display zoom below which building batches are hidden regardless of the
/// layer toggle; at that scale they are meaningless clutter.
pub const MIN_VISIBLE_ZOOM: f64 = 8.0;

/// Tracks which tiles currently have a batch attached to the render
/// surface, and applies the visibility policy.
///
/// Visibility is independent of data residency: toggling the layer off
/// hides every batch without discarding it, and re-enabling is a show
/// transition, not a resubmission.
#[derive(Debug)]
pub struct TileRenderCache {
    attached: BTreeMap<TileAddress, AttachedBatch>,
    layer_enabled: bool,
    display_zoom: f64,
    min_visible_zoom: f64,
}

#[derive(Debug)]
struct AttachedBatch {
    id: BatchId,
    feature_count: usize,
}

impl TileRenderCache {
    pub fn new() -> Self {
        Self {
            attached: BTreeMap::new(),
            layer_enabled: true,
            display_zoom: MIN_VISIBLE_ZOOM,
            min_visible_zoom: MIN_VISIBLE_ZOOM,
        }
    }

    fn effective_visible(&self) -> bool {
        self.layer_enabled && self.display_zoom >= self.min_visible_zoom
    }

    pub fn is_visible(&self) -> bool {
        self.effective_visible()
    }

    pub fn is_attached(&self, address: TileAddress) -> bool {
        self.attached.contains_key(&address)
    }

    pub fn attached_addresses(&self) -> BTreeSet<TileAddress> {
        self.attached.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.attached.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attached.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.attached.values().map(|b| b.feature_count).sum()
    }

    /// Submits a batch for a tile, replacing (and detaching) any batch the
    /// tile already had: one batch per address at all times.
    pub fn attach(
        &mut self,
        surface: &mut dyn RenderSurface,
        geometry: &BatchGeometry,
        style: &BatchStyle,
    ) {
        if let Some(old) = self.attached.remove(&geometry.address) {
            surface.remove(old.id);
        }
        let id = surface.submit_batch(geometry, style);
        surface.set_visible(id, self.effective_visible());
        self.attached.insert(
            geometry.address,
            AttachedBatch {
                id,
                feature_count: geometry.feature_count,
            },
        );
    }

    /// Detaches the tile's batch from the surface before dropping the
    /// entry, so scene resources are never leaked.
    pub fn detach(&mut self, surface: &mut dyn RenderSurface, address: TileAddress) -> bool {
        match self.attached.remove(&address) {
            Some(batch) => {
                surface.remove(batch.id);
                true
            }
            None => false,
        }
    }

    pub fn set_layer_enabled(&mut self, surface: &mut dyn RenderSurface, enabled: bool) {
        if self.layer_enabled != enabled {
            self.layer_enabled = enabled;
            self.apply_visibility(surface);
        }
    }

    pub fn set_display_zoom(&mut self, surface: &mut dyn RenderSurface, zoom: f64) {
        let was = self.effective_visible();
        self.display_zoom = zoom;
        if was != self.effective_visible() {
            self.apply_visibility(surface);
        }
    }

    pub fn clear(&mut self, surface: &mut dyn RenderSurface) {
        for (_, batch) in std::mem::take(&mut self.attached) {
            surface.remove(batch.id);
        }
    }

    fn apply_visibility(&mut self, surface: &mut dyn RenderSurface) {
        let visible = self.effective_visible();
        for batch in self.attached.values() {
            surface.set_visible(batch.id, visible);
        }
    }
}

impl Default for TileRenderCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use foundation::tile::TileAddress;

    use super::TileRenderCache;
    use crate::batch::BatchGeometry;
    use crate::surface::{BatchStyle, RecordingSurface};

    fn geometry(address: TileAddress) -> BatchGeometry {
        BatchGeometry {
            address,
            positions: vec![0.0; 9],
            indices: vec![0, 1, 2],
            feature_count: 1,
            skipped: 0,
        }
    }

    #[test]
    fn one_batch_per_address() {
        let mut surface = RecordingSurface::new();
        let mut cache = TileRenderCache::new();
        let addr = TileAddress::new(15, 1, 1);

        cache.attach(&mut surface, &geometry(addr), &BatchStyle::default());
        cache.attach(&mut surface, &geometry(addr), &BatchStyle::default());

        assert_eq!(cache.len(), 1);
        assert_eq!(surface.live_batches(), 1);
    }

    #[test]
    fn visibility_toggle_never_resubmits() {
        let mut surface = RecordingSurface::new();
        let mut cache = TileRenderCache::new();
        cache.set_display_zoom(&mut surface, 13.0);

        cache.attach(
            &mut surface,
            &geometry(TileAddress::new(15, 1, 1)),
            &BatchStyle::default(),
        );
        cache.attach(
            &mut surface,
            &geometry(TileAddress::new(15, 2, 1)),
            &BatchStyle::default(),
        );
        assert_eq!(surface.submit_count(), 2);

        cache.set_layer_enabled(&mut surface, false);
        cache.set_layer_enabled(&mut surface, true);
        cache.set_display_zoom(&mut surface, 5.0);
        cache.set_display_zoom(&mut surface, 14.0);

        assert_eq!(surface.submit_count(), 2);
        assert_eq!(surface.live_batches(), 2);
    }

    #[test]
    fn zoom_gate_hides_batches() {
        let mut surface = RecordingSurface::new();
        let mut cache = TileRenderCache::new();
        cache.set_display_zoom(&mut surface, 13.0);

        let addr = TileAddress::new(15, 1, 1);
        cache.attach(&mut surface, &geometry(addr), &BatchStyle::default());
        assert!(cache.is_visible());

        cache.set_display_zoom(&mut surface, 7.9);
        assert!(!cache.is_visible());

        // Layer toggle alone cannot win against the zoom gate.
        cache.set_layer_enabled(&mut surface, false);
        cache.set_layer_enabled(&mut surface, true);
        assert!(!cache.is_visible());

        cache.set_display_zoom(&mut surface, 8.0);
        assert!(cache.is_visible());
    }

    #[test]
    fn layer_off_keeps_batches_resident() {
        let mut surface = RecordingSurface::new();
        let mut cache = TileRenderCache::new();
        cache.set_display_zoom(&mut surface, 13.0);

        let addr = TileAddress::new(15, 1, 1);
        cache.attach(&mut surface, &geometry(addr), &BatchStyle::default());
        cache.set_layer_enabled(&mut surface, false);

        assert!(cache.is_attached(addr));
        assert_eq!(surface.live_batches(), 1);
    }

    #[test]
    fn detach_releases_surface_resources() {
        let mut surface = RecordingSurface::new();
        let mut cache = TileRenderCache::new();
        let addr = TileAddress::new(15, 1, 1);

        cache.attach(&mut surface, &geometry(addr), &BatchStyle::default());
        assert!(cache.detach(&mut surface, addr));
        assert!(!cache.detach(&mut surface, addr));
        assert_eq!(surface.live_batches(), 0);
        assert!(cache.is_empty());
    }
}
