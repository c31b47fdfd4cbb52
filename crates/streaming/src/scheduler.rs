use std::collections::BTreeSet;

use foundation::geo::GeoPoint;
use foundation::tile::TileAddress;
use foundation::time::Time;

/// Tuning knobs for viewport-driven tile planning.
///
/// The defaults reproduce hand-tuned behavior from field use; they are
/// tunable parameters, not invariants. The only structural requirement is
/// `evict_distance` strictly greater than the largest ring radius, which
/// keeps the load/evict hysteresis band open.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Fixed level tile data is loaded at, independent of display zoom,
    /// so cache keys stay stable while the camera zooms.
    pub data_level: u8,
    /// Loaded tiles farther than this (Chebyshev) from the current center
    /// tile are evicted.
    pub evict_distance: u32,
    /// Small movements are ignored until this much time has passed since
    /// the last executed pass.
    pub settle_secs: f64,
    /// Movement at or below this many tile-widths counts as small.
    pub small_move_tiles: f64,
    /// Suggested re-plan cadence while the camera is in motion.
    pub pass_interval_secs: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            data_level: 15,
            evict_distance: 5,
            settle_secs: 2.0,
            small_move_tiles: 0.5,
            pass_interval_secs: 0.5,
        }
    }
}

/// Camera state the scheduler reads. Display zoom drives the ring radius;
/// the data level never follows it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraView {
    pub center: GeoPoint,
    pub display_zoom: f64,
}

/// One planning pass: tiles to load and tiles to evict, both in
/// deterministic order. Evictions are computed against the loaded set as it
/// was before this pass, so an address never appears in both lists.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PassPlan {
    pub load: Vec<TileAddress>,
    pub evict: Vec<TileAddress>,
}

impl PassPlan {
    pub fn is_noop(&self) -> bool {
        self.load.is_empty() && self.evict.is_empty()
    }
}

/// Ring radius from the display zoom: tighter rings when zoomed in.
pub fn ring_radius_for_zoom(display_zoom: f64) -> u32 {
    if display_zoom >= 15.0 {
        1
    } else if display_zoom >= 12.0 {
        2
    } else {
        3
    }
}

/// Plans tile loads and evictions from camera state.
///
/// Pure diffing over a caller-supplied loaded set; side effects (fetching,
/// detaching) happen at the caller. Time is injected so passes are
/// deterministic and replayable.
#[derive(Debug)]
pub struct ViewportScheduler {
    config: SchedulerConfig,
    last_pass: Option<LastPass>,
}

#[derive(Debug, Copy, Clone)]
struct LastPass {
    fx: f64,
    fy: f64,
    at: Time,
}

impl ViewportScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            last_pass: None,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(SchedulerConfig::default())
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Regular pass with movement gating: a drift at or below the
    /// small-move threshold is skipped until the settle interval has
    /// elapsed, which caps request rate during continuous dragging while
    /// still responding immediately to large jumps.
    pub fn plan(
        &mut self,
        view: &CameraView,
        loaded: &BTreeSet<TileAddress>,
        now: Time,
    ) -> PassPlan {
        let (fx, fy) = TileAddress::fractional_position(view.center, self.config.data_level);

        if let Some(last) = self.last_pass {
            let moved_tiles = (fx - last.fx).abs().max((fy - last.fy).abs());
            if moved_tiles <= self.config.small_move_tiles
                && now.elapsed_since(last.at) < self.config.settle_secs
            {
                return PassPlan::default();
            }
        }

        self.plan_settled(view, loaded, now)
    }

    /// Movement-end pass: bypasses gating so the final camera position
    /// always settles with a complete ring.
    pub fn plan_settled(
        &mut self,
        view: &CameraView,
        loaded: &BTreeSet<TileAddress>,
        now: Time,
    ) -> PassPlan {
        let level = self.config.data_level;
        let (fx, fy) = TileAddress::fractional_position(view.center, level);
        self.last_pass = Some(LastPass { fx, fy, at: now });

        let center = TileAddress::from_geo(view.center, level);
        let radius = ring_radius_for_zoom(view.display_zoom);

        let load: Vec<TileAddress> = center
            .surrounding(radius)
            .into_iter()
            .filter(|addr| !loaded.contains(addr))
            .collect();

        let evict: Vec<TileAddress> = loaded
            .iter()
            .filter(|addr| addr.chebyshev(&center) > self.config.evict_distance)
            .copied()
            .collect();

        PassPlan { load, evict }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use foundation::geo::GeoPoint;
    use foundation::tile::TileAddress;
    use foundation::time::Time;

    use super::{CameraView, PassPlan, SchedulerConfig, ViewportScheduler, ring_radius_for_zoom};

    fn scheduler_at_level(level: u8) -> ViewportScheduler {
        ViewportScheduler::new(SchedulerConfig {
            data_level: level,
            ..SchedulerConfig::default()
        })
    }

    fn view(lon: f64, lat: f64, zoom: f64) -> CameraView {
        CameraView {
            center: GeoPoint::new(lon, lat),
            display_zoom: zoom,
        }
    }

    #[test]
    fn radius_follows_display_zoom() {
        assert_eq!(ring_radius_for_zoom(16.0), 1);
        assert_eq!(ring_radius_for_zoom(15.0), 1);
        assert_eq!(ring_radius_for_zoom(13.0), 2);
        assert_eq!(ring_radius_for_zoom(12.0), 2);
        assert_eq!(ring_radius_for_zoom(11.9), 3);
        assert_eq!(ring_radius_for_zoom(5.0), 3);
    }

    #[test]
    fn fresh_viewport_loads_a_5x5_grid_at_zoom_13() {
        let mut scheduler = scheduler_at_level(13);
        let plan = scheduler.plan(&view(-73.0, 40.0, 13.0), &BTreeSet::new(), Time::ZERO);

        assert_eq!(plan.load.len(), 25);
        assert!(plan.evict.is_empty());

        let center = TileAddress::new(13, 2434, 3101);
        assert!(plan.load.iter().all(|t| center.chebyshev(t) <= 2));
        assert!(plan.load.contains(&center));
    }

    #[test]
    fn small_drift_within_settle_window_is_skipped() {
        let mut scheduler = scheduler_at_level(13);
        let first = view(-73.0, 40.0, 13.0);
        let plan = scheduler.plan(&first, &BTreeSet::new(), Time::ZERO);
        assert!(!plan.is_noop());

        // 0.2 tile-widths of longitude drift, 1 second later.
        let tile_width_deg = 360.0 / 8192.0;
        let drifted = view(-73.0 + 0.2 * tile_width_deg, 40.0, 13.0);
        let plan = scheduler.plan(&drifted, &BTreeSet::new(), Time::seconds(1.0));
        assert!(plan.is_noop(), "hysteresis should hold: {plan:?}");
    }

    #[test]
    fn large_jump_bypasses_the_gate() {
        let mut scheduler = scheduler_at_level(13);
        let first = view(-73.0, 40.0, 13.0);
        scheduler.plan(&first, &BTreeSet::new(), Time::ZERO);

        let tile_width_deg = 360.0 / 8192.0;
        let jumped = view(-73.0 + 0.6 * tile_width_deg, 40.0, 13.0);
        let plan = scheduler.plan(&jumped, &BTreeSet::new(), Time::seconds(0.5));
        assert!(!plan.is_noop());
    }

    #[test]
    fn unchanged_viewport_is_idempotent_after_settling() {
        let mut scheduler = scheduler_at_level(13);
        let v = view(-73.0, 40.0, 13.0);

        let first = scheduler.plan(&v, &BTreeSet::new(), Time::ZERO);
        let loaded: BTreeSet<TileAddress> = first.load.iter().copied().collect();

        // Past the settle window, so gating is no longer the reason the
        // pass is empty; the diff itself must be empty.
        let second = scheduler.plan(&v, &loaded, Time::seconds(3.0));
        assert_eq!(second, PassPlan::default());
    }

    #[test]
    fn eviction_starts_strictly_beyond_the_hysteresis_band() {
        let mut scheduler = scheduler_at_level(13);
        let v = view(-73.0, 40.0, 13.0);
        let center = TileAddress::new(13, 2434, 3101);

        let mut loaded = BTreeSet::new();
        let at_band = TileAddress::new(13, center.x + 5, center.y);
        let beyond = TileAddress::new(13, center.x + 6, center.y);
        let far_beyond = TileAddress::new(13, center.x, center.y + 9);
        loaded.insert(at_band);
        loaded.insert(beyond);
        loaded.insert(far_beyond);

        let plan = scheduler.plan_settled(&v, &loaded, Time::ZERO);
        assert!(!plan.evict.contains(&at_band));
        assert!(plan.evict.contains(&beyond));
        assert!(plan.evict.contains(&far_beyond));
    }

    #[test]
    fn no_address_is_both_loaded_and_evicted() {
        let mut scheduler = scheduler_at_level(13);
        let v = view(-73.0, 40.0, 11.0); // radius 3

        // Pretend a previous viewport loaded a band of tiles around the
        // incoming ring's edge.
        let center = TileAddress::new(13, 2434, 3101);
        let loaded: BTreeSet<TileAddress> = center
            .surrounding(6)
            .into_iter()
            .filter(|t| center.chebyshev(t) >= 3)
            .collect();

        let plan = scheduler.plan_settled(&v, &loaded, Time::ZERO);
        for addr in &plan.load {
            assert!(!plan.evict.contains(addr), "{addr:?} in both lists");
        }
    }
}
