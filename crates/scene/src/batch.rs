//! Per-tile batch geometry.
//!
//! All features of one tile collapse into a single geometry submission;
//! per-feature render objects do not scale past a few thousand concurrent
//! features. Each footprint becomes a roof cap (earcut triangulation in
//! tile-local coordinates) plus extruded wall quads. A degenerate footprint
//! skips that feature only, never the whole batch.

use earcutr::earcut;
use foundation::geo::GeoPoint;
use foundation::tile::TileAddress;
use streaming::feature::{Feature, FeatureGeometry};
use tracing::debug;

/// Aggregate render geometry for one tile, in tile-local meters
/// (x east, y north, z up, origin at the tile center).
#[derive(Debug, Clone, PartialEq)]
pub struct BatchGeometry {
    pub address: TileAddress,
    /// Flat xyz triples.
    pub positions: Vec<f32>,
    pub indices: Vec<u32>,
    /// Features that contributed geometry.
    pub feature_count: usize,
    /// Features dropped for degenerate or untriangulable footprints.
    pub skipped: usize,
}

impl BatchGeometry {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// Builds the single aggregate geometry for a tile's features.
pub fn build_tile_batch(address: TileAddress, features: &[Feature]) -> BatchGeometry {
    let origin = address.center();
    let meters_per_deg_lon = METERS_PER_DEG_LAT * origin.lat_deg.to_radians().cos();

    let to_local = |p: &GeoPoint| -> (f64, f64) {
        (
            (p.lon_deg - origin.lon_deg) * meters_per_deg_lon,
            (p.lat_deg - origin.lat_deg) * METERS_PER_DEG_LAT,
        )
    };

    let mut geometry = BatchGeometry {
        address,
        positions: Vec::new(),
        indices: Vec::new(),
        feature_count: 0,
        skipped: 0,
    };

    for feature in features {
        let FeatureGeometry::Polygon { rings } = &feature.geometry else {
            // Point features carry no footprint; nothing to batch.
            continue;
        };

        match extrude_footprint(rings, feature.height_m, &to_local, &mut geometry) {
            true => geometry.feature_count += 1,
            false => {
                geometry.skipped += 1;
                debug!(
                    "skipping degenerate footprint in tile {}",
                    address.cache_key()
                );
            }
        }
    }

    geometry
}

fn extrude_footprint(
    rings: &[Vec<GeoPoint>],
    height_m: f64,
    to_local: &impl Fn(&GeoPoint) -> (f64, f64),
    out: &mut BatchGeometry,
) -> bool {
    // Flatten rings into 2D earcut input, dropping a closing duplicate
    // point if present.
    let mut coords_2d: Vec<f64> = Vec::new();
    let mut hole_indices: Vec<usize> = Vec::new();
    let mut ring_loops: Vec<Vec<(f64, f64)>> = Vec::new();

    for (ring_i, ring) in rings.iter().enumerate() {
        let mut pts: Vec<(f64, f64)> = ring.iter().map(to_local).collect();
        drop_closing_duplicate(&mut pts);
        if pts.len() < 3 {
            if ring_i == 0 {
                return false;
            }
            continue;
        }

        if !ring_loops.is_empty() {
            hole_indices.push(coords_2d.len() / 2);
        }
        for (x, y) in &pts {
            coords_2d.push(*x);
            coords_2d.push(*y);
        }
        ring_loops.push(pts);
    }

    if ring_loops.is_empty() {
        return false;
    }

    let roof_indices = match earcut(&coords_2d, &hole_indices, 2) {
        Ok(ix) if !ix.is_empty() => ix,
        _ => return false,
    };

    let base = (out.positions.len() / 3) as u32;
    let h = height_m as f32;

    // Roof vertices at the feature height, in ring order.
    for pair in coords_2d.chunks_exact(2) {
        out.positions
            .extend_from_slice(&[pair[0] as f32, pair[1] as f32, h]);
    }
    for idx in roof_indices {
        out.indices.push(base + idx as u32);
    }

    // Wall quads for every ring edge (outer walls and hole shafts alike).
    for pts in &ring_loops {
        for i in 0..pts.len() {
            let (ax, ay) = pts[i];
            let (bx, by) = pts[(i + 1) % pts.len()];
            let wall_base = (out.positions.len() / 3) as u32;
            out.positions.extend_from_slice(&[
                ax as f32, ay as f32, 0.0, //
                bx as f32, by as f32, 0.0, //
                bx as f32, by as f32, h, //
                ax as f32, ay as f32, h,
            ]);
            out.indices.extend_from_slice(&[
                wall_base,
                wall_base + 1,
                wall_base + 2,
                wall_base,
                wall_base + 2,
                wall_base + 3,
            ]);
        }
    }

    true
}

fn drop_closing_duplicate(points: &mut Vec<(f64, f64)>) {
    if points.len() >= 2 {
        let first = points[0];
        let last = *points.last().unwrap();
        if (first.0 - last.0).abs() < 1e-9 && (first.1 - last.1).abs() < 1e-9 {
            points.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use foundation::geo::GeoPoint;
    use foundation::tile::TileAddress;
    use streaming::feature::{Feature, FeatureGeometry};

    use super::build_tile_batch;

    fn square_feature(lon: f64, lat: f64, size_deg: f64, height: f64) -> Feature {
        Feature {
            geometry: FeatureGeometry::Polygon {
                rings: vec![vec![
                    GeoPoint::new(lon, lat),
                    GeoPoint::new(lon + size_deg, lat),
                    GeoPoint::new(lon + size_deg, lat + size_deg),
                    GeoPoint::new(lon, lat + size_deg),
                    GeoPoint::new(lon, lat), // closing duplicate
                ]],
            },
            name: None,
            height_m: height,
            category: None,
        }
    }

    fn degenerate_feature() -> Feature {
        Feature {
            geometry: FeatureGeometry::Polygon {
                rings: vec![vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.1, 0.1)]],
            },
            name: None,
            height_m: 5.0,
            category: None,
        }
    }

    #[test]
    fn one_square_extrudes_to_roof_plus_walls() {
        let address = TileAddress::new(15, 16384, 16384);
        let origin = address.center();
        let batch = build_tile_batch(
            address,
            &[square_feature(origin.lon_deg, origin.lat_deg, 0.0002, 12.0)],
        );

        assert_eq!(batch.feature_count, 1);
        assert_eq!(batch.skipped, 0);
        // Roof: 2 triangles. Walls: 4 edges x 2 triangles.
        assert_eq!(batch.triangle_count(), 10);
        // Roof 4 + wall quads 4x4 vertices.
        assert_eq!(batch.positions.len() / 3, 20);
    }

    #[test]
    fn all_features_share_one_geometry() {
        let address = TileAddress::new(15, 16384, 16384);
        let origin = address.center();
        let batch = build_tile_batch(
            address,
            &[
                square_feature(origin.lon_deg, origin.lat_deg, 0.0002, 12.0),
                square_feature(origin.lon_deg + 0.001, origin.lat_deg, 0.0002, 30.0),
            ],
        );

        assert_eq!(batch.feature_count, 2);
        assert_eq!(batch.triangle_count(), 20);
    }

    #[test]
    fn degenerate_footprint_skips_only_that_feature() {
        let address = TileAddress::new(15, 16384, 16384);
        let origin = address.center();
        let batch = build_tile_batch(
            address,
            &[
                degenerate_feature(),
                square_feature(origin.lon_deg, origin.lat_deg, 0.0002, 12.0),
            ],
        );

        assert_eq!(batch.feature_count, 1);
        assert_eq!(batch.skipped, 1);
        assert!(!batch.is_empty());
    }

    #[test]
    fn empty_tile_builds_an_empty_batch() {
        let batch = build_tile_batch(TileAddress::new(15, 0, 0), &[]);
        assert!(batch.is_empty());
        assert_eq!(batch.feature_count, 0);
    }

    #[test]
    fn roof_sits_at_feature_height() {
        let address = TileAddress::new(15, 16384, 16384);
        let origin = address.center();
        let batch = build_tile_batch(
            address,
            &[square_feature(origin.lon_deg, origin.lat_deg, 0.0002, 42.0)],
        );

        let max_z = batch
            .positions
            .chunks_exact(3)
            .map(|v| v[2])
            .fold(f32::MIN, f32::max);
        assert_eq!(max_z, 42.0);
    }
}
