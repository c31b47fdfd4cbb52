use std::f64::consts::PI;

use crate::geo::GeoPoint;

/// Slippy-tile address at a fixed detail level.
///
/// Ordering and hashing follow (level, x, y) so addresses can key
/// deterministic `BTreeMap`s as well as hash maps.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileAddress {
    pub level: u8,
    pub x: u32,
    pub y: u32,
}

impl TileAddress {
    pub fn new(level: u8, x: u32, y: u32) -> Self {
        Self { level, x, y }
    }

    /// Number of tiles along one axis at a level (2^level).
    pub fn tiles_per_axis(level: u8) -> u32 {
        1u32 << level.min(31)
    }

    /// Continuous tile coordinates of a point at a level.
    ///
    /// This is the un-floored form of `from_geo`, used to measure camera
    /// movement in tile-widths.
    pub fn fractional_position(point: GeoPoint, level: u8) -> (f64, f64) {
        let p = point.normalized();
        let n = Self::tiles_per_axis(level) as f64;
        let x = (p.lon_deg + 180.0) / 360.0 * n;
        let lat_rad = p.lat_deg.to_radians();
        let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n;
        (x, y)
    }

    /// Tile containing a geographic point, with floor semantics so a point
    /// exactly on a tile boundary resolves to a single deterministic tile.
    pub fn from_geo(point: GeoPoint, level: u8) -> Self {
        let n = Self::tiles_per_axis(level);
        let (fx, fy) = Self::fractional_position(point, level);
        let x = (fx.floor() as i64).clamp(0, n as i64 - 1) as u32;
        let y = (fy.floor() as i64).clamp(0, n as i64 - 1) as u32;
        Self { level, x, y }
    }

    /// Cache/map key in the canonical `"level/x/y"` form.
    pub fn cache_key(&self) -> String {
        format!("{}/{}/{}", self.level, self.x, self.y)
    }

    /// Chebyshev (chessboard) distance to another address at the same level.
    pub fn chebyshev(&self, other: &TileAddress) -> u32 {
        let dx = (self.x as i64 - other.x as i64).unsigned_abs();
        let dy = (self.y as i64 - other.y as i64).unsigned_abs();
        dx.max(dy) as u32
    }

    /// All addresses within Chebyshev distance `radius`, clamped to the tile
    /// grid, in row-major order.
    pub fn surrounding(&self, radius: u32) -> Vec<TileAddress> {
        let n = Self::tiles_per_axis(self.level) as i64;
        let r = radius as i64;
        let mut out = Vec::with_capacity(((2 * r + 1) * (2 * r + 1)) as usize);
        for dy in -r..=r {
            let y = self.y as i64 + dy;
            if y < 0 || y >= n {
                continue;
            }
            for dx in -r..=r {
                let x = self.x as i64 + dx;
                if x < 0 || x >= n {
                    continue;
                }
                out.push(TileAddress::new(self.level, x as u32, y as u32));
            }
        }
        out
    }

    /// Geographic center of this tile.
    pub fn center(&self) -> GeoPoint {
        let n = Self::tiles_per_axis(self.level) as f64;
        let lon = (self.x as f64 + 0.5) / n * 360.0 - 180.0;
        let lat = fractional_y_to_lat(self.y as f64 + 0.5, self.level);
        GeoPoint::new(lon, lat)
    }
}

fn fractional_y_to_lat(y: f64, level: u8) -> f64 {
    let n = TileAddress::tiles_per_axis(level) as f64;
    let t = PI * (1.0 - 2.0 * y / n);
    t.sinh().atan().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::TileAddress;
    use crate::geo::GeoPoint;

    #[test]
    fn from_geo_is_deterministic() {
        let p = GeoPoint::new(-73.0, 40.0);
        let a = TileAddress::from_geo(p, 13);
        let b = TileAddress::from_geo(p, 13);
        assert_eq!(a, b);
        assert_eq!(a, TileAddress::new(13, 2434, 3101));
    }

    #[test]
    fn boundary_points_resolve_by_floor() {
        // lon = 0 at level 1 sits exactly on the seam between x=0 and x=1.
        let a = TileAddress::from_geo(GeoPoint::new(0.0, 0.0), 1);
        assert_eq!(a.x, 1);
        // Equator seam resolves south (y grows southward, floor picks y=1).
        assert_eq!(a.y, 1);
    }

    #[test]
    fn surrounding_is_a_full_grid_away_from_edges() {
        let center = TileAddress::new(13, 2434, 3101);
        let ring = center.surrounding(2);
        assert_eq!(ring.len(), 25);
        assert!(ring.iter().all(|t| center.chebyshev(t) <= 2));
        assert!(ring.contains(&center));
    }

    #[test]
    fn surrounding_clamps_at_grid_edges() {
        let corner = TileAddress::new(2, 0, 0);
        let ring = corner.surrounding(1);
        // 2x2 corner block instead of 3x3.
        assert_eq!(ring.len(), 4);
    }

    #[test]
    fn chebyshev_distance() {
        let a = TileAddress::new(10, 5, 5);
        assert_eq!(a.chebyshev(&TileAddress::new(10, 5, 5)), 0);
        assert_eq!(a.chebyshev(&TileAddress::new(10, 8, 6)), 3);
        assert_eq!(a.chebyshev(&TileAddress::new(10, 2, 9)), 4);
    }

    #[test]
    fn center_round_trips_through_from_geo() {
        let a = TileAddress::new(13, 2434, 3101);
        let rt = TileAddress::from_geo(a.center(), 13);
        assert_eq!(a, rt);
    }

    #[test]
    fn cache_key_form() {
        assert_eq!(TileAddress::new(15, 3, 7).cache_key(), "15/3/7");
    }
}
