/// Geographic coordinates in degrees (WGS84 lon/lat).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoPoint {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

/// Latitude limit of the Web-Mercator projection.
pub const MERCATOR_LAT_LIMIT_DEG: f64 = 85.051_128_78;

impl GeoPoint {
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }

    /// Longitude wrapped into [-180, 180) and latitude clamped to the
    /// Mercator range, so tile math downstream is always well-defined.
    pub fn normalized(&self) -> Self {
        let mut lon = self.lon_deg;
        if !(-180.0..180.0).contains(&lon) {
            lon = (lon + 180.0).rem_euclid(360.0) - 180.0;
        }
        Self {
            lon_deg: lon,
            lat_deg: self
                .lat_deg
                .clamp(-MERCATOR_LAT_LIMIT_DEG, MERCATOR_LAT_LIMIT_DEG),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::GeoPoint;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn normalization_wraps_longitude() {
        let p = GeoPoint::new(190.0, 0.0).normalized();
        assert_close(p.lon_deg, -170.0, 1e-12);

        let p = GeoPoint::new(-185.0, 0.0).normalized();
        assert_close(p.lon_deg, 175.0, 1e-12);
    }

    #[test]
    fn normalization_clamps_latitude() {
        let p = GeoPoint::new(0.0, 89.9).normalized();
        assert_close(p.lat_deg, super::MERCATOR_LAT_LIMIT_DEG, 1e-12);
    }

    #[test]
    fn in_range_points_are_untouched() {
        let p = GeoPoint::new(-73.0, 40.0).normalized();
        assert_close(p.lon_deg, -73.0, 1e-12);
        assert_close(p.lat_deg, 40.0, 1e-12);
    }
}
