use geo_types::Point;

/// One observation from the location source. The timestamp is taken from the
/// monotonic session clock, not wall time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub position: Point<f64>,
    pub timestamp_ms: u64,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: u64) -> Self {
        Self {
            position: Point::new(longitude, latitude),
            timestamp_ms,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.position.y()
    }

    pub fn longitude(&self) -> f64 {
        self.position.x()
    }
}

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points in metres.
pub fn haversine_distance(from: Point<f64>, to: Point<f64>) -> f64 {
    let lat1 = from.y().to_radians();
    let lat2 = to.y().to_radians();
    let delta_lat = (to.y() - from.y()).to_radians();
    let delta_lon = (to.x() - from.x()).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        let point = Point::new(10.2, 56.1);
        assert_eq!(haversine_distance(point, point), 0.0);
    }

    #[test]
    fn thousandth_degree_on_equator_is_about_111_metres() {
        let from = Point::new(0.0, 0.0);
        let to = Point::new(0.001, 0.0);
        let distance = haversine_distance(from, to);
        assert!((distance - 111.19).abs() < 0.5, "got {distance}");
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Point::new(10.2039, 56.1629);
        let b = Point::new(12.5683, 55.6761);
        let there = haversine_distance(a, b);
        let back = haversine_distance(b, a);
        assert!((there - back).abs() < 1e-9);
        // Aarhus to Copenhagen is roughly 157 km.
        assert!((there - 157_000.0).abs() < 5_000.0, "got {there}");
    }

    #[test]
    fn fix_accessors_use_lat_lon_order() {
        let fix = LocationFix::new(56.1629, 10.2039, 1_000);
        assert_eq!(fix.latitude(), 56.1629);
        assert_eq!(fix.longitude(), 10.2039);
        assert_eq!(fix.timestamp_ms, 1_000);
    }
}
