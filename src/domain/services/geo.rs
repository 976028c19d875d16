use crate::domain::model::LonLat;

/// 地球平均半徑（公尺）
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// 大圓距離（公尺，haversine）
pub fn haversine_meters(a: LonLat, b: LonLat) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lon - a.lon).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

pub fn is_valid_coordinate(lon: f64, lat: f64) -> bool {
    lon.is_finite() && lat.is_finite() && (-180.0..=180.0).contains(&lon) && (-90.0..=90.0).contains(&lat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        let p = LonLat::new(-122.33, 47.61);
        assert_eq!(haversine_meters(p, p), 0.0);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let a = LonLat::new(0.0, 0.0);
        let b = LonLat::new(0.0, 1.0);
        let d = haversine_meters(a, b);
        assert!((d - 111_195.0).abs() < 10.0, "got {}", d);
    }

    #[test]
    fn test_symmetric() {
        let a = LonLat::new(-73.98, 40.75);
        let b = LonLat::new(-73.95, 40.78);
        assert_eq!(haversine_meters(a, b), haversine_meters(b, a));
    }

    #[test]
    fn test_coordinate_ranges() {
        assert!(is_valid_coordinate(-180.0, 90.0));
        assert!(!is_valid_coordinate(181.0, 0.0));
        assert!(!is_valid_coordinate(0.0, -91.0));
        assert!(!is_valid_coordinate(f64::NAN, 0.0));
    }
}
