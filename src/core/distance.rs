use crate::models::BoundingBox;

/// Earth's radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Calculate the Haversine distance between two points in kilometers
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
///
/// # Returns
/// Distance in kilometers
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Haversine distance between two `(lat, lon)` pairs
#[inline]
pub fn distance_between(from: (f64, f64), to: (f64, f64)) -> f64 {
    haversine_distance(from.0, from.1, to.0, to.1)
}

/// Round a distance to one decimal place for display
#[inline]
pub fn round_km(distance_km: f64) -> f64 {
    (distance_km * 10.0).round() / 10.0
}

/// Calculate a bounding box around a center point
///
/// Used to bound directory queries when no department is known.
/// 1° latitude ≈ 111km, 1° longitude ≈ 111km * cos(latitude)
pub fn calculate_bounding_box(lat: f64, lon: f64, radius_km: f64) -> BoundingBox {
    let lat_delta = radius_km / 111.0;
    let lon_delta = radius_km / (111.0 * lat.to_radians().cos().abs());

    BoundingBox {
        min_lat: lat - lat_delta,
        max_lat: lat + lat_delta,
        min_lon: lon - lon_delta,
        max_lon: lon + lon_delta,
    }
}

/// Check if a point is within a bounding box
#[inline]
pub fn is_within_bounding_box(lat: f64, lon: f64, bbox: &BoundingBox) -> bool {
    lat >= bbox.min_lat
        && lat <= bbox.max_lat
        && lon >= bbox.min_lon
        && lon <= bbox.max_lon
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_paris_lyon() {
        // Paris to Lyon is approximately 392 km
        let distance = haversine_distance(48.8566, 2.3522, 45.7640, 4.8357);
        assert!((distance - 392.0).abs() < 392.0 * 0.01, "Distance should be ~392km, got {}", distance);
    }

    #[test]
    fn test_haversine_symmetry_and_identity() {
        let paris = (48.8566, 2.3522);
        let meaux = (48.9601, 2.8788);

        assert_eq!(distance_between(paris, meaux), distance_between(meaux, paris));
        assert_eq!(distance_between(paris, paris), 0.0);
    }

    #[test]
    fn test_round_km() {
        assert_eq!(round_km(4.2032), 4.2);
        assert_eq!(round_km(4.25), 4.3);
        assert_eq!(round_km(0.0), 0.0);
    }

    #[test]
    fn test_bounding_box() {
        let bbox = calculate_bounding_box(48.8566, 2.3522, 10.0);

        assert!(bbox.min_lat < 48.8566);
        assert!(bbox.max_lat > 48.8566);
        assert!(bbox.min_lon < 2.3522);
        assert!(bbox.max_lon > 2.3522);

        let lat_span = bbox.max_lat - bbox.min_lat;
        assert!((lat_span - 0.18).abs() < 0.02, "Lat span should be ~0.18 degrees");
    }

    #[test]
    fn test_point_within_bbox() {
        let bbox = calculate_bounding_box(48.8566, 2.3522, 10.0);

        assert!(is_within_bounding_box(48.8566, 2.3522, &bbox));
        assert!(is_within_bounding_box(48.86, 2.36, &bbox));
        assert!(!is_within_bounding_box(45.764, 4.8357, &bbox));
    }
}
