use std::fmt;

/// Kilometers per degree of latitude (and of longitude at the equator)
pub const KM_PER_DEGREE: f64 = 111.32;

/// Decimal places used when bucketing coordinates (~11 m)
pub const COORD_DECIMALS: i32 = 4;

const COORD_SCALE: f64 = 10_000.0;

/// Rounded coordinate used to detect co-located records
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoordKey {
    lat: i64,
    lng: i64,
}

impl CoordKey {
    /// Round lat/lng to 4 decimal places
    #[inline(always)]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat: (lat * COORD_SCALE).round() as i64,
            lng: (lng * COORD_SCALE).round() as i64,
        }
    }

    pub fn lat(&self) -> f64 {
        self.lat as f64 / COORD_SCALE
    }

    pub fn lng(&self) -> f64 {
        self.lng as f64 / COORD_SCALE
    }
}

impl fmt::Display for CoordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4},{:.4}", self.lat(), self.lng())
    }
}

/// Check a lat/lng pair is finite and inside WGS84 bounds
#[inline(always)]
pub fn is_valid_position(lat: f64, lng: f64) -> bool {
    lat.is_finite() && lng.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
}

/// Convert a km displacement (east, north) at `lat` into degree offsets (dlng, dlat).
/// Longitude scaling is clamped near the poles.
#[inline(always)]
pub fn km_to_degrees(east_km: f64, north_km: f64, lat: f64) -> (f64, f64) {
    let cos_lat = lat.to_radians().cos().max(0.1);
    let dlat = north_km / KM_PER_DEGREE;
    let dlng = east_km / (KM_PER_DEGREE * cos_lat);
    (dlng, dlat)
}

/// Move a position by a km displacement (east, north). Latitude is clamped
/// at the poles and longitude wraps across the antimeridian, so the result
/// is always a valid WGS84 position.
pub fn offset_position(lat: f64, lng: f64, east_km: f64, north_km: f64) -> (f64, f64) {
    let (dlng, dlat) = km_to_degrees(east_km, north_km, lat);
    let lat = (lat + dlat).clamp(-90.0, 90.0);
    let lng = (lng + dlng + 180.0).rem_euclid(360.0) - 180.0;
    (lat, lng)
}

/// Inverse of `km_to_degrees` measured at the first point's latitude
#[cfg(test)]
pub(crate) fn offset_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let north = (lat2 - lat1) * KM_PER_DEGREE;
    let east = (lng2 - lng1) * KM_PER_DEGREE * lat1.to_radians().cos().max(0.1);
    north.hypot(east)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_rounds_to_four_decimals() {
        let a = CoordKey::new(-5.00001, -60.00004);
        let b = CoordKey::new(-5.0, -60.0);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "-5.0000,-60.0000");
    }

    #[test]
    fn test_key_separates_distinct_points() {
        assert_ne!(CoordKey::new(1.0, 1.0), CoordKey::new(1.0002, 1.0));
    }

    #[test]
    fn test_km_to_degrees_equator() {
        let (dlng, dlat) = km_to_degrees(KM_PER_DEGREE, KM_PER_DEGREE, 0.0);
        assert!((dlng - 1.0).abs() < 1e-9);
        assert!((dlat - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_offset_km_inverts_conversion() {
        assert!((offset_km(0.0, 0.0, 1.0, 0.0) - KM_PER_DEGREE).abs() < 1e-9);
        let (lat, lng) = offset_position(60.0, 10.0, 1.2, -0.7);
        assert!((offset_km(60.0, 10.0, lat, lng) - 1.2f64.hypot(0.7)).abs() < 1e-9);
    }

    #[test]
    fn test_offset_stays_on_the_globe() {
        let (lat, lng) = offset_position(89.9999, 179.9999, 1.5, 1.5);
        assert!(is_valid_position(lat, lng));
        assert_eq!(lat, 90.0);
        assert!(lng < 0.0);

        let (lat, lng) = offset_position(-89.9999, -179.9999, -1.5, -1.5);
        assert!(is_valid_position(lat, lng));
        assert_eq!(lat, -90.0);
        assert!(lng > 0.0);
    }

    #[test]
    fn test_position_bounds() {
        assert!(is_valid_position(-5.0, -60.0));
        assert!(!is_valid_position(91.0, 0.0));
        assert!(!is_valid_position(f64::NAN, 0.0));
    }
}
