use serde::{Deserialize, Serialize};

use crate::error::AppError;

const EARTH_RADIUS_KM: f64 = 6_371.0;

pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;
pub const MIN_LNG: f64 = -180.0;
pub const MAX_LNG: f64 = 180.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

pub fn validate_point(point: &GeoPoint) -> Result<(), AppError> {
    if !point.lat.is_finite() || !(MIN_LAT..=MAX_LAT).contains(&point.lat) {
        return Err(AppError::Validation(format!(
            "latitude must be between {MIN_LAT} and {MAX_LAT}"
        )));
    }

    if !point.lng.is_finite() || !(MIN_LNG..=MAX_LNG).contains(&point.lng) {
        return Err(AppError::Validation(format!(
            "longitude must be between {MIN_LNG} and {MAX_LNG}"
        )));
    }

    Ok(())
}

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

#[cfg(test)]
mod tests {
    use super::{haversine_km, validate_point, GeoPoint};

    #[test]
    fn zero_distance_for_same_point() {
        let p = GeoPoint {
            lat: 16.8409,
            lng: 96.1735,
        };
        let distance = haversine_km(&p, &p);
        assert!(distance < 1e-9);
    }

    #[test]
    fn london_to_paris_is_around_343_km() {
        let london = GeoPoint {
            lat: 51.5074,
            lng: -0.1278,
        };
        let paris = GeoPoint {
            lat: 48.8566,
            lng: 2.3522,
        };
        let distance = haversine_km(&london, &paris);
        assert!((distance - 343.0).abs() < 5.0);
    }

    #[test]
    fn rejects_out_of_range_latitude() {
        let p = GeoPoint {
            lat: 90.5,
            lng: 0.0,
        };
        assert!(validate_point(&p).is_err());
    }

    #[test]
    fn rejects_out_of_range_longitude() {
        let p = GeoPoint {
            lat: 0.0,
            lng: -180.1,
        };
        assert!(validate_point(&p).is_err());
    }

    #[test]
    fn rejects_non_finite_coordinates() {
        let p = GeoPoint {
            lat: f64::NAN,
            lng: 0.0,
        };
        assert!(validate_point(&p).is_err());
    }

    #[test]
    fn accepts_boundary_coordinates() {
        let p = GeoPoint {
            lat: -90.0,
            lng: 180.0,
        };
        assert!(validate_point(&p).is_ok());
    }
}
