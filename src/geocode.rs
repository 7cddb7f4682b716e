use async_trait::async_trait;
use tracing::warn;

use crate::error::AppError;
use crate::geo::GeoPoint;

/// Seam for the external reverse-geocoding service. Lookups are always
/// best-effort: a failure degrades to a missing address, never an error.
#[async_trait]
pub trait ReverseGeocode: Send + Sync {
    async fn reverse(&self, point: &GeoPoint) -> Result<Option<String>, AppError>;
}

/// Default geocoder: resolves nothing.
pub struct NoopGeocoder;

#[async_trait]
impl ReverseGeocode for NoopGeocoder {
    async fn reverse(&self, _point: &GeoPoint) -> Result<Option<String>, AppError> {
        Ok(None)
    }
}

pub async fn reverse_best_effort(
    geocoder: &dyn ReverseGeocode,
    point: &GeoPoint,
) -> Option<String> {
    match geocoder.reverse(point).await {
        Ok(address) => address,
        Err(err) => {
            warn!(error = %err, "reverse geocoding failed; storing no address");
            None
        }
    }
}
