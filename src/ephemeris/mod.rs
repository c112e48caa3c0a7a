mod error;
mod location;
mod look_angles;
mod tle;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use error::EphemerisError;
pub use location::GeoLocation;
pub use look_angles::{look_angles, LookAngles, TleEphemeris};
pub use tle::{TleCatalog, TleEntry};

/// One satellite as reported by an ephemeris provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EphemerisCandidate {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub constellation: Option<String>,
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
    #[serde(default)]
    pub slant_range_km: Option<f64>,
}

/// Read-only source of satellite geometry.
///
/// Implementations are queried concurrently from independent predictions and
/// must not require exclusive access. A query that exceeds its time budget
/// returns [`EphemerisError::Timeout`]; callers own any retry policy.
pub trait EphemerisSource: Send + Sync {
    fn get_visible_satellites(
        &self,
        time: DateTime<Utc>,
        location: &GeoLocation,
        min_elevation_deg: f64,
    ) -> Result<Vec<EphemerisCandidate>, EphemerisError>;
}

impl<T: EphemerisSource + ?Sized> EphemerisSource for &T {
    fn get_visible_satellites(
        &self,
        time: DateTime<Utc>,
        location: &GeoLocation,
        min_elevation_deg: f64,
    ) -> Result<Vec<EphemerisCandidate>, EphemerisError> {
        (**self).get_visible_satellites(time, location, min_elevation_deg)
    }
}

impl<T: EphemerisSource + ?Sized> EphemerisSource for Arc<T> {
    fn get_visible_satellites(
        &self,
        time: DateTime<Utc>,
        location: &GeoLocation,
        min_elevation_deg: f64,
    ) -> Result<Vec<EphemerisCandidate>, EphemerisError> {
        (**self).get_visible_satellites(time, location, min_elevation_deg)
    }
}
