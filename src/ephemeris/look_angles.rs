use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use sgp4::{Constants, Elements};

use crate::ephemeris::{
    EphemerisCandidate, EphemerisError, EphemerisSource, GeoLocation, TleCatalog,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookAngles {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub range_km: f64,
}

/// Ephemeris backed by SGP4 propagation of a TLE catalog.
pub struct TleEphemeris {
    catalog: TleCatalog,
    query_timeout: Option<Duration>,
}

impl TleEphemeris {
    pub fn new(catalog: TleCatalog) -> Self {
        Self {
            catalog,
            query_timeout: None,
        }
    }

    /// Abort a query with [`EphemerisError::Timeout`] once it has spent `timeout`.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn catalog(&self) -> &TleCatalog {
        &self.catalog
    }
}

impl EphemerisSource for TleEphemeris {
    fn get_visible_satellites(
        &self,
        time: DateTime<Utc>,
        location: &GeoLocation,
        min_elevation_deg: f64,
    ) -> Result<Vec<EphemerisCandidate>, EphemerisError> {
        if self.catalog.is_empty() {
            return Err(EphemerisError::Unavailable("no satellites loaded".into()));
        }

        let started = Instant::now();
        let mut visible = Vec::new();

        for entry in self.catalog.entries() {
            if let Some(budget) = self.query_timeout {
                if started.elapsed() >= budget {
                    return Err(EphemerisError::Timeout(budget));
                }
            }

            let angles = match look_angles(location, &entry.elements, &entry.constants, time) {
                Ok(a) => a,
                Err(e) => {
                    log::warn!("Failed to propagate {}: {}", entry.name, e);
                    continue;
                }
            };

            if angles.elevation_deg >= min_elevation_deg {
                visible.push(EphemerisCandidate {
                    id: entry.id.clone(),
                    name: Some(entry.name.clone()),
                    constellation: Some(entry.constellation.clone()),
                    elevation_deg: angles.elevation_deg,
                    azimuth_deg: angles.azimuth_deg,
                    slant_range_km: Some(angles.range_km),
                });
            }
        }

        Ok(visible)
    }
}

/// Topocentric azimuth, elevation and range of a satellite at `timestamp`.
pub fn look_angles(
    location: &GeoLocation,
    elements: &Elements,
    constants: &Constants,
    timestamp: DateTime<Utc>,
) -> Result<LookAngles, EphemerisError> {
    let minutes = elements
        .datetime_to_minutes_since_epoch(&timestamp.naive_utc())
        .map_err(|e| EphemerisError::Propagation(e.to_string()))?;

    let prediction = constants
        .propagate(minutes)
        .map_err(|e| EphemerisError::Propagation(e.to_string()))?;

    let sidereal =
        sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&timestamp.naive_utc()));

    let sat_ecef = teme_to_ecef_position(prediction.position, sidereal);
    let obs_ecef = location.position_ecef_km();

    let dr = [
        sat_ecef[0] - obs_ecef[0],
        sat_ecef[1] - obs_ecef[1],
        sat_ecef[2] - obs_ecef[2],
    ];
    let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();

    let (east, north, up) = ecef_to_enu(dr, location.lat_rad(), location.lon_rad());
    let azimuth_deg = east.atan2(north).to_degrees().rem_euclid(360.0);
    let elevation_deg = if range_km > 0.0 {
        (up / range_km).asin().to_degrees()
    } else {
        0.0
    };

    Ok(LookAngles {
        azimuth_deg,
        elevation_deg,
        range_km,
    })
}

fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}
