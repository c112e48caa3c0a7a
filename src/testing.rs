//! Fixtures and scripted ephemeris doubles shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

use chrono::{DateTime, TimeZone, Utc};

use crate::ephemeris::{EphemerisCandidate, EphemerisError, EphemerisSource, GeoLocation};
use crate::handover::duration_secs;

pub const ISS_TLE: &str = "ISS (ZARYA)
1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927
2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537
";

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

struct LinearTrack {
    id: String,
    constellation: Option<String>,
    elevation_at_epoch: f64,
    rate_deg_per_s: f64,
}

/// Satellites whose elevation moves linearly in time from `epoch`.
pub struct ScriptedEphemeris {
    epoch: DateTime<Utc>,
    tracks: Vec<LinearTrack>,
    apply_mask: bool,
    queries: AtomicUsize,
}

impl ScriptedEphemeris {
    pub fn new(epoch: DateTime<Utc>) -> Self {
        Self {
            epoch,
            tracks: Vec::new(),
            apply_mask: true,
            queries: AtomicUsize::new(0),
        }
    }

    pub fn with_track(mut self, id: &str, elevation_at_epoch: f64, rate_deg_per_s: f64) -> Self {
        self.tracks.push(LinearTrack {
            id: id.to_string(),
            constellation: None,
            elevation_at_epoch,
            rate_deg_per_s,
        });
        self
    }

    pub fn with_tagged_track(
        mut self,
        id: &str,
        constellation: &str,
        elevation_at_epoch: f64,
        rate_deg_per_s: f64,
    ) -> Self {
        self.tracks.push(LinearTrack {
            id: id.to_string(),
            constellation: Some(constellation.to_string()),
            elevation_at_epoch,
            rate_deg_per_s,
        });
        self
    }

    /// Return every track regardless of the requested elevation mask.
    pub fn ignoring_mask(mut self) -> Self {
        self.apply_mask = false;
        self
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn elevation_of(&self, id: &str, time: DateTime<Utc>) -> Option<f64> {
        let secs = duration_secs(time - self.epoch);
        self.tracks
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.elevation_at_epoch + t.rate_deg_per_s * secs)
    }
}

impl EphemerisSource for ScriptedEphemeris {
    fn get_visible_satellites(
        &self,
        time: DateTime<Utc>,
        _location: &GeoLocation,
        min_elevation_deg: f64,
    ) -> Result<Vec<EphemerisCandidate>, EphemerisError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let secs = duration_secs(time - self.epoch);
        Ok(self
            .tracks
            .iter()
            .map(|t| EphemerisCandidate {
                id: t.id.clone(),
                name: None,
                constellation: t.constellation.clone(),
                elevation_deg: t.elevation_at_epoch + t.rate_deg_per_s * secs,
                azimuth_deg: 180.0,
                slant_range_km: None,
            })
            .filter(|c| !self.apply_mask || c.elevation_deg >= min_elevation_deg)
            .collect())
    }
}

/// Always times out.
#[derive(Default)]
pub struct FailingEphemeris {
    calls: AtomicUsize,
}

impl FailingEphemeris {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EphemerisSource for FailingEphemeris {
    fn get_visible_satellites(
        &self,
        _time: DateTime<Utc>,
        _location: &GeoLocation,
        _min_elevation_deg: f64,
    ) -> Result<Vec<EphemerisCandidate>, EphemerisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(EphemerisError::Timeout(StdDuration::from_millis(250)))
    }
}
