use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::ephemeris::{EphemerisCandidate, EphemerisSource, GeoLocation};
use crate::handover::{PredictError, SatelliteObservation};
use crate::signal::{ConstellationProfile, LinkGeometry, ProfileRegistry, PropagationModel};

pub const DEFAULT_MIN_ELEVATION_DEG: f64 = 10.0;

/// Picks the serving satellite for a location at an instant.
///
/// Candidates are scored with the propagation model, but the winner is the
/// one with the highest elevation. Equal elevations fall back to the lowest
/// satellite id so repeated queries always agree.
pub struct SatelliteSelector<E> {
    ephemeris: E,
    model: PropagationModel,
    profile: ConstellationProfile,
    profiles: Option<ProfileRegistry>,
    min_elevation_deg: f64,
}

impl<E: EphemerisSource> SatelliteSelector<E> {
    pub fn new(ephemeris: E, model: PropagationModel, profile: ConstellationProfile) -> Self {
        Self {
            ephemeris,
            model,
            profile,
            profiles: None,
            min_elevation_deg: DEFAULT_MIN_ELEVATION_DEG,
        }
    }

    pub fn with_min_elevation(mut self, min_elevation_deg: f64) -> Self {
        self.min_elevation_deg = min_elevation_deg;
        self
    }

    /// Resolve candidates tagged with a constellation through `profiles`.
    /// Untagged or unknown candidates use the selector's own profile.
    pub fn with_profiles(mut self, profiles: ProfileRegistry) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub fn min_elevation_deg(&self) -> f64 {
        self.min_elevation_deg
    }

    pub fn model(&self) -> &PropagationModel {
        &self.model
    }

    /// Every satellite above the elevation mask, scored.
    pub fn observe(
        &self,
        time: DateTime<Utc>,
        location: &GeoLocation,
    ) -> Result<Vec<SatelliteObservation>, PredictError> {
        let candidates = self
            .ephemeris
            .get_visible_satellites(time, location, self.min_elevation_deg)?;

        candidates
            .into_iter()
            .filter(|c| c.elevation_deg >= self.min_elevation_deg)
            .map(|c| self.score(c, time))
            .collect()
    }

    pub fn select_best(
        &self,
        time: DateTime<Utc>,
        location: &GeoLocation,
    ) -> Result<SatelliteObservation, PredictError> {
        self.observe(time, location)?
            .into_iter()
            .max_by(|a, b| {
                a.elevation_deg
                    .partial_cmp(&b.elevation_deg)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| b.id.cmp(&a.id))
            })
            .ok_or(PredictError::NoVisibleSatellite {
                time,
                min_elevation_deg: self.min_elevation_deg,
            })
    }

    fn score(
        &self,
        candidate: EphemerisCandidate,
        time: DateTime<Utc>,
    ) -> Result<SatelliteObservation, PredictError> {
        let profile = self.profile_for(&candidate);
        let estimate = self.model.estimate(
            &LinkGeometry {
                elevation_deg: candidate.elevation_deg,
                azimuth_deg: Some(candidate.azimuth_deg),
                slant_range_km: candidate.slant_range_km,
            },
            profile,
        )?;

        Ok(SatelliteObservation {
            id: candidate.id,
            name: candidate.name,
            elevation_deg: candidate.elevation_deg,
            azimuth_deg: candidate.azimuth_deg,
            slant_range_km: estimate.slant_range_km,
            rsrp_dbm: estimate.rsrp_dbm,
            timestamp: time,
        })
    }

    fn profile_for(&self, candidate: &EphemerisCandidate) -> &ConstellationProfile {
        match (&self.profiles, &candidate.constellation) {
            (Some(profiles), Some(name)) => profiles.lookup(name).unwrap_or_else(|_| {
                log::debug!(
                    "No profile for constellation {}, using {}",
                    name,
                    self.profile.name
                );
                &self.profile
            }),
            _ => &self.profile,
        }
    }
}
