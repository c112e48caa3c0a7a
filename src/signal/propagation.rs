use std::f64::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::signal::{ConstellationProfile, PropagationError};

/// Valid RSRP band (dBm). Values outside are data errors.
pub const RSRP_MIN_DBM: f64 = -140.0;
pub const RSRP_MAX_DBM: f64 = -50.0;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;
const DBW_TO_DBM: f64 = 30.0;

// Below this elevation the attenuation models are evaluated at the limit.
const LOW_ELEVATION_LIMIT_DEG: f64 = 5.0;
const ATMOSPHERIC_CAP_DB: f64 = 3.0;
const RAIN_CAP_DB: f64 = 5.0;
const RAIN_HEIGHT_KM: f64 = 5.0;
const RAIN_FREE_FREQUENCY_GHZ: f64 = 10.0;
const LOW_FREQUENCY_RAIN_DB: f64 = 0.1;

const LINEAR_REFERENCE_RSRP_DBM: f64 = -95.0;
const LINEAR_REFERENCE_ELEVATION_DEG: f64 = 10.0;
const LINEAR_SLOPE_DB_PER_DEG: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PropagationMode {
    /// Friis path loss with atmospheric and rain attenuation.
    #[default]
    Physics,
    /// Straight line in elevation, for degraded ephemeris data.
    LinearElevation,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub rain_rate_mm_h: f64,
}

impl Default for Weather {
    fn default() -> Self {
        Self {
            rain_rate_mm_h: 5.0,
        }
    }
}

/// Observer-to-satellite geometry for one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkGeometry {
    pub elevation_deg: f64,
    pub azimuth_deg: Option<f64>,
    pub slant_range_km: Option<f64>,
}

impl LinkGeometry {
    pub fn from_elevation(elevation_deg: f64) -> Self {
        Self {
            elevation_deg,
            azimuth_deg: None,
            slant_range_km: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalEstimate {
    pub rsrp_dbm: f64,
    pub slant_range_km: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PropagationModel {
    mode: PropagationMode,
    weather: Weather,
}

impl PropagationModel {
    pub fn new(mode: PropagationMode, weather: Weather) -> Self {
        Self { mode, weather }
    }

    pub fn physics(weather: Weather) -> Self {
        Self::new(PropagationMode::Physics, weather)
    }

    pub fn linear_elevation() -> Self {
        Self::new(PropagationMode::LinearElevation, Weather::default())
    }

    pub fn mode(&self) -> PropagationMode {
        self.mode
    }

    pub fn rsrp_dbm(
        &self,
        geometry: &LinkGeometry,
        profile: &ConstellationProfile,
    ) -> Result<f64, PropagationError> {
        self.estimate(geometry, profile).map(|e| e.rsrp_dbm)
    }

    /// Received signal power for the given geometry. Results outside
    /// [`RSRP_MIN_DBM`, `RSRP_MAX_DBM`] are rejected in every mode.
    pub fn estimate(
        &self,
        geometry: &LinkGeometry,
        profile: &ConstellationProfile,
    ) -> Result<SignalEstimate, PropagationError> {
        validate_geometry(geometry)?;
        profile.validate()?;

        let range_km = geometry
            .slant_range_km
            .unwrap_or_else(|| slant_range_km(geometry.elevation_deg, profile.altitude_km));

        let rsrp_dbm = match self.mode {
            PropagationMode::Physics => {
                let elevation = geometry.elevation_deg;
                let fspl = free_space_path_loss_db(range_km, profile.frequency_ghz);
                let atmospheric = atmospheric_attenuation_db(elevation, profile.frequency_ghz);
                let rain =
                    rain_attenuation_db(elevation, profile.frequency_ghz, self.weather.rain_rate_mm_h);
                log::trace!(
                    "link budget: range={:.1}km fspl={:.2}dB atm={:.2}dB rain={:.2}dB",
                    range_km,
                    fspl,
                    atmospheric,
                    rain
                );
                profile.eirp_dbw + DBW_TO_DBM + profile.antenna_gain_dbi
                    - fspl
                    - atmospheric
                    - rain
                    - profile.design_margin_db
            }
            PropagationMode::LinearElevation => {
                LINEAR_REFERENCE_RSRP_DBM
                    + LINEAR_SLOPE_DB_PER_DEG
                        * (geometry.elevation_deg - LINEAR_REFERENCE_ELEVATION_DEG)
            }
        };

        check_rsrp_band(rsrp_dbm)?;

        Ok(SignalEstimate {
            rsrp_dbm,
            slant_range_km: range_km,
        })
    }
}

pub fn check_rsrp_band(rsrp_dbm: f64) -> Result<(), PropagationError> {
    if (RSRP_MIN_DBM..=RSRP_MAX_DBM).contains(&rsrp_dbm) {
        Ok(())
    } else {
        Err(PropagationError::InvalidSignalRange {
            rsrp_dbm,
            min_dbm: RSRP_MIN_DBM,
            max_dbm: RSRP_MAX_DBM,
        })
    }
}

/// Slant range from elevation via the law of cosines on the
/// Earth-centre / observer / satellite triangle.
pub fn slant_range_km(elevation_deg: f64, altitude_km: f64) -> f64 {
    let orbit_radius = EARTH_RADIUS_KM + altitude_km;
    let elevation = elevation_deg.to_radians();
    let nadir = (EARTH_RADIUS_KM * elevation.cos() / orbit_radius).asin();
    let central = FRAC_PI_2 - elevation - nadir;
    (EARTH_RADIUS_KM * EARTH_RADIUS_KM + orbit_radius * orbit_radius
        - 2.0 * EARTH_RADIUS_KM * orbit_radius * central.cos())
    .sqrt()
}

/// Friis free-space path loss in dB.
pub fn free_space_path_loss_db(distance_km: f64, frequency_ghz: f64) -> f64 {
    let distance_m = distance_km * 1000.0;
    let frequency_hz = frequency_ghz * 1e9;
    20.0 * (4.0 * PI * distance_m * frequency_hz / SPEED_OF_LIGHT_M_S).log10()
}

fn atmospheric_attenuation_db(elevation_deg: f64, frequency_ghz: f64) -> f64 {
    let elevation = elevation_deg.max(LOW_ELEVATION_LIMIT_DEG).to_radians();
    let zenith_db = 0.1 * (frequency_ghz / 10.0).sqrt();
    (zenith_db / elevation.sin()).min(ATMOSPHERIC_CAP_DB)
}

fn rain_attenuation_db(elevation_deg: f64, frequency_ghz: f64, rain_rate_mm_h: f64) -> f64 {
    if frequency_ghz < RAIN_FREE_FREQUENCY_GHZ {
        return LOW_FREQUENCY_RAIN_DB;
    }
    let rain_rate = rain_rate_mm_h.max(0.0);
    // ITU-R P.838 power-law coefficients, two frequency bands
    let specific_db_per_km = if frequency_ghz <= 15.0 {
        0.0751 * rain_rate.powf(1.099)
    } else {
        0.187 * rain_rate.powf(0.931)
    };
    let elevation = elevation_deg.max(LOW_ELEVATION_LIMIT_DEG).to_radians();
    let path_km = RAIN_HEIGHT_KM / elevation.sin();
    (specific_db_per_km * path_km).min(RAIN_CAP_DB)
}

fn validate_geometry(geometry: &LinkGeometry) -> Result<(), PropagationError> {
    let elevation = geometry.elevation_deg;
    if !elevation.is_finite() || !(0.0..=90.0).contains(&elevation) {
        return Err(PropagationError::InvalidGeometry(format!(
            "elevation {} deg outside [0, 90]",
            elevation
        )));
    }
    if let Some(range) = geometry.slant_range_km {
        if !range.is_finite() || range <= 0.0 {
            return Err(PropagationError::InvalidGeometry(format!(
                "slant range {} km must be positive",
                range
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {} +/- {}, got {}",
            expected,
            tolerance,
            actual
        );
    }

    #[test]
    fn test_slant_range_zenith_equals_altitude() {
        assert_close(slant_range_km(90.0, 550.0), 550.0, 1e-6);
        assert_close(slant_range_km(90.0, 1200.0), 1200.0, 1e-6);
    }

    #[test]
    fn test_slant_range_horizon() {
        let r = EARTH_RADIUS_KM + 550.0;
        let expected = (r * r - EARTH_RADIUS_KM * EARTH_RADIUS_KM).sqrt();
        assert_close(slant_range_km(0.0, 550.0), expected, 1e-6);
        assert_close(slant_range_km(10.0, 550.0), 1815.08, 0.01);
    }

    #[test]
    fn test_free_space_path_loss() {
        assert_close(free_space_path_loss_db(550.0, 12.2), 168.98, 0.01);
        // doubling distance adds ~6 dB
        let delta = free_space_path_loss_db(1100.0, 12.2) - free_space_path_loss_db(550.0, 12.2);
        assert_close(delta, 6.0206, 1e-3);
    }

    #[test]
    fn test_attenuation_caps() {
        assert!(atmospheric_attenuation_db(0.0, 90.0) <= ATMOSPHERIC_CAP_DB);
        assert_eq!(atmospheric_attenuation_db(0.0, 90.0), ATMOSPHERIC_CAP_DB);
        assert_eq!(rain_attenuation_db(1.0, 12.2, 5.0), RAIN_CAP_DB);
        assert_eq!(rain_attenuation_db(45.0, 2.0, 50.0), LOW_FREQUENCY_RAIN_DB);
        assert_close(rain_attenuation_db(90.0, 12.2, 5.0), 2.2018, 1e-3);
    }

    #[test]
    fn test_physics_starlink_reference_values() {
        let model = PropagationModel::physics(Weather::default());
        let profile = ConstellationProfile::starlink();
        let zenith = model
            .rsrp_dbm(&LinkGeometry::from_elevation(90.0), &profile)
            .unwrap();
        assert_close(zenith, -65.29, 0.01);
        let low = model
            .rsrp_dbm(&LinkGeometry::from_elevation(10.0), &profile)
            .unwrap();
        assert_close(low, -78.99, 0.01);
    }

    #[test]
    fn test_rsrp_non_decreasing_in_elevation() {
        let models = [
            PropagationModel::physics(Weather::default()),
            PropagationModel::physics(Weather { rain_rate_mm_h: 0.0 }),
            PropagationModel::linear_elevation(),
        ];
        let profiles = [
            ConstellationProfile::starlink(),
            ConstellationProfile::oneweb(),
            ConstellationProfile::generic(),
        ];
        for model in &models {
            for profile in &profiles {
                let mut previous = f64::NEG_INFINITY;
                for step in 0..=180 {
                    let elevation = step as f64 * 0.5;
                    let rsrp = model
                        .rsrp_dbm(&LinkGeometry::from_elevation(elevation), profile)
                        .unwrap();
                    assert!(
                        rsrp >= previous,
                        "{} {}: rsrp dropped at {} deg ({} < {})",
                        model.mode(),
                        profile.name,
                        elevation,
                        rsrp,
                        previous
                    );
                    previous = rsrp;
                }
            }
        }
    }

    #[test]
    fn test_physics_rejects_out_of_band() {
        let model = PropagationModel::physics(Weather::default());
        let mut profile = ConstellationProfile::starlink();
        profile.eirp_dbw = 60.0;
        let result = model.rsrp_dbm(&LinkGeometry::from_elevation(90.0), &profile);
        match result {
            Err(PropagationError::InvalidSignalRange { rsrp_dbm, .. }) => {
                assert!(rsrp_dbm > RSRP_MAX_DBM)
            }
            other => panic!("expected InvalidSignalRange, got {:?}", other),
        }
    }

    #[test]
    fn test_linear_elevation_values() {
        let model = PropagationModel::linear_elevation();
        let profile = ConstellationProfile::oneweb();
        let at = |e: f64| model.rsrp_dbm(&LinkGeometry::from_elevation(e), &profile).unwrap();
        assert_eq!(at(10.0), -95.0);
        assert_eq!(at(0.0), -100.0);
        assert_eq!(at(90.0), -55.0);
    }

    #[test]
    fn test_reported_slant_range_is_used() {
        let model = PropagationModel::physics(Weather::default());
        let profile = ConstellationProfile::starlink();
        let derived = model
            .estimate(&LinkGeometry::from_elevation(45.0), &profile)
            .unwrap();
        let reported = model
            .estimate(
                &LinkGeometry {
                    elevation_deg: 45.0,
                    azimuth_deg: Some(120.0),
                    slant_range_km: Some(derived.slant_range_km * 2.0),
                },
                &profile,
            )
            .unwrap();
        assert_eq!(reported.slant_range_km, derived.slant_range_km * 2.0);
        assert_close(derived.rsrp_dbm - reported.rsrp_dbm, 6.0206, 1e-3);
    }

    #[test]
    fn test_invalid_geometry() {
        let model = PropagationModel::default();
        let profile = ConstellationProfile::starlink();
        for elevation in [-1.0, 91.0, f64::NAN] {
            assert!(matches!(
                model.rsrp_dbm(&LinkGeometry::from_elevation(elevation), &profile),
                Err(PropagationError::InvalidGeometry(_))
            ));
        }
        let bad_range = LinkGeometry {
            elevation_deg: 30.0,
            azimuth_deg: None,
            slant_range_km: Some(0.0),
        };
        assert!(model.rsrp_dbm(&bad_range, &profile).is_err());
    }

    #[test]
    fn test_check_rsrp_band_bounds() {
        assert!(check_rsrp_band(RSRP_MIN_DBM).is_ok());
        assert!(check_rsrp_band(RSRP_MAX_DBM).is_ok());
        assert!(check_rsrp_band(-140.01).is_err());
        assert!(check_rsrp_band(-49.99).is_err());
        assert!(check_rsrp_band(f64::NAN).is_err());
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(PropagationMode::Physics.to_string(), "physics");
        assert_eq!(PropagationMode::LinearElevation.to_string(), "linear_elevation");
    }
}
