use chrono::Duration;

use crate::handover::{duration_secs, SatelliteObservation};

pub const CONFIDENCE_MIN: f64 = 0.85;
pub const CONFIDENCE_MAX: f64 = 0.99;

const BASE_CONFIDENCE: f64 = 0.95;
const TIME_FACTOR_FLOOR: f64 = 0.8;
/// Horizon at which the time factor is exactly 1.
const TIME_FACTOR_PIVOT_SECS: f64 = 5.0;
const TIME_FACTOR_SLOPE_PER_SEC: f64 = 0.01;
const SIGNAL_REFERENCE_DB: f64 = 140.0;
const ELEVATION_REFERENCE_DEG: f64 = 90.0;

/// Heuristic trust in a prediction, always within
/// `[CONFIDENCE_MIN, CONFIDENCE_MAX]`.
///
/// Longer horizons lower the score. Larger magnitudes of the two RSRP
/// readings and higher elevations raise it; those two factors saturate at 1.
pub fn confidence_score(
    delta_t_secs: f64,
    current_rsrp_dbm: f64,
    future_rsrp_dbm: f64,
    current_elevation_deg: f64,
    future_elevation_deg: f64,
) -> f64 {
    let time_factor = (1.0 - (delta_t_secs - TIME_FACTOR_PIVOT_SECS) * TIME_FACTOR_SLOPE_PER_SEC)
        .max(TIME_FACTOR_FLOOR);
    let signal_factor =
        ((current_rsrp_dbm.abs() + future_rsrp_dbm.abs()) / SIGNAL_REFERENCE_DB).min(1.0);
    let elevation_factor =
        ((current_elevation_deg + future_elevation_deg) / ELEVATION_REFERENCE_DEG).min(1.0);

    let score = BASE_CONFIDENCE * time_factor * signal_factor * elevation_factor;
    if !score.is_finite() {
        return CONFIDENCE_MIN;
    }
    score.clamp(CONFIDENCE_MIN, CONFIDENCE_MAX)
}

pub fn prediction_confidence(
    delta_t: Duration,
    current: &SatelliteObservation,
    future: &SatelliteObservation,
) -> f64 {
    confidence_score(
        duration_secs(delta_t),
        current.rsrp_dbm,
        future.rsrp_dbm,
        current.elevation_deg,
        future.elevation_deg,
    )
}
