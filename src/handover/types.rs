use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ephemeris::GeoLocation;

/// A scored satellite at one instant, as seen from one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteObservation {
    pub id: String,
    pub name: Option<String>,
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
    pub slant_range_km: f64,
    pub rsrp_dbm: f64,
    pub timestamp: DateTime<Utc>,
}

/// One bisection step. `window_start..window_end` is the window the step
/// started from; `selected_satellite` won at `midpoint`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinarySearchIteration {
    pub iteration: u32,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub midpoint: DateTime<Utc>,
    pub selected_satellite: String,
    #[serde(with = "serde_seconds")]
    pub window_width: Duration,
    pub converged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementResult {
    pub trigger_time: DateTime<Utc>,
    pub iterations: Vec<BinarySearchIteration>,
    pub total_iterations: u32,
    #[serde(with = "serde_seconds")]
    pub final_window_width: Duration,
    pub precision_achieved: bool,
    /// A midpoint was won by a satellite that is neither the start nor the
    /// end winner, so the window holds more than one crossover.
    pub ambiguous_crossover: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub ue_id: String,
    pub location: GeoLocation,
    pub t0: DateTime<Utc>,
    #[serde(with = "serde_seconds")]
    pub delta_t: Duration,
    #[serde(with = "serde_seconds")]
    pub precision_threshold: Duration,
}

/// Outcome of one two-point prediction. Built once and handed to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub prediction_id: Uuid,
    pub ue_id: String,
    pub t0: DateTime<Utc>,
    pub t1: DateTime<Utc>,
    #[serde(with = "serde_seconds")]
    pub delta_t: Duration,
    pub current_satellite: SatelliteObservation,
    pub future_satellite: SatelliteObservation,
    pub handover_required: bool,
    pub trigger_time: Option<DateTime<Utc>>,
    pub confidence: f64,
    pub refinement: Option<RefinementResult>,
}

impl PredictionRecord {
    /// Bisection trace; empty when no handover was required.
    pub fn iterations(&self) -> &[BinarySearchIteration] {
        self.refinement
            .as_ref()
            .map(|r| r.iterations.as_slice())
            .unwrap_or(&[])
    }
}

pub fn duration_secs(duration: Duration) -> f64 {
    match duration.num_nanoseconds() {
        Some(ns) => ns as f64 / 1e9,
        None => duration.num_milliseconds() as f64 / 1e3,
    }
}

/// chrono durations as fractional seconds.
pub(crate) mod serde_seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(super::duration_secs(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() {
            return Err(serde::de::Error::custom("duration must be finite"));
        }
        Ok(Duration::nanoseconds((secs * 1e9).round() as i64))
    }
}
