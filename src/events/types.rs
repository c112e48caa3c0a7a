use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::events::EventError;
use crate::signal::{check_rsrp_band, RSRP_MAX_DBM, RSRP_MIN_DBM};

/// Gaps may drift this far from the nominal interval.
const INTERVAL_TOLERANCE_MS: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum EventType {
    A4,
    A5,
}

fn default_threshold_dbm() -> f64 {
    -106.0
}

fn default_hysteresis_db() -> f64 {
    2.0
}

fn default_time_to_trigger_ms() -> u64 {
    160
}

/// Neighbour becomes better than an absolute threshold.
/// Entering condition: `Mn + Ofn + Ocn - Hys > Thresh`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct A4Config {
    #[serde(default = "default_threshold_dbm")]
    pub threshold_dbm: f64,
    #[serde(default = "default_hysteresis_db")]
    pub hysteresis_db: f64,
    #[serde(default = "default_time_to_trigger_ms")]
    pub time_to_trigger_ms: u64,
    /// Frequency specific offset (Ofn).
    #[serde(default)]
    pub frequency_offset_db: f64,
    /// Cell individual offset (Ocn).
    #[serde(default)]
    pub cell_offset_db: f64,
}

impl Default for A4Config {
    fn default() -> Self {
        Self {
            threshold_dbm: default_threshold_dbm(),
            hysteresis_db: default_hysteresis_db(),
            time_to_trigger_ms: default_time_to_trigger_ms(),
            frequency_offset_db: 0.0,
            cell_offset_db: 0.0,
        }
    }
}

impl A4Config {
    pub fn validate(&self) -> Result<(), EventError> {
        validate_common(
            EventType::A4,
            &[self.threshold_dbm],
            self.hysteresis_db,
            self.time_to_trigger_ms,
            self.frequency_offset_db + self.cell_offset_db,
        )
    }

    pub fn thresholds(&self) -> TriggerThresholds {
        TriggerThresholds {
            neighbour_threshold_dbm: self.threshold_dbm,
            serving_threshold_dbm: None,
            hysteresis_db: self.hysteresis_db,
            neighbour_offset_db: self.frequency_offset_db + self.cell_offset_db,
            time_to_trigger_ms: self.time_to_trigger_ms,
        }
    }
}

/// Serving falls below `threshold1` while the neighbour rises above `threshold2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct A5Config {
    #[serde(default = "default_threshold_dbm")]
    pub threshold1_dbm: f64,
    #[serde(default = "default_threshold_dbm")]
    pub threshold2_dbm: f64,
    #[serde(default = "default_hysteresis_db")]
    pub hysteresis_db: f64,
    #[serde(default = "default_time_to_trigger_ms")]
    pub time_to_trigger_ms: u64,
    #[serde(default)]
    pub frequency_offset_db: f64,
    #[serde(default)]
    pub cell_offset_db: f64,
}

impl Default for A5Config {
    fn default() -> Self {
        Self {
            threshold1_dbm: default_threshold_dbm(),
            threshold2_dbm: default_threshold_dbm(),
            hysteresis_db: default_hysteresis_db(),
            time_to_trigger_ms: default_time_to_trigger_ms(),
            frequency_offset_db: 0.0,
            cell_offset_db: 0.0,
        }
    }
}

impl A5Config {
    pub fn validate(&self) -> Result<(), EventError> {
        validate_common(
            EventType::A5,
            &[self.threshold1_dbm, self.threshold2_dbm],
            self.hysteresis_db,
            self.time_to_trigger_ms,
            self.frequency_offset_db + self.cell_offset_db,
        )
    }

    pub fn thresholds(&self) -> TriggerThresholds {
        TriggerThresholds {
            neighbour_threshold_dbm: self.threshold2_dbm,
            serving_threshold_dbm: Some(self.threshold1_dbm),
            hysteresis_db: self.hysteresis_db,
            neighbour_offset_db: self.frequency_offset_db + self.cell_offset_db,
            time_to_trigger_ms: self.time_to_trigger_ms,
        }
    }
}

fn validate_common(
    event: EventType,
    thresholds: &[f64],
    hysteresis_db: f64,
    time_to_trigger_ms: u64,
    offset_db: f64,
) -> Result<(), EventError> {
    let invalid = |message: String| EventError::InvalidConfig { event, message };

    if let Some(t) = thresholds.iter().find(|t| !t.is_finite()) {
        return Err(invalid(format!("threshold {} is not finite", t)));
    }
    if !hysteresis_db.is_finite() || hysteresis_db < 0.0 {
        return Err(invalid(format!(
            "hysteresis must be a non-negative number, got {}",
            hysteresis_db
        )));
    }
    if !offset_db.is_finite() {
        return Err(invalid("measurement offsets must be finite".into()));
    }
    if time_to_trigger_ms == 0 {
        return Err(invalid("time_to_trigger_ms must be positive".into()));
    }
    if time_to_trigger(time_to_trigger_ms).is_none() {
        return Err(invalid(format!(
            "time_to_trigger_ms {} is out of range",
            time_to_trigger_ms
        )));
    }
    Ok(())
}

fn time_to_trigger(ms: u64) -> Option<Duration> {
    i64::try_from(ms).ok().and_then(Duration::try_milliseconds)
}

/// The parameters an event was evaluated with, carried on every event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerThresholds {
    pub neighbour_threshold_dbm: f64,
    pub serving_threshold_dbm: Option<f64>,
    pub hysteresis_db: f64,
    /// Ofn + Ocn.
    pub neighbour_offset_db: f64,
    pub time_to_trigger_ms: u64,
}

impl TriggerThresholds {
    /// `None` when the value does not fit a chrono duration.
    pub fn time_to_trigger(&self) -> Option<Duration> {
        time_to_trigger(self.time_to_trigger_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSample {
    pub timestamp: DateTime<Utc>,
    pub neighbour_rsrp_dbm: f64,
    /// Needed for A5 only.
    #[serde(default)]
    pub serving_rsrp_dbm: Option<f64>,
}

/// Time-ordered RSRP samples for one neighbour satellite on a uniform grid.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementSeries {
    samples: Vec<MeasurementSample>,
    interval: Option<Duration>,
}

impl MeasurementSeries {
    /// Infers the sampling interval from the first gap.
    ///
    /// An empty history is rejected with [`EventError::EmptySeries`]: it has
    /// no interval to check against, and callers feed one series per tracked
    /// satellite, so an empty one means the measurement feed is broken.
    pub fn new(samples: Vec<MeasurementSample>) -> Result<Self, EventError> {
        let interval = match samples.as_slice() {
            [first, second, ..] => Some(second.timestamp - first.timestamp),
            _ => None,
        };
        Self::build(samples, interval)
    }

    pub fn with_interval(
        samples: Vec<MeasurementSample>,
        interval: Duration,
    ) -> Result<Self, EventError> {
        Self::build(samples, Some(interval))
    }

    fn build(
        samples: Vec<MeasurementSample>,
        interval: Option<Duration>,
    ) -> Result<Self, EventError> {
        if samples.is_empty() {
            return Err(EventError::EmptySeries);
        }

        for sample in &samples {
            check_sample_band(sample.timestamp, sample.neighbour_rsrp_dbm)?;
            if let Some(serving) = sample.serving_rsrp_dbm {
                check_sample_band(sample.timestamp, serving)?;
            }
        }

        if let Some(expected) = interval {
            if expected <= Duration::zero() {
                return Err(EventError::UnorderedSamples { index: 1 });
            }
            for (i, pair) in samples.windows(2).enumerate() {
                let gap = pair[1].timestamp - pair[0].timestamp;
                if gap <= Duration::zero() {
                    return Err(EventError::UnorderedSamples { index: i + 1 });
                }
                let drift = (gap - expected).num_milliseconds().abs();
                if drift > INTERVAL_TOLERANCE_MS {
                    return Err(EventError::NonUniformInterval {
                        index: i + 1,
                        expected_ms: expected.num_milliseconds(),
                        actual_ms: gap.num_milliseconds(),
                    });
                }
            }
        }

        Ok(Self { samples, interval })
    }

    pub fn samples(&self) -> &[MeasurementSample] {
        &self.samples
    }

    /// `None` for a single-sample series.
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

fn check_sample_band(timestamp: DateTime<Utc>, rsrp_dbm: f64) -> Result<(), EventError> {
    check_rsrp_band(rsrp_dbm).map_err(|_| EventError::InvalidSignalRange {
        timestamp,
        rsrp_dbm,
        min_dbm: RSRP_MIN_DBM,
        max_dbm: RSRP_MAX_DBM,
    })
}

/// Measurement history for one satellite as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedSeries {
    pub satellite_id: String,
    #[serde(default)]
    pub interval_ms: Option<i64>,
    pub samples: Vec<MeasurementSample>,
}

impl RecordedSeries {
    pub fn into_series(self) -> Result<(String, MeasurementSeries), EventError> {
        let series = match self.interval_ms {
            Some(ms) => MeasurementSeries::with_interval(self.samples, Duration::milliseconds(ms))?,
            None => MeasurementSeries::new(self.samples)?,
        };
        Ok((self.satellite_id, series))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoverEvent {
    pub event_type: EventType,
    pub satellite_id: String,
    /// First instant the sustain condition held.
    pub trigger_time: DateTime<Utc>,
    /// Sample at which the leaving condition held, or the last sample of the
    /// series while the event is still open.
    pub end_time: DateTime<Utc>,
    /// From the first qualifying sample of the run to `end_time`.
    pub duration_ms: i64,
    /// The series ended before the leaving condition held.
    pub ongoing: bool,
    pub neighbour_rsrp_dbm: f64,
    pub serving_rsrp_dbm: Option<f64>,
    pub thresholds: TriggerThresholds,
    /// 0 to 100, linear in the margin above the entering threshold.
    pub suitability_score: f64,
    pub sustained_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::milliseconds(ms)
    }

    fn sample(ms: i64, rsrp: f64) -> MeasurementSample {
        MeasurementSample {
            timestamp: at(ms),
            neighbour_rsrp_dbm: rsrp,
            serving_rsrp_dbm: None,
        }
    }

    #[test]
    fn test_series_infers_interval() {
        let series = MeasurementSeries::new(vec![
            sample(0, -100.0),
            sample(40, -100.0),
            sample(81, -100.0),
        ])
        .unwrap();
        assert_eq!(series.interval(), Some(Duration::milliseconds(40)));
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn test_series_rejects_gaps() {
        let result = MeasurementSeries::new(vec![
            sample(0, -100.0),
            sample(40, -100.0),
            sample(120, -100.0),
        ]);
        assert_eq!(
            result,
            Err(EventError::NonUniformInterval {
                index: 2,
                expected_ms: 40,
                actual_ms: 80
            })
        );
    }

    #[test]
    fn test_series_rejects_out_of_order() {
        let result = MeasurementSeries::new(vec![sample(40, -100.0), sample(0, -100.0)]);
        assert!(matches!(result, Err(EventError::UnorderedSamples { index: 1 })));
    }

    #[test]
    fn test_series_rejects_out_of_band_rsrp() {
        let mut serving = sample(40, -100.0);
        serving.serving_rsrp_dbm = Some(-150.0);
        let result = MeasurementSeries::new(vec![sample(0, -100.0), serving]);
        assert!(matches!(
            result,
            Err(EventError::InvalidSignalRange { rsrp_dbm, .. }) if rsrp_dbm == -150.0
        ));

        let result = MeasurementSeries::new(vec![sample(0, -45.0)]);
        assert!(matches!(result, Err(EventError::InvalidSignalRange { .. })));
    }

    #[test]
    fn test_empty_history_is_a_data_error() {
        assert_eq!(MeasurementSeries::new(vec![]), Err(EventError::EmptySeries));
        assert_eq!(
            MeasurementSeries::with_interval(vec![], Duration::milliseconds(40)),
            Err(EventError::EmptySeries)
        );

        let recorded = RecordedSeries {
            satellite_id: "STARLINK-1008".into(),
            interval_ms: None,
            samples: vec![],
        };
        assert_eq!(recorded.into_series().unwrap_err(), EventError::EmptySeries);
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let a4: A4Config = serde_yaml::from_str("threshold_dbm: -100").unwrap();
        assert_eq!(a4.hysteresis_db, 2.0);
        assert_eq!(a4.time_to_trigger_ms, 160);
        assert!(a4.validate().is_ok());

        let zero_ttt = A4Config {
            time_to_trigger_ms: 0,
            ..A4Config::default()
        };
        assert!(matches!(
            zero_ttt.validate(),
            Err(EventError::InvalidConfig { event: EventType::A4, .. })
        ));

        let negative_hys = A5Config {
            hysteresis_db: -1.0,
            ..A5Config::default()
        };
        assert!(negative_hys.validate().is_err());
    }

    #[test]
    fn test_time_to_trigger_beyond_chrono_range_is_rejected() {
        for ttt in [u64::MAX, i64::MAX as u64 + 1] {
            let a4 = A4Config {
                time_to_trigger_ms: ttt,
                ..A4Config::default()
            };
            assert!(matches!(
                a4.validate(),
                Err(EventError::InvalidConfig { event: EventType::A4, .. })
            ));
            let a5 = A5Config {
                time_to_trigger_ms: ttt,
                ..A5Config::default()
            };
            assert!(matches!(
                a5.validate(),
                Err(EventError::InvalidConfig { event: EventType::A5, .. })
            ));
        }

        let day = A4Config {
            time_to_trigger_ms: 86_400_000,
            ..A4Config::default()
        };
        assert!(day.validate().is_ok());
        assert_eq!(day.thresholds().time_to_trigger(), Some(Duration::days(1)));
    }

    #[test]
    fn test_recorded_series_from_json() {
        let json = r#"{
            "satellite_id": "STARLINK-1008",
            "interval_ms": 40,
            "samples": [
                {"timestamp": "2025-01-01T00:00:00Z", "neighbour_rsrp_dbm": -101.5},
                {"timestamp": "2025-01-01T00:00:00.040Z", "neighbour_rsrp_dbm": -101.0, "serving_rsrp_dbm": -110.0}
            ]
        }"#;
        let recorded: RecordedSeries = serde_json::from_str(json).unwrap();
        let (id, series) = recorded.into_series().unwrap();
        assert_eq!(id, "STARLINK-1008");
        assert_eq!(series.samples()[1].serving_rsrp_dbm, Some(-110.0));
    }
}
