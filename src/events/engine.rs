use chrono::{DateTime, Duration, Utc};

use crate::events::{
    A4Config, A5Config, EventError, EventType, HandoverEvent, MeasurementSample,
    MeasurementSeries, TriggerThresholds,
};

/// Margin above the entering threshold that earns a full suitability score.
const FULL_SUITABILITY_MARGIN_DB: f64 = 15.0;

/// Evaluates recorded measurement history against A4/A5 rules.
///
/// Entering side: a rule fires at the first sample where a run of
/// consecutive qualifying samples has lasted `time_to_trigger`. Any
/// non-qualifying sample ends the run.
///
/// Once fired the rule stays in the event, ignoring entering, until its
/// leaving condition holds. Samples between the two hysteresis edges
/// neither re-arm nor close the event.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventTriggerEngine;

impl EventTriggerEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn detect_events(
        &self,
        satellite_id: &str,
        series: &MeasurementSeries,
        a4: Option<&A4Config>,
        a5: Option<&A5Config>,
    ) -> Result<Vec<HandoverEvent>, EventError> {
        let mut events = Vec::new();

        if let Some(config) = a4 {
            config.validate()?;
            let thresholds = config.thresholds();
            let hits = scan(
                series,
                &thresholds,
                |s| a4_margin(s, &thresholds),
                |s| a4_leaves(s, &thresholds),
            );
            events.extend(
                hits.into_iter()
                    .map(|hit| hit.into_event(EventType::A4, satellite_id, thresholds)),
            );
        }

        if let Some(config) = a5 {
            config.validate()?;
            let thresholds = config.thresholds();
            let hits = scan(
                series,
                &thresholds,
                |s| a5_margin(s, &thresholds),
                |s| a5_leaves(s, &thresholds),
            );
            events.extend(
                hits.into_iter()
                    .map(|hit| hit.into_event(EventType::A5, satellite_id, thresholds)),
            );
        }

        events.sort_by_key(|e| e.trigger_time);

        log::debug!(
            "{}: {} events over {} samples",
            satellite_id,
            events.len(),
            series.len()
        );
        Ok(events)
    }
}

/// `Mn + Ofn + Ocn - Hys - Thresh`, positive when A4 is entering.
fn a4_margin(sample: &MeasurementSample, thresholds: &TriggerThresholds) -> Option<f64> {
    let margin = neighbour_margin(sample, thresholds);
    (margin > 0.0).then_some(margin)
}

/// Both A5 legs must hold; the weaker one is the margin.
fn a5_margin(sample: &MeasurementSample, thresholds: &TriggerThresholds) -> Option<f64> {
    let serving = sample.serving_rsrp_dbm?;
    let threshold1 = thresholds.serving_threshold_dbm?;
    let serving_margin = threshold1 - (serving + thresholds.hysteresis_db);
    let neighbour_margin = neighbour_margin(sample, thresholds);
    (serving_margin > 0.0 && neighbour_margin > 0.0).then_some(serving_margin.min(neighbour_margin))
}

fn neighbour_margin(sample: &MeasurementSample, thresholds: &TriggerThresholds) -> f64 {
    sample.neighbour_rsrp_dbm + thresholds.neighbour_offset_db
        - thresholds.hysteresis_db
        - thresholds.neighbour_threshold_dbm
}

/// `Mn + Ofn + Ocn + Hys < Thresh`.
fn a4_leaves(sample: &MeasurementSample, thresholds: &TriggerThresholds) -> bool {
    sample.neighbour_rsrp_dbm + thresholds.neighbour_offset_db + thresholds.hysteresis_db
        < thresholds.neighbour_threshold_dbm
}

/// `Mp - Hys > Thresh1` or the A4 leaving test against `Thresh2`. Without a
/// serving reading only the neighbour leg can close the event.
fn a5_leaves(sample: &MeasurementSample, thresholds: &TriggerThresholds) -> bool {
    let serving_recovered = match (sample.serving_rsrp_dbm, thresholds.serving_threshold_dbm) {
        (Some(serving), Some(threshold1)) => serving - thresholds.hysteresis_db > threshold1,
        _ => false,
    };
    serving_recovered || a4_leaves(sample, thresholds)
}

pub fn suitability_score(margin_db: f64) -> f64 {
    (margin_db / FULL_SUITABILITY_MARGIN_DB * 100.0).clamp(0.0, 100.0)
}

struct Hit {
    sample: MeasurementSample,
    margin_db: f64,
    run_start: DateTime<Utc>,
    end: DateTime<Utc>,
    ongoing: bool,
}

impl Hit {
    fn into_event(
        self,
        event_type: EventType,
        satellite_id: &str,
        thresholds: TriggerThresholds,
    ) -> HandoverEvent {
        HandoverEvent {
            event_type,
            satellite_id: satellite_id.to_string(),
            trigger_time: self.sample.timestamp,
            end_time: self.end,
            duration_ms: (self.end - self.run_start).num_milliseconds(),
            ongoing: self.ongoing,
            neighbour_rsrp_dbm: self.sample.neighbour_rsrp_dbm,
            serving_rsrp_dbm: self.sample.serving_rsrp_dbm,
            thresholds,
            suitability_score: suitability_score(self.margin_db),
            sustained_ms: (self.sample.timestamp - self.run_start).num_milliseconds(),
        }
    }
}

fn scan<Q, L>(
    series: &MeasurementSeries,
    thresholds: &TriggerThresholds,
    qualifies: Q,
    leaves: L,
) -> Vec<Hit>
where
    Q: Fn(&MeasurementSample) -> Option<f64>,
    L: Fn(&MeasurementSample) -> bool,
{
    // validated configs always fit; anything else can never be reached
    let time_to_trigger = thresholds.time_to_trigger().unwrap_or(Duration::MAX);
    let mut hits: Vec<Hit> = Vec::new();
    let mut run_start: Option<DateTime<Utc>> = None;
    let mut open: Option<Hit> = None;

    for sample in series.samples() {
        if let Some(mut hit) = open.take() {
            hit.end = sample.timestamp;
            if leaves(sample) {
                hit.ongoing = false;
                hits.push(hit);
            } else {
                open = Some(hit);
            }
            continue;
        }

        let Some(margin_db) = qualifies(sample) else {
            run_start = None;
            continue;
        };

        let start = *run_start.get_or_insert(sample.timestamp);
        if sample.timestamp - start >= time_to_trigger {
            run_start = None;
            open = Some(Hit {
                sample: *sample,
                margin_db,
                run_start: start,
                end: sample.timestamp,
                ongoing: true,
            });
        }
    }

    hits.extend(open);
    hits
}
