use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::events::{EventType, HandoverEvent};
use crate::handover::{duration_secs, PredictionRecord};

/// How a detected event stream lines up with a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Corroboration {
    /// An event for the predicted target fired within tolerance of the trigger.
    Agrees {
        event_type: EventType,
        satellite_id: String,
        offset_secs: f64,
    },
    Disagrees { reason: String },
    /// Nothing in the events speaks for or against the prediction.
    Unconfirmed,
}

/// Compare a prediction with events detected from measurement history.
///
/// A predicted handover agrees when an event for the future satellite lies
/// within `tolerance` of the trigger time, and disagrees when such events
/// exist but all fall outside it. A prediction of no handover disagrees
/// with any event for another satellite inside `[t0, t1]`.
pub fn corroborate(
    record: &PredictionRecord,
    events: &[HandoverEvent],
    tolerance: Duration,
) -> Corroboration {
    match record.trigger_time {
        Some(trigger) => {
            let target = &record.future_satellite.id;
            let nearest = events
                .iter()
                .filter(|e| &e.satellite_id == target)
                .min_by_key(|e| (e.trigger_time - trigger).abs());

            match nearest {
                Some(event) if (event.trigger_time - trigger).abs() <= tolerance => {
                    Corroboration::Agrees {
                        event_type: event.event_type,
                        satellite_id: event.satellite_id.clone(),
                        offset_secs: duration_secs(event.trigger_time - trigger),
                    }
                }
                Some(event) => Corroboration::Disagrees {
                    reason: format!(
                        "nearest {} event for {} is {:.3}s from the predicted trigger",
                        event.event_type,
                        target,
                        duration_secs(event.trigger_time - trigger)
                    ),
                },
                None => Corroboration::Unconfirmed,
            }
        }
        None => {
            let serving = &record.current_satellite.id;
            let conflicting = events.iter().find(|e| {
                &e.satellite_id != serving
                    && e.trigger_time >= record.t0
                    && e.trigger_time <= record.t1
            });
            match conflicting {
                Some(event) => Corroboration::Disagrees {
                    reason: format!(
                        "{} event for {} at {} while {} was predicted to stay",
                        event.event_type, event.satellite_id, event.trigger_time, serving
                    ),
                },
                None => Corroboration::Unconfirmed,
            }
        }
    }
}
