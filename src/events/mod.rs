mod corroborate;
mod engine;
mod error;
mod types;

pub use corroborate::{corroborate, Corroboration};
pub use engine::{suitability_score, EventTriggerEngine};
pub use error::EventError;
pub use types::{
    A4Config, A5Config, EventType, HandoverEvent, MeasurementSample, MeasurementSeries,
    RecordedSeries, TriggerThresholds,
};
