use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::events::EventType;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EventError {
    #[error("RSRP {rsrp_dbm:.2} dBm at {timestamp} outside valid band [{min_dbm}, {max_dbm}] dBm")]
    InvalidSignalRange {
        timestamp: DateTime<Utc>,
        rsrp_dbm: f64,
        min_dbm: f64,
        max_dbm: f64,
    },
    #[error("sample {index} arrives {actual_ms} ms after the previous one, expected {expected_ms} ms")]
    NonUniformInterval {
        index: usize,
        expected_ms: i64,
        actual_ms: i64,
    },
    #[error("sample {index} is not later than the previous one")]
    UnorderedSamples { index: usize },
    #[error("invalid {event} configuration: {message}")]
    InvalidConfig { event: EventType, message: String },
    #[error("measurement series is empty")]
    EmptySeries,
}
