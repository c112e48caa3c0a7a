use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::ephemeris::EphemerisError;
use crate::signal::PropagationError;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("no visible satellite at {time} above {min_elevation_deg} deg")]
    NoVisibleSatellite {
        time: DateTime<Utc>,
        min_elevation_deg: f64,
    },
    #[error("prediction horizon must be positive, got {0}s")]
    InvalidHorizon(f64),
    #[error("precision threshold must be positive, got {0}s")]
    InvalidPrecision(f64),
    #[error("signal error: {0}")]
    Signal(#[from] PropagationError),
    #[error("ephemeris error: {0}")]
    Ephemeris(#[from] EphemerisError),
}
