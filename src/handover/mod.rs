mod confidence;
mod error;
mod hook;
mod predictor;
mod refiner;
mod selector;
mod types;

pub use confidence::{confidence_score, prediction_confidence, CONFIDENCE_MAX, CONFIDENCE_MIN};
pub use error::PredictError;
pub use hook::PredictionHook;
pub use predictor::TwoPointPredictor;
pub use refiner::{BinarySearchRefiner, MAX_ITERATIONS};
pub use selector::{SatelliteSelector, DEFAULT_MIN_ELEVATION_DEG};
pub use types::{
    duration_secs, BinarySearchIteration, PredictionRecord, PredictionRequest, RefinementResult,
    SatelliteObservation,
};
