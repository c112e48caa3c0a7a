use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropagationError {
    #[error("RSRP {rsrp_dbm:.2} dBm outside valid band [{min_dbm}, {max_dbm}] dBm")]
    InvalidSignalRange {
        rsrp_dbm: f64,
        min_dbm: f64,
        max_dbm: f64,
    },
    #[error("invalid link geometry: {0}")]
    InvalidGeometry(String),
    #[error("unknown constellation: {0}")]
    UnknownConstellation(String),
}
