use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EphemerisError {
    #[error("ephemeris query exceeded its {0:?} budget")]
    Timeout(Duration),
    #[error("ephemeris unavailable: {0}")]
    Unavailable(String),
    #[error("TLE directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("TLE file read error: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("invalid TLE format in {file}: {message}")]
    InvalidTle { file: String, message: String },
    #[error("propagation error: {0}")]
    Propagation(String),
}
