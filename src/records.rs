//! JSON-lines persistence for prediction records, attached to the
//! predictor as a completion hook.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::error;
use thiserror::Error;

use crate::handover::{PredictionHook, PredictionRecord};

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Bad record on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Appends one JSON object per line for every completed prediction.
pub struct JsonLinesRecorder {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesRecorder {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RecordError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(JsonLinesRecorder {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &PredictionRecord) -> Result<(), RecordError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        // poisoned only if a writer panicked; the handle is still valid
        let mut file = match self.file.lock() {
            Ok(f) => f,
            Err(poisoned) => poisoned.into_inner(),
        };
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }
}

impl PredictionHook for JsonLinesRecorder {
    fn on_prediction_complete(&self, record: &PredictionRecord) {
        if let Err(e) = self.append(record) {
            error!(
                "Failed to record prediction {} to {}: {}",
                record.prediction_id,
                self.path.display(),
                e
            );
        }
    }
}

/// Read back every record in a JSON-lines file. Blank lines are skipped.
pub fn load_records(path: &Path) -> Result<Vec<PredictionRecord>, RecordError> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| RecordError::Parse {
            line: i + 1,
            source,
        })?;
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handover::SatelliteObservation;
    use crate::testing::epoch;
    use chrono::Duration;
    use uuid::Uuid;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("leo-handover-{}", Uuid::new_v4()))
            .join(name)
    }

    fn record(ue_id: &str) -> PredictionRecord {
        let observation = SatelliteObservation {
            id: "A".into(),
            name: Some("STARLINK-1".into()),
            elevation_deg: 40.0,
            azimuth_deg: 120.0,
            slant_range_km: 840.0,
            rsrp_dbm: -72.5,
            timestamp: epoch(),
        };
        PredictionRecord {
            prediction_id: Uuid::new_v4(),
            ue_id: ue_id.into(),
            t0: epoch(),
            t1: epoch() + Duration::seconds(5),
            delta_t: Duration::seconds(5),
            current_satellite: observation.clone(),
            future_satellite: observation,
            handover_required: false,
            trigger_time: None,
            confidence: 0.875,
            refinement: None,
        }
    }

    #[test]
    fn test_hook_appends_and_loads_back() {
        let path = temp_path("records.jsonl");
        let recorder = JsonLinesRecorder::open(&path).unwrap();
        let first = record("ue-1");
        let second = record("ue-2");

        recorder.on_prediction_complete(&first);
        recorder.on_prediction_complete(&second);

        let loaded = load_records(recorder.path()).unwrap();
        assert_eq!(loaded, vec![first, second]);

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_reopen_appends() {
        let path = temp_path("records.jsonl");
        JsonLinesRecorder::open(&path)
            .unwrap()
            .append(&record("ue-1"))
            .unwrap();
        JsonLinesRecorder::open(&path)
            .unwrap()
            .append(&record("ue-2"))
            .unwrap();

        let loaded = load_records(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].ue_id, "ue-2");

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_corrupt_line_reports_line_number() {
        let path = temp_path("records.jsonl");
        let recorder = JsonLinesRecorder::open(&path).unwrap();
        recorder.append(&record("ue-1")).unwrap();
        std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"\n{not json}\n")
            .unwrap();

        let result = load_records(&path);
        assert!(matches!(result, Err(RecordError::Parse { line: 3, .. })));

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }
}
