//! Concurrent predictions for independent UEs.
//!
//! Each request runs on its own blocking task against the shared, read-only
//! predictor. One failing request never affects another.

use std::sync::Arc;

use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};

use crate::ephemeris::EphemerisSource;
use crate::handover::{PredictError, PredictionRecord, PredictionRequest, TwoPointPredictor};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("prediction task for {ue_id} did not complete: {source}")]
    Join {
        ue_id: String,
        #[source]
        source: JoinError,
    },
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub ue_id: String,
    pub result: Result<PredictionRecord, PredictError>,
}

/// Run every request concurrently. Outcomes come back in request order.
pub async fn predict_all<E>(
    predictor: Arc<TwoPointPredictor<E>>,
    requests: Vec<PredictionRequest>,
) -> Result<Vec<BatchOutcome>, BatchError>
where
    E: EphemerisSource + 'static,
{
    let handles: Vec<(String, JoinHandle<Result<PredictionRecord, PredictError>>)> = requests
        .into_iter()
        .map(|request| {
            let predictor = predictor.clone();
            let ue_id = request.ue_id.clone();
            let handle = tokio::task::spawn_blocking(move || predictor.predict(&request));
            (ue_id, handle)
        })
        .collect();

    log::info!("Started {} prediction tasks", handles.len());

    let mut outcomes = Vec::with_capacity(handles.len());
    for (ue_id, handle) in handles {
        let result = handle.await.map_err(|source| BatchError::Join {
            ue_id: ue_id.clone(),
            source,
        })?;
        if let Err(e) = &result {
            log::warn!("Prediction for {} failed: {}", ue_id, e);
        }
        outcomes.push(BatchOutcome { ue_id, result });
    }

    Ok(outcomes)
}
