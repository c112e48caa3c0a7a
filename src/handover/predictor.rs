use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use crate::ephemeris::EphemerisSource;
use crate::handover::{
    duration_secs, prediction_confidence, BinarySearchRefiner, PredictError, PredictionHook,
    PredictionRecord, PredictionRequest, SatelliteSelector,
};

/// Samples the best satellite at `t0` and `t0 + delta_t` and, when they
/// differ, bisects the window for the switch-over instant.
pub struct TwoPointPredictor<E> {
    selector: SatelliteSelector<E>,
    hook: Option<Arc<dyn PredictionHook>>,
}

impl<E: EphemerisSource> TwoPointPredictor<E> {
    pub fn new(selector: SatelliteSelector<E>) -> Self {
        Self {
            selector,
            hook: None,
        }
    }

    /// Called once with every record `predict` returns successfully.
    pub fn with_hook(mut self, hook: Arc<dyn PredictionHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn selector(&self) -> &SatelliteSelector<E> {
        &self.selector
    }

    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionRecord, PredictError> {
        if request.delta_t <= Duration::zero() {
            return Err(PredictError::InvalidHorizon(duration_secs(request.delta_t)));
        }
        if request.precision_threshold <= Duration::zero() {
            return Err(PredictError::InvalidPrecision(duration_secs(
                request.precision_threshold,
            )));
        }

        let t0 = request.t0;
        let t1 = t0
            .checked_add_signed(request.delta_t)
            .ok_or(PredictError::InvalidHorizon(duration_secs(request.delta_t)))?;

        let current = self.selector.select_best(t0, &request.location)?;
        let future = self.selector.select_best(t1, &request.location)?;
        let handover_required = current.id != future.id;

        let refinement = if handover_required {
            let refiner = BinarySearchRefiner::new(&self.selector);
            Some(refiner.refine(
                &request.location,
                t0,
                t1,
                &current.id,
                &future.id,
                request.precision_threshold,
            )?)
        } else {
            None
        };

        let confidence = prediction_confidence(request.delta_t, &current, &future);

        let record = PredictionRecord {
            prediction_id: Uuid::new_v4(),
            ue_id: request.ue_id.clone(),
            t0,
            t1,
            delta_t: request.delta_t,
            trigger_time: refinement.as_ref().map(|r| r.trigger_time),
            current_satellite: current,
            future_satellite: future,
            handover_required,
            confidence,
            refinement,
        };

        match record.trigger_time {
            Some(trigger) => log::info!(
                "UE {}: handover {} -> {} at {} (confidence {:.3})",
                record.ue_id,
                record.current_satellite.id,
                record.future_satellite.id,
                trigger,
                record.confidence
            ),
            None => log::info!(
                "UE {}: staying on {} until {} (confidence {:.3})",
                record.ue_id,
                record.current_satellite.id,
                t1,
                record.confidence
            ),
        }

        if let Some(hook) = &self.hook {
            hook.on_prediction_complete(&record);
        }

        Ok(record)
    }
}
