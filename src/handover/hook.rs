use crate::handover::PredictionRecord;

/// Caller-supplied completion hook, invoked once for every successful
/// prediction. Persistence and rollback triggering live behind this seam.
pub trait PredictionHook: Send + Sync {
    fn on_prediction_complete(&self, record: &PredictionRecord);
}

impl<F> PredictionHook for F
where
    F: Fn(&PredictionRecord) + Send + Sync,
{
    fn on_prediction_complete(&self, record: &PredictionRecord) {
        self(record)
    }
}
