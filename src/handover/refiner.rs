use chrono::{DateTime, Duration, Utc};

use crate::ephemeris::{EphemerisSource, GeoLocation};
use crate::handover::{
    duration_secs, BinarySearchIteration, PredictError, RefinementResult, SatelliteSelector,
};

/// Hard cap on bisection steps. Hitting it is a normal outcome.
pub const MAX_ITERATIONS: u32 = 10;

/// Bisects a window known to contain a change of serving satellite, using
/// the selector as an oracle.
///
/// The midpoint winner is compared against the satellite that was best at
/// the window start: a match moves the start forward, anything else pulls
/// the end back. With a single crossover this converges on the first
/// instant the new satellite is best.
pub struct BinarySearchRefiner<'a, E> {
    selector: &'a SatelliteSelector<E>,
}

impl<'a, E: EphemerisSource> BinarySearchRefiner<'a, E> {
    pub fn new(selector: &'a SatelliteSelector<E>) -> Self {
        Self { selector }
    }

    pub fn refine(
        &self,
        location: &GeoLocation,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        start_satellite: &str,
        end_satellite: &str,
        precision_threshold: Duration,
    ) -> Result<RefinementResult, PredictError> {
        if end <= start {
            return Err(PredictError::InvalidHorizon(duration_secs(end - start)));
        }
        if precision_threshold <= Duration::zero() {
            return Err(PredictError::InvalidPrecision(duration_secs(
                precision_threshold,
            )));
        }

        let mut low = start;
        let mut high = end;
        let mut iterations = Vec::new();
        let mut ambiguous_crossover = false;

        for iteration in 1..=MAX_ITERATIONS {
            let width = high - low;
            let mid = low + width / 2;
            let winner = self.selector.select_best(mid, location)?;
            let converged = width <= precision_threshold;

            log::debug!(
                "iteration {}: window {:.3}s, midpoint winner {}",
                iteration,
                duration_secs(width),
                winner.id
            );

            if winner.id != start_satellite && winner.id != end_satellite {
                log::warn!(
                    "satellite {} best at {} is neither {} nor {}",
                    winner.id,
                    mid,
                    start_satellite,
                    end_satellite
                );
                ambiguous_crossover = true;
            }

            let moves_start = winner.id == start_satellite;
            iterations.push(BinarySearchIteration {
                iteration,
                window_start: low,
                window_end: high,
                midpoint: mid,
                selected_satellite: winner.id,
                window_width: width,
                converged,
            });

            if converged {
                break;
            }

            if moves_start {
                low = mid;
            } else {
                high = mid;
            }
        }

        let final_window_width = high - low;
        let trigger_time = low + final_window_width / 2;
        let precision_achieved = final_window_width <= precision_threshold;

        log::info!(
            "refinement finished after {} iterations, window {:.3}s, trigger at {}",
            iterations.len(),
            duration_secs(final_window_width),
            trigger_time
        );

        Ok(RefinementResult {
            trigger_time,
            total_iterations: iterations.len() as u32,
            iterations,
            final_window_width,
            precision_achieved,
            ambiguous_crossover,
        })
    }
}
