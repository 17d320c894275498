use chrono::{DateTime, Utc};
use tracing::trace;

use crate::{Reading, config::ThresholdSpec, throttle::AlertThrottle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceEvaluation {
    /// At or below the limit, the throttle is not consulted.
    Ok,
    /// Above the limit, but the category is still cooling down.
    Exceeding,
    /// Above the limit and allowed through: send an alert.
    Alert,
}

impl ResourceEvaluation {
    /// Compare `value` against `spec` and, only when it is above the limit,
    /// ask the throttle whether the category may fire at `now`.
    pub fn evaluate(
        value: f32,
        spec: &ThresholdSpec,
        throttle: &mut AlertThrottle,
        now: DateTime<Utc>,
    ) -> ResourceEvaluation {
        if !spec.is_exceeded_by(value) {
            return ResourceEvaluation::Ok;
        }

        if throttle.should_fire(spec.category, now) {
            return ResourceEvaluation::Alert;
        }

        ResourceEvaluation::Exceeding
    }

    pub fn of_reading(
        reading: &Reading,
        spec: &ThresholdSpec,
        throttle: &mut AlertThrottle,
        now: DateTime<Utc>,
    ) -> ResourceEvaluation {
        let evaluation = Self::evaluate(reading.value, spec, throttle, now);
        trace!(
            "{}: {} (max: {}) -> {evaluation:?}",
            spec.category, reading.value, spec.limit
        );
        evaluation
    }
}
