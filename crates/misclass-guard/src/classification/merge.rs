//! Builds the scorer input from computed aggregates and recorded factors.

use super::domain::{ClassificationFactor, ClassificationInputData, ComputedFactors};

/// Baseline signals derived from the trailing time-entry window and live engagements.
pub fn baseline_input(computed: &ComputedFactors) -> ClassificationInputData {
    ClassificationInputData {
        hours_per_week: Some(computed.avg_weekly_hours),
        engagement_duration_weeks: Some(f64::from(computed.total_weeks)),
        multiple_clients: Some(computed.active_engagement_count > 1),
        ..ClassificationInputData::default()
    }
}

/// Overlays factor records on `baseline`, oldest first, so the newest record of each
/// category wins. Records whose value does not fit their category are skipped.
pub fn merge_factors(
    baseline: ClassificationInputData,
    factors: &[ClassificationFactor],
) -> ClassificationInputData {
    let mut ordered: Vec<&ClassificationFactor> = factors.iter().collect();
    ordered.sort_by_key(|factor| factor.created_at);

    let mut input = baseline;
    for factor in ordered {
        if !factor.category.apply(&factor.value, &mut input) {
            tracing::debug!(
                worker_id = %factor.worker_id,
                category = ?factor.category,
                "ignoring factor whose value does not match its category"
            );
        }
    }
    input
}

/// Convenience wrapper running both steps.
pub fn build_input(
    computed: &ComputedFactors,
    factors: &[ClassificationFactor],
) -> ClassificationInputData {
    merge_factors(baseline_input(computed), factors)
}
