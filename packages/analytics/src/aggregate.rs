//! Numeric attribute aggregation.

use impact_map_geography_models::{AttributeValue, FeatureCollection};

use crate::AnalysisError;

/// Sums `attribute` over every feature as `f64`.
///
/// The sum is not rounded; callers truncate at presentation time. An
/// empty collection sums to `0.0`.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidAttribute`] for the first feature whose
/// value is missing or has no numeric interpretation. Such values are
/// never treated as zero.
pub fn sum_attribute(features: &FeatureCollection, attribute: &str) -> Result<f64, AnalysisError> {
    features.iter().try_fold(0.0, |total, feature| {
        let value = feature.property(attribute).unwrap_or(&AttributeValue::Null);
        value
            .to_numeric()
            .map(|n| total + n)
            .map_err(|e| AnalysisError::InvalidAttribute {
                feature_id: feature.id,
                attribute: attribute.to_string(),
                value: e.value,
            })
    })
}

/// Truncates a population estimate to a whole headcount.
///
/// Negative or non-finite totals clamp to zero.
#[must_use]
pub fn headcount(total: f64) -> u64 {
    if !total.is_finite() || total <= 0.0 {
        return 0;
    }
    // Truncation is the intent; totals are far below u64::MAX.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = total.floor() as u64;
    count
}
