use crate::metrics::{Metric, MetricSet};
use crate::scoring::ScoringWeights;

/// Combines metric values into the composite score.
///
/// Computes `Σ weight_i * metric_i` over [`Metric::ALL`], always in that
/// order, so identical inputs give a bit-identical result.
pub fn combine(metrics: &MetricSet, weights: &ScoringWeights) -> f64 {
    Metric::ALL
        .iter()
        .map(|&metric| weights.weight(metric) * metrics.get(metric))
        .fold(0.0, |total, term| total + term)
}
