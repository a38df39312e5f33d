use tracing::debug;

use super::{Metric, MetricSet};
use crate::error::{MetricError, QueryError};
use crate::metadata::NetworkMetadata;
use crate::query::{MetricQuery, QueryExecutor};

const SECONDS_PER_MINUTE: f64 = 60.0;

/// Derives metric values from a [`QueryExecutor`] and the network metadata.
///
/// Cost-like quantities (lower is better) are mapped to `(0, 1]` through
/// `exp(-cost)`, so zero cost scores 1 and a sentinel cost scores 0.
pub struct MetricEngine<'a, Q: ?Sized> {
    executor: &'a Q,
    metadata: &'a NetworkMetadata,
}

impl<'a, Q: QueryExecutor + ?Sized> MetricEngine<'a, Q> {
    pub fn new(executor: &'a Q, metadata: &'a NetworkMetadata) -> Self {
        Self { executor, metadata }
    }

    /// The query backing `metric`, or `None` for metrics read from metadata.
    pub fn query_for(&self, metric: Metric) -> Option<MetricQuery> {
        let metadata = self.metadata;
        match metric {
            Metric::ServiceCoverage => None,
            Metric::Ridership => Some(MetricQuery::DistinctRiders),
            Metric::OnTimePerformance => Some(MetricQuery::OnTimeRatio {
                earliest: -SECONDS_PER_MINUTE * metadata.early_headway_tolerance,
                latest: SECONDS_PER_MINUTE * metadata.late_headway_tolerance,
            }),
            Metric::TravelTime => Some(MetricQuery::TransitTravelTime {
                baseline: SECONDS_PER_MINUTE * metadata.travel_time_baseline,
            }),
            Metric::TransitAutoTimeRatio => Some(MetricQuery::TransitAutoTimeRatio),
            Metric::Productivity => Some(MetricQuery::ServiceHoursPerRider {
                service_hours: metadata.total_service_hours,
            }),
        }
    }

    /// Computes one metric.
    ///
    /// # Errors
    ///
    /// Returns a [`MetricError`] if the backing query fails or the value is NaN.
    pub fn evaluate(&self, metric: Metric) -> Result<f64, MetricError> {
        let fail = |source| MetricError { metric, source };

        let value = match self.query_for(metric) {
            None => self.metadata.service_coverage,
            Some(query) => {
                let scalar = self.executor.query_scalar(&query).map_err(fail)?;
                debug!(%metric, ?query, scalar, "Query evaluated");
                match metric {
                    Metric::Ridership => scalar / self.metadata.total_population,
                    Metric::OnTimePerformance => scalar,
                    _ => decay(scalar),
                }
            }
        };

        if value.is_nan() {
            return Err(fail(QueryError::NotANumber));
        }
        Ok(value)
    }

    /// Computes all six metrics in order, stopping at the first failure.
    pub fn evaluate_all(&self) -> Result<MetricSet, MetricError> {
        MetricSet::try_from_fn(|metric| self.evaluate(metric))
    }
}

/// Maps a non-negative cost onto `(0, 1]`.
pub fn decay(cost: f64) -> f64 {
    (-cost).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SENTINEL;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Answers queries from a fixed table and records what was asked.
    struct FixedExecutor {
        answers: HashMap<&'static str, f64>,
        asked: Mutex<Vec<MetricQuery>>,
    }

    impl FixedExecutor {
        fn new(answers: &[(&'static str, f64)]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                asked: Mutex::new(Vec::new()),
            }
        }
    }

    fn key(query: &MetricQuery) -> &'static str {
        match query {
            MetricQuery::DistinctRiders => "riders",
            MetricQuery::OnTimeRatio { .. } => "on_time",
            MetricQuery::TransitAutoTimeRatio => "tt_ratio",
            MetricQuery::TransitTravelTime { .. } => "travel_time",
            MetricQuery::ServiceHoursPerRider { .. } => "per_rider",
        }
    }

    impl QueryExecutor for FixedExecutor {
        fn query_scalar(&self, query: &MetricQuery) -> Result<f64, QueryError> {
            self.asked.lock().unwrap().push(*query);
            self.answers
                .get(key(query))
                .copied()
                .ok_or(QueryError::DivisionByZero("fixture"))
        }
    }

    fn metadata() -> NetworkMetadata {
        NetworkMetadata {
            total_population: 1_000_000.0,
            service_coverage: 0.8,
            total_service_hours: 100.0,
            early_headway_tolerance: 1.0,
            late_headway_tolerance: 2.0,
            travel_time_baseline: 30.0,
        }
    }

    #[test]
    fn test_service_coverage_from_metadata() {
        let executor = FixedExecutor::new(&[]);
        let metadata = metadata();
        let engine = MetricEngine::new(&executor, &metadata);

        assert_eq!(engine.evaluate(Metric::ServiceCoverage).unwrap(), 0.8);
        assert!(executor.asked.lock().unwrap().is_empty());
    }

    #[test]
    fn test_ridership_not_clamped() {
        let executor = FixedExecutor::new(&[("riders", 1_200_000.0)]);
        let metadata = metadata();
        let engine = MetricEngine::new(&executor, &metadata);

        assert_eq!(engine.evaluate(Metric::Ridership).unwrap(), 1.2);
    }

    #[test]
    fn test_on_time_window_in_seconds() {
        let executor = FixedExecutor::new(&[("on_time", 2.0 / 3.0)]);
        let metadata = metadata();
        let engine = MetricEngine::new(&executor, &metadata);

        assert_eq!(engine.evaluate(Metric::OnTimePerformance).unwrap(), 2.0 / 3.0);
        assert_eq!(
            executor.asked.lock().unwrap()[0],
            MetricQuery::OnTimeRatio {
                earliest: -60.0,
                latest: 120.0
            }
        );
    }

    #[test]
    fn test_travel_time_baseline_in_seconds() {
        let executor = FixedExecutor::new(&[("travel_time", 0.5)]);
        let metadata = metadata();
        let engine = MetricEngine::new(&executor, &metadata);

        let value = engine.evaluate(Metric::TravelTime).unwrap();
        assert!((value - 0.6065).abs() < 1e-4);
        assert_eq!(
            executor.asked.lock().unwrap()[0],
            MetricQuery::TransitTravelTime { baseline: 1800.0 }
        );
    }

    #[test]
    fn test_productivity_decays_cost() {
        let executor = FixedExecutor::new(&[("per_rider", 2.0)]);
        let metadata = metadata();
        let engine = MetricEngine::new(&executor, &metadata);

        let value = engine.evaluate(Metric::Productivity).unwrap();
        assert!((value - 0.1353).abs() < 1e-4);
    }

    #[test]
    fn test_sentinel_cost_scores_zero() {
        let executor = FixedExecutor::new(&[("tt_ratio", SENTINEL / 600.0)]);
        let metadata = metadata();
        let engine = MetricEngine::new(&executor, &metadata);

        let value = engine.evaluate(Metric::TransitAutoTimeRatio).unwrap();
        assert!(value >= 0.0 && value < 1e-12);
    }

    #[test]
    fn test_query_failure_names_metric() {
        let executor = FixedExecutor::new(&[]);
        let metadata = metadata();
        let engine = MetricEngine::new(&executor, &metadata);

        let err = engine.evaluate(Metric::Ridership).unwrap_err();
        assert_eq!(err.metric, Metric::Ridership);
    }

    #[test]
    fn test_nan_value_is_error() {
        let executor = FixedExecutor::new(&[("tt_ratio", f64::NAN)]);
        let metadata = metadata();
        let engine = MetricEngine::new(&executor, &metadata);

        let err = engine.evaluate(Metric::TransitAutoTimeRatio).unwrap_err();
        assert!(matches!(err.source, QueryError::NotANumber));
    }

    #[test]
    fn test_evaluate_all_aborts_on_failure() {
        let executor = FixedExecutor::new(&[("riders", 10.0)]);
        let metadata = metadata();
        let engine = MetricEngine::new(&executor, &metadata);

        let err = engine.evaluate_all().unwrap_err();
        assert_eq!(err.metric, Metric::OnTimePerformance);
        // Nothing after the failing metric is queried.
        assert_eq!(executor.asked.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_decay_bounds() {
        assert_eq!(decay(0.0), 1.0);
        assert_eq!(decay(SENTINEL), 0.0);
        assert!(decay(1.0) < decay(0.5));
    }
}
