//! End-to-end scoring: evaluate every metric, then combine.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{error, info, info_span};

use crate::config::{RecordFormat, ScorerConfig};
use crate::error::{ConfigError, MetricError, QueryError};
use crate::metadata::NetworkMetadata;
use crate::metrics::{Metric, MetricEngine, MetricSet};
use crate::query::QueryExecutor;
use crate::records::RecordStore;
use crate::scoring::{ScoringWeights, combine};

/// Result of a completed scoring run.
#[derive(Debug, Clone, Copy)]
pub struct ScoreRun {
    pub metrics: MetricSet,
    pub score: f64,
    pub elapsed: Duration,
}

/// Computes the composite score for one simulation run.
pub struct ScoreCalculator {
    store: Arc<RecordStore>,
    metadata: Arc<NetworkMetadata>,
    weights: ScoringWeights,
}

impl ScoreCalculator {
    pub fn new(store: RecordStore, metadata: NetworkMetadata, weights: ScoringWeights) -> Self {
        Self {
            store: Arc::new(store),
            metadata: Arc::new(metadata),
            weights,
        }
    }

    /// Loads metadata and binds the record store described by `config`.
    /// Record sets are not read until a metric needs them.
    pub fn from_config(config: &ScorerConfig, format: RecordFormat) -> Result<Self, ConfigError> {
        let metadata = NetworkMetadata::load(config.metadata_path())?;
        let sources = config.record_sources(format)?;
        Ok(Self::new(
            RecordStore::open(sources),
            metadata,
            *config.weights(),
        ))
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Evaluates the metrics one after another, stopping at the first failure.
    pub fn evaluate_metrics(&self) -> Result<MetricSet, MetricError> {
        let engine = MetricEngine::new(self.store.as_ref(), self.metadata.as_ref());
        MetricSet::try_from_fn(|metric| evaluate_logged(&engine, metric))
    }

    /// Evaluates all metrics concurrently on the blocking pool.
    ///
    /// Every metric runs to completion; if several fail, the error reported is
    /// the first in [`Metric::ALL`] order.
    pub async fn evaluate_metrics_parallel(&self) -> Result<MetricSet, MetricError> {
        let mut tasks = JoinSet::new();

        for metric in Metric::ALL {
            let store = Arc::clone(&self.store);
            let metadata = Arc::clone(&self.metadata);
            let span = info_span!("metric", %metric);

            tasks.spawn_blocking(move || {
                let _entered = span.enter();
                let engine = MetricEngine::new(store.as_ref(), metadata.as_ref());
                (metric, evaluate_logged(&engine, metric))
            });
        }

        let mut results = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((metric, result)) => {
                    results.insert(metric, result);
                }
                Err(err) => error!(error = %err, "Metric task did not complete"),
            }
        }

        MetricSet::try_from_fn(|metric| {
            results.remove(&metric).unwrap_or_else(|| {
                Err(MetricError {
                    metric,
                    source: QueryError::Interrupted("task did not complete".into()),
                })
            })
        })
    }

    /// Evaluates the metrics sequentially and combines them.
    pub fn calculate(&self) -> Result<ScoreRun, MetricError> {
        let start = Instant::now();
        info!(parallel = false, "Processing simulation records");
        let metrics = self.evaluate_metrics()?;
        Ok(self.finish(metrics, start))
    }

    /// Evaluates the metrics concurrently and combines them.
    pub async fn calculate_parallel(&self) -> Result<ScoreRun, MetricError> {
        let start = Instant::now();
        info!(parallel = true, "Processing simulation records");
        let metrics = self.evaluate_metrics_parallel().await?;
        Ok(self.finish(metrics, start))
    }

    fn finish(&self, metrics: MetricSet, start: Instant) -> ScoreRun {
        let score = combine(&metrics, &self.weights);
        let elapsed = start.elapsed();

        info!(
            elapsed_ms = elapsed.as_millis() as u64,
            "Record processing and score calculation completed"
        );
        info!("System-wide score: {score:.4}");

        ScoreRun {
            metrics,
            score,
            elapsed,
        }
    }
}

fn evaluate_logged<Q: QueryExecutor + ?Sized>(
    engine: &MetricEngine<'_, Q>,
    metric: Metric,
) -> Result<f64, MetricError> {
    info!(%metric, "Calculating metric");
    match engine.evaluate(metric) {
        Ok(value) => {
            info!(%metric, value = %display_value(metric, value), "Metric calculated");
            Ok(value)
        }
        Err(err) => {
            error!(%metric, error = %err.source, "Metric computation failed");
            Err(err)
        }
    }
}

fn display_value(metric: Metric, value: f64) -> String {
    if metric.is_ratio() {
        format!("{:.4}%", value * 100.0)
    } else {
        format!("{value:.4}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{DelayRecord, PassengerRecord, TripRecord};

    fn metadata() -> NetworkMetadata {
        NetworkMetadata {
            total_population: 4.0,
            service_coverage: 0.5,
            total_service_hours: 6.0,
            early_headway_tolerance: 1.0,
            late_headway_tolerance: 2.0,
            travel_time_baseline: 30.0,
        }
    }

    fn weights() -> ScoringWeights {
        ScoringWeights {
            service_coverage: 1.0,
            ridership: 1.0,
            travel_time: 1.0,
            transit_auto_time_ratio: 1.0,
            on_time_performance: 1.0,
            productivity: 1.0,
        }
    }

    fn store(delays: Vec<DelayRecord>) -> RecordStore {
        let passengers = ["p1", "p2", "p3", "p1"]
            .iter()
            .map(|id| PassengerRecord {
                person_id: Some(id.to_string()),
                bus_id: Some("bus_1".into()),
            })
            .collect();
        let trips = [("pt", 900.0), ("pt", 900.0), ("car", 450.0)]
            .iter()
            .map(|&(mode, travel_time)| TripRecord {
                person_id: Some("p1".into()),
                start_time: Some(0.0),
                travel_time: Some(travel_time),
                main_mode: Some(mode.into()),
                veh_list: Vec::new(),
            })
            .collect();
        RecordStore::from_rows(passengers, delays, trips)
    }

    fn delays() -> Vec<DelayRecord> {
        [0.0, -30.0, 1000.0]
            .iter()
            .map(|&d| DelayRecord {
                stop_id: Some("s1".into()),
                arrival_delay: Some(d),
                depart_delay: Some(d),
            })
            .collect()
    }

    #[test]
    fn test_calculate_combines_all_metrics() {
        let calculator = ScoreCalculator::new(store(delays()), metadata(), weights());
        let run = calculator.calculate().unwrap();

        assert_eq!(run.metrics.service_coverage, 0.5);
        assert_eq!(run.metrics.ridership, 0.75);
        assert_eq!(run.metrics.on_time_performance, 2.0 / 3.0);
        assert_eq!(run.metrics.transit_auto_time_ratio, (-2.0f64).exp());
        assert_eq!(run.metrics.travel_time, (-0.5f64).exp());
        assert_eq!(run.metrics.productivity, (-2.0f64).exp());
        assert_eq!(run.score, combine(&run.metrics, calculator.weights()));
    }

    #[test]
    fn test_calculate_is_idempotent() {
        let calculator = ScoreCalculator::new(store(delays()), metadata(), weights());
        let first = calculator.calculate().unwrap();
        let second = calculator.calculate().unwrap();
        assert_eq!(first.score.to_bits(), second.score.to_bits());
    }

    #[test]
    fn test_empty_delays_abort_run() {
        let calculator = ScoreCalculator::new(store(Vec::new()), metadata(), weights());
        let err = calculator.calculate().unwrap_err();

        assert_eq!(err.metric, Metric::OnTimePerformance);
        assert!(matches!(err.source, QueryError::DivisionByZero(_)));
    }

    #[tokio::test]
    async fn test_parallel_matches_sequential() {
        let calculator = ScoreCalculator::new(store(delays()), metadata(), weights());
        let sequential = calculator.calculate().unwrap();
        let parallel = calculator.calculate_parallel().await.unwrap();

        assert_eq!(sequential.metrics, parallel.metrics);
        assert_eq!(sequential.score.to_bits(), parallel.score.to_bits());
    }

    #[tokio::test]
    async fn test_parallel_reports_failing_metric() {
        let calculator = ScoreCalculator::new(store(Vec::new()), metadata(), weights());
        let err = calculator.calculate_parallel().await.unwrap_err();
        assert_eq!(err.metric, Metric::OnTimePerformance);
    }

    #[test]
    fn test_display_value_formats() {
        assert_eq!(display_value(Metric::Ridership, 0.123456), "12.3456%");
        assert_eq!(display_value(Metric::Productivity, 0.5), "0.5000");
    }
}
