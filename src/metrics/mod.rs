//! The six sub-metrics of the network score.

pub mod engine;

pub use engine::MetricEngine;

use std::fmt;

/// One sub-metric of the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    ServiceCoverage,
    Ridership,
    OnTimePerformance,
    TravelTime,
    TransitAutoTimeRatio,
    Productivity,
}

impl Metric {
    /// Every metric, in the order the combiner sums them.
    pub const ALL: [Metric; 6] = [
        Metric::ServiceCoverage,
        Metric::Ridership,
        Metric::OnTimePerformance,
        Metric::TravelTime,
        Metric::TransitAutoTimeRatio,
        Metric::Productivity,
    ];

    /// Key of this metric's weight in the `scoring.weights` config section.
    pub fn config_key(self) -> &'static str {
        match self {
            Metric::ServiceCoverage => "service_coverage",
            Metric::Ridership => "ridership",
            Metric::OnTimePerformance => "on_time_performance",
            Metric::TravelTime => "travel_time",
            Metric::TransitAutoTimeRatio => "transit_auto_time_ratio",
            Metric::Productivity => "productivity",
        }
    }

    /// Ratio metrics are reported as percentages; decayed costs as plain values.
    pub fn is_ratio(self) -> bool {
        matches!(
            self,
            Metric::ServiceCoverage | Metric::Ridership | Metric::OnTimePerformance
        )
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::ServiceCoverage => "service coverage",
            Metric::Ridership => "ridership",
            Metric::OnTimePerformance => "on-time performance",
            Metric::TravelTime => "travel time",
            Metric::TransitAutoTimeRatio => "transit-auto travel time ratio",
            Metric::Productivity => "productivity",
        };
        f.write_str(name)
    }
}

/// Computed values of all six metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSet {
    pub service_coverage: f64,
    pub ridership: f64,
    pub on_time_performance: f64,
    pub travel_time: f64,
    pub transit_auto_time_ratio: f64,
    pub productivity: f64,
}

impl MetricSet {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::ServiceCoverage => self.service_coverage,
            Metric::Ridership => self.ridership,
            Metric::OnTimePerformance => self.on_time_performance,
            Metric::TravelTime => self.travel_time,
            Metric::TransitAutoTimeRatio => self.transit_auto_time_ratio,
            Metric::Productivity => self.productivity,
        }
    }

    /// Builds a set by computing each metric in [`Metric::ALL`] order,
    /// stopping at the first failure.
    pub fn try_from_fn<E>(mut value: impl FnMut(Metric) -> Result<f64, E>) -> Result<Self, E> {
        Ok(Self {
            service_coverage: value(Metric::ServiceCoverage)?,
            ridership: value(Metric::Ridership)?,
            on_time_performance: value(Metric::OnTimePerformance)?,
            travel_time: value(Metric::TravelTime)?,
            transit_auto_time_ratio: value(Metric::TransitAutoTimeRatio)?,
            productivity: value(Metric::Productivity)?,
        })
    }
}
