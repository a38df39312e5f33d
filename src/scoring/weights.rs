use serde::Deserialize;

use crate::error::ConfigError;
use crate::metrics::Metric;

/// Per-metric weights read from the `scoring.weights` config section.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringWeights {
    pub service_coverage: f64,
    pub ridership: f64,
    pub travel_time: f64,
    pub transit_auto_time_ratio: f64,
    pub on_time_performance: f64,
    pub productivity: f64,
}

impl ScoringWeights {
    pub fn weight(&self, metric: Metric) -> f64 {
        match metric {
            Metric::ServiceCoverage => self.service_coverage,
            Metric::Ridership => self.ridership,
            Metric::OnTimePerformance => self.on_time_performance,
            Metric::TravelTime => self.travel_time,
            Metric::TransitAutoTimeRatio => self.transit_auto_time_ratio,
            Metric::Productivity => self.productivity,
        }
    }

    /// Rejects negative, NaN and infinite weights.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for metric in Metric::ALL {
            let value = self.weight(metric);
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    name: metric.config_key(),
                    value,
                });
            }
        }
        Ok(())
    }
}
