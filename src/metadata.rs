//! Precomputed network metadata used as normalization constants.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

/// Network-level constants produced ahead of the simulation run.
///
/// Stored as a JSON object on disk:
/// ```json
/// {
///   "total_population": 125000,
///   "service_coverage": 0.82,
///   "total_service_hours": 3400.5,
///   "early_headway_tolerance": 1.0,
///   "late_headway_tolerance": 5.0,
///   "travel_time_baseline": 30.0
/// }
/// ```
/// Tolerances and the travel-time baseline are in minutes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkMetadata {
    pub total_population: f64,
    pub service_coverage: f64,
    pub total_service_hours: f64,
    pub early_headway_tolerance: f64,
    pub late_headway_tolerance: f64,
    pub travel_time_baseline: f64,
}

impl NetworkMetadata {
    /// Loads and validates metadata from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let metadata: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        metadata.validate()?;

        debug!(path = %path.display(), ?metadata, "Network metadata loaded");
        Ok(metadata)
    }

    /// Checks every field against its documented domain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check(
            "total_population",
            self.total_population,
            "a finite number > 0",
            |v| v > 0.0,
        )?;
        check(
            "service_coverage",
            self.service_coverage,
            "within [0, 1]",
            |v| (0.0..=1.0).contains(&v),
        )?;
        check(
            "total_service_hours",
            self.total_service_hours,
            "a finite number >= 0",
            |v| v >= 0.0,
        )?;
        check(
            "early_headway_tolerance",
            self.early_headway_tolerance,
            "a finite number >= 0",
            |v| v >= 0.0,
        )?;
        check(
            "late_headway_tolerance",
            self.late_headway_tolerance,
            "a finite number >= 0",
            |v| v >= 0.0,
        )?;
        check(
            "travel_time_baseline",
            self.travel_time_baseline,
            "a finite number > 0",
            |v| v > 0.0,
        )
    }
}

fn check(
    name: &'static str,
    value: f64,
    requirement: &'static str,
    ok: impl Fn(f64) -> bool,
) -> Result<(), ConfigError> {
    if value.is_finite() && ok(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidMetadata {
            name,
            requirement,
            value,
        })
    }
}
