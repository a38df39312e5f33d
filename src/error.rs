//! Error types for the scoring pipeline.
//!
//! Configuration problems surface before any record is read. Query failures are
//! wrapped in a [`MetricError`] naming the metric that could not be computed.
//! [`ScoreError`] unifies the three and maps each to a process exit status.

use std::path::PathBuf;

use thiserror::Error;

use crate::metrics::Metric;

/// Malformed or missing configuration, metadata or encoding selection.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("weight `{name}` must be a finite non-negative number, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("metadata field `{name}` must be {requirement}, got {value}")]
    InvalidMetadata {
        name: &'static str,
        requirement: &'static str,
        value: f64,
    },

    #[error("unsupported record encoding `{0}`")]
    UnsupportedEncoding(&'static str),
}

/// Failure to evaluate an aggregate query over a record set.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{} is missing column `{column}`", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[cfg(feature = "arrow")]
    #[error("failed to read arrow file {}: {source}", path.display())]
    Arrow {
        path: PathBuf,
        #[source]
        source: polars::error::PolarsError,
    },

    #[error("{} cannot be read: unsupported record encoding `{encoding}`", path.display())]
    UnsupportedEncoding {
        path: PathBuf,
        encoding: &'static str,
    },

    #[error("division by zero: {0} is empty")]
    DivisionByZero(&'static str),

    #[error("query produced NaN")]
    NotANumber,

    #[error("evaluation task failed: {0}")]
    Interrupted(String),
}

/// A metric whose aggregate query could not be evaluated.
#[derive(Debug, Error)]
#[error("failed to compute {metric}: {source}")]
pub struct MetricError {
    pub metric: Metric,
    #[source]
    pub source: QueryError,
}

/// Failure to persist the score or the run report.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write score to {target}: {source}")]
    Write {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to append run report to {path}: {source}")]
    Report {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Top-level error of a scoring run.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("metric computation error: {0}")]
    Metric(#[from] MetricError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),
}

impl ScoreError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            ScoreError::Metric(_) => 1,
            ScoreError::Config(_) => 2,
            ScoreError::Output(_) => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let config = ScoreError::from(ConfigError::UnsupportedEncoding("arrow"));
        let metric = ScoreError::from(MetricError {
            metric: Metric::OnTimePerformance,
            source: QueryError::DivisionByZero("delay records"),
        });
        let output = ScoreError::from(OutputError::Write {
            target: "-".into(),
            source: std::io::Error::other("closed"),
        });

        assert_eq!(metric.exit_code(), 1);
        assert_eq!(config.exit_code(), 2);
        assert_eq!(output.exit_code(), 3);
    }

    #[test]
    fn test_metric_error_names_metric() {
        let err = MetricError {
            metric: Metric::OnTimePerformance,
            source: QueryError::DivisionByZero("delay records"),
        };
        assert_eq!(
            err.to_string(),
            "failed to compute on-time performance: division by zero: delay records is empty"
        );
    }
}
