//! Typed aggregate queries over the record store.
//!
//! Each metric issues exactly one [`MetricQuery`]; a [`QueryExecutor`]
//! evaluates it to a single scalar. Queries that would divide by an empty
//! subset either fail or fall back to [`SENTINEL`], depending on the query.

pub mod aggregate;

use tracing::warn;

use crate::error::QueryError;
use crate::records::{DelayRecord, RecordSchema, RecordStore};

/// Stand-in for an undefined cost. Large enough that `exp(-SENTINEL)` is 0.
pub const SENTINEL: f64 = 1e9;

pub const TRANSIT_MODE: &str = "pt";
pub const AUTO_MODE: &str = "car";

/// Aggregate queries the metric engine can issue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricQuery {
    /// Distinct `person_id` values over passenger records.
    DistinctRiders,
    /// Share of delay rows whose arrival delay lies within
    /// `[earliest, latest]` seconds. Fails on an empty delay set.
    OnTimeRatio { earliest: f64, latest: f64 },
    /// Mean transit travel time over mean car travel time. A missing transit
    /// mean becomes [`SENTINEL`]; a missing car mean becomes 1.
    TransitAutoTimeRatio,
    /// Mean transit travel time divided by `baseline` seconds, with
    /// [`SENTINEL`] for a missing mean.
    TransitTravelTime { baseline: f64 },
    /// `service_hours` per distinct rider, or [`SENTINEL`] with no riders.
    ServiceHoursPerRider { service_hours: f64 },
}

/// Evaluates a [`MetricQuery`] to one scalar.
pub trait QueryExecutor: Send + Sync {
    fn query_scalar(&self, query: &MetricQuery) -> Result<f64, QueryError>;
}

impl QueryExecutor for RecordStore {
    fn query_scalar(&self, query: &MetricQuery) -> Result<f64, QueryError> {
        match *query {
            MetricQuery::DistinctRiders => Ok(self.distinct_riders()? as f64),
            MetricQuery::OnTimeRatio { earliest, latest } => {
                let delays = self.delays.rows()?;
                aggregate::ratio(&delays[..], |row: &DelayRecord| {
                    row.arrival_delay
                        .is_some_and(|delay| delay >= earliest && delay <= latest)
                })
                .ok_or(QueryError::DivisionByZero(DelayRecord::KIND))
            }
            MetricQuery::TransitAutoTimeRatio => {
                let transit = self.mean_travel_time(TRANSIT_MODE)?;
                let auto = self.mean_travel_time(AUTO_MODE)?;
                if auto.is_none() {
                    warn!("No car trips observed, transit travel time left unscaled");
                }
                Ok(transit.unwrap_or(SENTINEL) / auto.unwrap_or(1.0))
            }
            MetricQuery::TransitTravelTime { baseline } => {
                let transit = self.mean_travel_time(TRANSIT_MODE)?;
                Ok(transit.unwrap_or(SENTINEL) / baseline)
            }
            MetricQuery::ServiceHoursPerRider { service_hours } => {
                let riders = self.distinct_riders()?;
                if riders == 0 {
                    warn!("No riders observed, productivity set to sentinel cost");
                    return Ok(SENTINEL);
                }
                Ok(service_hours / riders as f64)
            }
        }
    }
}

impl RecordStore {
    fn distinct_riders(&self) -> Result<usize, QueryError> {
        let passengers = self.passengers.rows()?;
        Ok(aggregate::distinct_count(
            passengers.iter().map(|row| row.person_id.as_deref()),
        ))
    }

    /// Mean non-null travel time over trips whose main mode is `mode`.
    fn mean_travel_time(&self, mode: &str) -> Result<Option<f64>, QueryError> {
        let trips = self.trips.rows()?;
        let mean = aggregate::mean(
            trips
                .iter()
                .filter(|trip| trip.is_mode(mode))
                .map(|trip| trip.travel_time),
        );
        if mean.is_none() && mode == TRANSIT_MODE {
            warn!(mode, "No transit trips observed, travel time set to sentinel");
        }
        Ok(mean)
    }
}
