//! Composite quality score for a simulated public-transit network.
//!
//! Reads passenger, delay and trip records from a transport micro-simulation,
//! derives six sub-metrics against precomputed network metadata, and combines
//! them with configured weights into one `f64`.

pub mod calculator;
pub mod config;
pub mod error;
pub mod metadata;
pub mod metrics;
pub mod output;
pub mod query;
pub mod records;
pub mod scoring;
