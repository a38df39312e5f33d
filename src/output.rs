//! Persistence of the composite score and the optional run report.
//!
//! The score artifact is exactly eight bytes: one IEEE-754 double with no
//! header or framing. The run report is a CSV file that gains one row per run.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::OutputError;
use crate::metrics::MetricSet;

/// Byte order of the score artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Endianness {
    #[default]
    Big,
    Little,
}

/// Encodes `score` as eight bytes in the given byte order.
pub fn encode_score(score: f64, endianness: Endianness) -> Bytes {
    let mut buf = BytesMut::with_capacity(8);
    match endianness {
        Endianness::Big => buf.put_f64(score),
        Endianness::Little => buf.put_f64_le(score),
    }
    buf.freeze()
}

/// Writes the encoded score to `writer` and flushes it.
pub fn write_score_to<W: Write>(
    writer: &mut W,
    score: f64,
    endianness: Endianness,
) -> io::Result<()> {
    writer.write_all(&encode_score(score, endianness))?;
    writer.flush()
}

/// Writes the score to the file at `target`, or to stdout when `target` is `-`.
///
/// An existing file is truncated.
pub fn write_score(target: &str, score: f64, endianness: Endianness) -> Result<(), OutputError> {
    let result = if target == "-" {
        write_score_to(&mut io::stdout().lock(), score, endianness)
    } else {
        File::create(target).and_then(|mut file| write_score_to(&mut file, score, endianness))
    };

    result.map_err(|source| OutputError::Write {
        target: target.to_string(),
        source,
    })?;

    info!(output = target, ?endianness, "Score written");
    Ok(())
}

/// One row of the run report.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreReport {
    pub timestamp: DateTime<Utc>,
    pub service_coverage: f64,
    pub ridership: f64,
    pub on_time_performance: f64,
    pub travel_time: f64,
    pub transit_auto_time_ratio: f64,
    pub productivity: f64,
    pub score: f64,
}

impl ScoreReport {
    pub fn new(metrics: &MetricSet, score: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            service_coverage: metrics.service_coverage,
            ridership: metrics.ridership,
            on_time_performance: metrics.on_time_performance,
            travel_time: metrics.travel_time,
            transit_auto_time_ratio: metrics.transit_auto_time_ratio,
            productivity: metrics.productivity,
            score,
        }
    }
}

/// Appends a [`ScoreReport`] as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_report(path: &str, report: &ScoreReport) -> Result<(), OutputError> {
    let report_error = |source| OutputError::Report {
        path: path.to_string(),
        source,
    };

    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending run report");

    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|err| report_error(csv::Error::from(err)))?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    writer.serialize(report).map_err(report_error)?;
    writer
        .flush()
        .map_err(|err| report_error(csv::Error::from(err)))?;

    Ok(())
}
