//! Opening record sets by encoding.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use tracing::debug;

use super::schema::RecordSchema;
use crate::config::RecordFormat;
use crate::error::QueryError;

/// Where a record set lives and how it is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSource {
    /// Comma-separated text with a header row; gzip-compressed when the file
    /// name ends in `.gz`.
    DelimitedText { path: PathBuf },
    /// Arrow IPC file with the schema embedded.
    ColumnarBinary { path: PathBuf },
}

impl RecordSource {
    /// Builds a source for `path`, appending the format's extension if missing.
    pub fn new(format: RecordFormat, path: &Path) -> Self {
        let path = format.resolve_extension(path);
        match format {
            RecordFormat::Csv => RecordSource::DelimitedText { path },
            RecordFormat::Arrow => RecordSource::ColumnarBinary { path },
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            RecordSource::DelimitedText { path } | RecordSource::ColumnarBinary { path } => path,
        }
    }

    /// Reads every row of the source.
    pub fn read<T: RecordSchema>(&self) -> Result<Vec<T>, QueryError> {
        match self {
            RecordSource::DelimitedText { path } => read_delimited(path),
            RecordSource::ColumnarBinary { path } => read_columnar(path),
        }
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

fn read_delimited<T: RecordSchema>(path: &Path) -> Result<Vec<T>, QueryError> {
    let file = File::open(path).map_err(|source| QueryError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let reader: Box<dyn Read> = if is_gzip(path) {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    debug!(path = %path.display(), gzip = is_gzip(path), kind = T::KIND, "Reading delimited records");

    let csv_error = |source| QueryError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(csv_error)?;
    if let Some(column) = T::COLUMNS
        .iter()
        .copied()
        .find(|column| !headers.iter().any(|h| h == *column))
    {
        return Err(QueryError::MissingColumn {
            path: path.to_path_buf(),
            column,
        });
    }

    rdr.deserialize().map(|row| row.map_err(csv_error)).collect()
}

#[cfg(feature = "arrow")]
fn read_columnar<T: RecordSchema>(path: &Path) -> Result<Vec<T>, QueryError> {
    use polars::prelude::{IpcReader, SerReader};

    let arrow_error = |source| QueryError::Arrow {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|source| QueryError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), kind = T::KIND, "Reading arrow records");

    let frame = IpcReader::new(file).finish().map_err(arrow_error)?;
    T::from_frame(&frame).map_err(arrow_error)
}

#[cfg(not(feature = "arrow"))]
fn read_columnar<T: RecordSchema>(path: &Path) -> Result<Vec<T>, QueryError> {
    Err(QueryError::UnsupportedEncoding {
        path: path.to_path_buf(),
        encoding: RecordFormat::Arrow.extension(),
    })
}

/// Column extraction from Polars frames into plain Rust values.
#[cfg(feature = "arrow")]
pub(crate) mod frame {
    use polars::prelude::{DataFrame, DataType, PolarsResult};

    pub fn str_column(frame: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
        let column = frame.column(name)?.cast(&DataType::String)?;
        let values = column.as_materialized_series().str()?;
        Ok(values
            .into_iter()
            .map(|value| value.map(str::to_string))
            .collect())
    }

    pub fn f64_column(frame: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
        let column = frame.column(name)?.cast(&DataType::Float64)?;
        let values = column.as_materialized_series().f64()?;
        Ok(values.into_iter().collect())
    }

    pub fn list_column(frame: &DataFrame, name: &str) -> PolarsResult<Vec<Vec<String>>> {
        let column = frame.column(name)?;
        let lists = column.as_materialized_series().list()?;
        lists
            .into_iter()
            .map(|items| match items {
                Some(items) => {
                    let items = items.cast(&DataType::String)?;
                    Ok(items
                        .str()?
                        .into_iter()
                        .flatten()
                        .map(str::to_string)
                        .collect())
                }
                None => Ok(Vec::new()),
            })
            .collect()
    }
}
