//! Scoring run configuration.
//!
//! Stored as a JSON document on disk:
//! ```json
//! {
//!   "files": {
//!     "data": {
//!       "bus_pax_records": "output/bus_pax",
//!       "bus_delay_records": "output/bus_delay",
//!       "trip_records": "output/trips"
//!     },
//!     "metadata": "output/network_metadata.json"
//!   },
//!   "scoring": {
//!     "weights": {
//!       "service_coverage": 0.2,
//!       "ridership": 0.2,
//!       "travel_time": 0.15,
//!       "transit_auto_time_ratio": 0.15,
//!       "on_time_performance": 0.2,
//!       "productivity": 0.1
//!     }
//!   }
//! }
//! ```
//! Relative paths are resolved against the directory holding the config file.
//! Record paths may omit their extension; see [`RecordFormat::resolve_extension`].

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;
use crate::records::RecordSource;
use crate::scoring::ScoringWeights;

/// On-disk encoding shared by all three record sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RecordFormat {
    /// Comma-separated text with a header row, optionally gzip-compressed.
    Csv,
    /// Arrow IPC file.
    Arrow,
}

impl RecordFormat {
    pub fn extension(self) -> &'static str {
        match self {
            RecordFormat::Csv => "csv",
            RecordFormat::Arrow => "arrow",
        }
    }

    /// Appends this format's extension to `path` unless it is already present.
    ///
    /// Gzip-compressed CSV (`.csv.gz`) is accepted as already resolved.
    pub fn resolve_extension(self, path: &Path) -> PathBuf {
        let name = path.to_string_lossy();
        let suffix = format!(".{}", self.extension());
        let resolved = name.ends_with(&suffix)
            || (self == RecordFormat::Csv && name.ends_with(".csv.gz"));
        if resolved {
            return path.to_path_buf();
        }

        let mut with_ext = OsString::from(path.as_os_str());
        with_ext.push(&suffix);
        PathBuf::from(with_ext)
    }

    /// Whether this build can read the format.
    pub fn is_supported(self) -> bool {
        match self {
            RecordFormat::Csv => true,
            RecordFormat::Arrow => cfg!(feature = "arrow"),
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScorerConfig {
    pub files: FileConfig,
    pub scoring: ScoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub data: DataFiles,
    /// JSON document holding the [`NetworkMetadata`](crate::metadata::NetworkMetadata).
    pub metadata: PathBuf,
}

/// Locations of the three simulation record sets.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataFiles {
    pub bus_pax_records: PathBuf,
    pub bus_delay_records: PathBuf,
    pub trip_records: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
}

/// Resolved sources for the passenger, delay and trip record sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSources {
    pub passengers: RecordSource,
    pub delays: RecordSource,
    pub trips: RecordSource,
}

impl ScorerConfig {
    /// Loads the config from a JSON file at `path`, validating weights and
    /// resolving relative paths against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or(Path::new("."));
        let config = Self::parse(&content, base_dir).map_err(|err| match err {
            ConfigParseError::Json(source) => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            ConfigParseError::Invalid(err) => err,
        })?;

        debug!(path = %path.display(), ?config, "Configuration loaded");
        Ok(config)
    }

    fn parse(content: &str, base_dir: &Path) -> Result<Self, ConfigParseError> {
        let mut config: Self = serde_json::from_str(content).map_err(ConfigParseError::Json)?;
        config
            .scoring
            .weights
            .validate()
            .map_err(ConfigParseError::Invalid)?;

        let data = &mut config.files.data;
        for path in [
            &mut data.bus_pax_records,
            &mut data.bus_delay_records,
            &mut data.trip_records,
            &mut config.files.metadata,
        ] {
            if path.is_relative() {
                *path = base_dir.join(&*path);
            }
        }

        Ok(config)
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.scoring.weights
    }

    pub fn metadata_path(&self) -> &Path {
        &self.files.metadata
    }

    /// Builds the record sources for `format`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedEncoding`] if this build cannot read `format`.
    pub fn record_sources(&self, format: RecordFormat) -> Result<RecordSources, ConfigError> {
        if !format.is_supported() {
            return Err(ConfigError::UnsupportedEncoding(format.extension()));
        }

        let data = &self.files.data;
        Ok(RecordSources {
            passengers: RecordSource::new(format, &data.bus_pax_records),
            delays: RecordSource::new(format, &data.bus_delay_records),
            trips: RecordSource::new(format, &data.trip_records),
        })
    }
}

#[derive(Debug)]
enum ConfigParseError {
    Json(serde_json::Error),
    Invalid(ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "files": {
            "data": {
                "bus_pax_records": "out/bus_pax",
                "bus_delay_records": "/abs/bus_delay.csv",
                "trip_records": "out/trips.csv.gz"
            },
            "metadata": "meta.json"
        },
        "scoring": {
            "weights": {
                "service_coverage": 0.2,
                "ridership": 0.2,
                "travel_time": 0.15,
                "transit_auto_time_ratio": 0.15,
                "on_time_performance": 0.2,
                "productivity": 0.1
            }
        }
    }"#;

    fn parse(content: &str) -> Result<ScorerConfig, ConfigParseError> {
        ScorerConfig::parse(content, Path::new("/runs/a"))
    }

    #[test]
    fn test_resolve_extension_appends_missing() {
        assert_eq!(
            RecordFormat::Csv.resolve_extension(Path::new("out/trips")),
            PathBuf::from("out/trips.csv")
        );
        assert_eq!(
            RecordFormat::Arrow.resolve_extension(Path::new("out/trips")),
            PathBuf::from("out/trips.arrow")
        );
    }

    #[test]
    fn test_resolve_extension_is_idempotent() {
        let once = RecordFormat::Csv.resolve_extension(Path::new("out/trips"));
        let twice = RecordFormat::Csv.resolve_extension(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_resolve_extension_keeps_gzip_csv() {
        assert_eq!(
            RecordFormat::Csv.resolve_extension(Path::new("out/trips.csv.gz")),
            PathBuf::from("out/trips.csv.gz")
        );
    }

    #[test]
    fn test_parse_resolves_relative_paths() {
        let config = parse(SAMPLE).unwrap();
        assert_eq!(
            config.files.data.bus_pax_records,
            PathBuf::from("/runs/a/out/bus_pax")
        );
        assert_eq!(
            config.files.data.bus_delay_records,
            PathBuf::from("/abs/bus_delay.csv")
        );
        assert_eq!(config.metadata_path(), Path::new("/runs/a/meta.json"));
        assert_eq!(config.weights().on_time_performance, 0.2);
    }

    #[test]
    fn test_record_sources_for_csv() {
        let config = parse(SAMPLE).unwrap();
        let sources = config.record_sources(RecordFormat::Csv).unwrap();

        assert_eq!(
            sources.passengers.path(),
            Path::new("/runs/a/out/bus_pax.csv")
        );
        assert_eq!(sources.trips.path(), Path::new("/runs/a/out/trips.csv.gz"));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let content = SAMPLE.replace("\"ridership\": 0.2", "\"ridership\": -0.2");
        assert!(matches!(
            parse(&content),
            Err(ConfigParseError::Invalid(ConfigError::InvalidWeight {
                name: "ridership",
                ..
            }))
        ));
    }

    #[test]
    fn test_missing_weight_rejected() {
        let content = SAMPLE.replace("\"productivity\": 0.1", "\"extra\": 0.1");
        assert!(matches!(parse(&content), Err(ConfigParseError::Json(_))));
    }

    #[test]
    fn test_missing_files_section_rejected() {
        let content = r#"{ "scoring": { "weights": {} } }"#;
        assert!(matches!(parse(content), Err(ConfigParseError::Json(_))));
    }

    #[cfg(not(feature = "arrow"))]
    #[test]
    fn test_arrow_unsupported_without_feature() {
        let config = parse(SAMPLE).unwrap();
        assert!(matches!(
            config.record_sources(RecordFormat::Arrow),
            Err(ConfigError::UnsupportedEncoding("arrow"))
        ));
    }
}
