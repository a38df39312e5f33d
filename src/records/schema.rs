//! Row types for the three simulation record sets.
//!
//! Empty cells in delimited text deserialize to `None`, mirroring SQL nulls:
//! they are skipped by distinct counts and averages but still count as rows.

use serde::{Deserialize, Deserializer};

/// A row type that can be loaded into a [`RecordSet`](super::RecordSet).
pub trait RecordSchema: for<'de> Deserialize<'de> + Send + Sync + 'static {
    /// Human-readable name used in logs and errors.
    const KIND: &'static str;
    /// Columns a delimited-text header must contain.
    const COLUMNS: &'static [&'static str];

    #[cfg(feature = "arrow")]
    fn from_frame(frame: &polars::prelude::DataFrame) -> polars::prelude::PolarsResult<Vec<Self>>;
}

/// One passenger boarding a bus.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PassengerRecord {
    pub person_id: Option<String>,
    pub bus_id: Option<String>,
}

/// Arrival and departure delay, in seconds, at one scheduled stop event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DelayRecord {
    pub stop_id: Option<String>,
    pub arrival_delay: Option<f64>,
    pub depart_delay: Option<f64>,
}

/// Summary of one completed trip. `travel_time` is in seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TripRecord {
    pub person_id: Option<String>,
    pub start_time: Option<f64>,
    pub travel_time: Option<f64>,
    pub main_mode: Option<String>,
    #[serde(default, deserialize_with = "vehicle_list")]
    pub veh_list: Vec<String>,
}

impl TripRecord {
    pub fn is_mode(&self, mode: &str) -> bool {
        self.main_mode.as_deref() == Some(mode)
    }
}

impl RecordSchema for PassengerRecord {
    const KIND: &'static str = "passenger records";
    const COLUMNS: &'static [&'static str] = &["person_id", "bus_id"];

    #[cfg(feature = "arrow")]
    fn from_frame(frame: &polars::prelude::DataFrame) -> polars::prelude::PolarsResult<Vec<Self>> {
        use super::source::frame::str_column;

        let person_id = str_column(frame, "person_id")?;
        let bus_id = str_column(frame, "bus_id")?;
        Ok(person_id
            .into_iter()
            .zip(bus_id)
            .map(|(person_id, bus_id)| PassengerRecord { person_id, bus_id })
            .collect())
    }
}

impl RecordSchema for DelayRecord {
    const KIND: &'static str = "delay records";
    const COLUMNS: &'static [&'static str] = &["stop_id", "arrival_delay", "depart_delay"];

    #[cfg(feature = "arrow")]
    fn from_frame(frame: &polars::prelude::DataFrame) -> polars::prelude::PolarsResult<Vec<Self>> {
        use super::source::frame::{f64_column, str_column};

        let stop_id = str_column(frame, "stop_id")?;
        let arrival_delay = f64_column(frame, "arrival_delay")?;
        let depart_delay = f64_column(frame, "depart_delay")?;
        Ok(stop_id
            .into_iter()
            .zip(arrival_delay)
            .zip(depart_delay)
            .map(|((stop_id, arrival_delay), depart_delay)| DelayRecord {
                stop_id,
                arrival_delay,
                depart_delay,
            })
            .collect())
    }
}

impl RecordSchema for TripRecord {
    const KIND: &'static str = "trip records";
    const COLUMNS: &'static [&'static str] = &[
        "person_id",
        "start_time",
        "travel_time",
        "main_mode",
        "veh_list",
    ];

    #[cfg(feature = "arrow")]
    fn from_frame(frame: &polars::prelude::DataFrame) -> polars::prelude::PolarsResult<Vec<Self>> {
        use super::source::frame::{f64_column, list_column, str_column};

        let person_id = str_column(frame, "person_id")?;
        let start_time = f64_column(frame, "start_time")?;
        let travel_time = f64_column(frame, "travel_time")?;
        let main_mode = str_column(frame, "main_mode")?;
        let veh_list = list_column(frame, "veh_list")?;
        Ok(person_id
            .into_iter()
            .zip(start_time)
            .zip(travel_time)
            .zip(main_mode)
            .zip(veh_list)
            .map(
                |((((person_id, start_time), travel_time), main_mode), veh_list)| TripRecord {
                    person_id,
                    start_time,
                    travel_time,
                    main_mode,
                    veh_list,
                },
            )
            .collect())
    }
}

/// Parses a list literal such as `[veh_1, 'veh_2']`. Brackets and quotes are
/// optional; an empty cell is an empty list.
pub fn parse_vehicle_list(raw: &str) -> Vec<String> {
    let inner = raw.trim();
    let inner = inner
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(inner);

    inner
        .split(',')
        .map(|item| item.trim().trim_matches(|c| c == '\'' || c == '"').trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn vehicle_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().map(parse_vehicle_list).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vehicle_list_bracketed() {
        assert_eq!(
            parse_vehicle_list("[bus_1, bus_2]"),
            vec!["bus_1".to_string(), "bus_2".to_string()]
        );
    }

    #[test]
    fn test_parse_vehicle_list_quoted_items() {
        assert_eq!(
            parse_vehicle_list("['bus_1', \"tram_4\"]"),
            vec!["bus_1".to_string(), "tram_4".to_string()]
        );
    }

    #[test]
    fn test_parse_vehicle_list_empty() {
        assert!(parse_vehicle_list("").is_empty());
        assert!(parse_vehicle_list("[]").is_empty());
    }

    #[test]
    fn test_trip_record_from_csv() {
        let data = "\
person_id,start_time,travel_time,main_mode,veh_list
p1,28800,900,pt,\"[bus_1, bus_2]\"
p2,29000,,car,
";
        let mut rdr = csv::Reader::from_reader(data.as_bytes());
        let rows: Vec<TripRecord> = rdr.deserialize().collect::<Result<_, _>>().unwrap();

        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_mode("pt"));
        assert_eq!(rows[0].travel_time, Some(900.0));
        assert_eq!(rows[0].veh_list, vec!["bus_1", "bus_2"]);
        assert_eq!(rows[1].travel_time, None);
        assert!(rows[1].veh_list.is_empty());
    }

    #[test]
    fn test_delay_record_null_arrival() {
        let data = "stop_id,arrival_delay,depart_delay\ns1,,12.5\n";
        let mut rdr = csv::Reader::from_reader(data.as_bytes());
        let rows: Vec<DelayRecord> = rdr.deserialize().collect::<Result<_, _>>().unwrap();

        assert_eq!(rows[0].arrival_delay, None);
        assert_eq!(rows[0].depart_delay, Some(12.5));
    }
}
