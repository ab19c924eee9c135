//! Airport directory
//!
//! Holds the static airport table in memory and translates public airport
//! IDs to the encoded IDs the classifier was trained on. The table is built
//! once by [`AirportDirectory::load`] and is read-only afterwards.

mod source;

pub use source::{
    AirportRow, AirportSource, AirportTable, CsvAirportFile, StaticAirportSource,
    REQUIRED_COLUMNS,
};

use crate::error::DirectoryError;
use crate::models::{AirportRecord, AirportView, MAX_MODEL_AIRPORT_ID, MIN_MODEL_AIRPORT_ID};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Number of airports included in the summary sample
const SUMMARY_SAMPLE_SIZE: usize = 5;

/// Dataset summary for status reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectorySummary {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_airports: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapped_airports: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_airports: Option<Vec<AirportView>>,
}

#[derive(Debug)]
struct DirectoryData {
    /// Sorted by name ascending
    airports: Vec<AirportRecord>,
    index: HashMap<i64, usize>,
    columns: Vec<String>,
}

/// In-memory airport directory
#[derive(Debug, Default)]
pub struct AirportDirectory {
    data: Option<DirectoryData>,
}

impl AirportDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the dataset from a source, replacing any previous contents.
    ///
    /// Rows without an ID or a name are dropped. On failure the directory is
    /// left empty and every lookup fails with [`DirectoryError::NotLoaded`].
    pub fn load(&mut self, source: &dyn AirportSource) -> Result<usize, DirectoryError> {
        self.data = None;

        info!(source = %source.describe(), "Loading airport data");
        let table = source.read()?;
        let data = build(table)?;
        let count = data.airports.len();

        info!(airports = count, "Airport data loaded");
        self.data = Some(data);
        Ok(count)
    }

    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    fn data(&self) -> Result<&DirectoryData, DirectoryError> {
        self.data.as_ref().ok_or(DirectoryError::NotLoaded)
    }

    /// All airports sorted by name ascending
    pub fn list_all(&self) -> Result<&[AirportRecord], DirectoryError> {
        Ok(&self.data()?.airports)
    }

    pub fn find_by_id(&self, airport_id: i64) -> Result<Option<&AirportRecord>, DirectoryError> {
        let data = self.data()?;
        Ok(data.index.get(&airport_id).map(|&i| &data.airports[i]))
    }

    /// Returns false when the directory is not loaded
    pub fn exists(&self, airport_id: i64) -> bool {
        matches!(self.find_by_id(airport_id), Ok(Some(_)))
    }

    /// Encoded model airport ID for a public airport ID
    pub fn encoded_id_for(&self, airport_id: i64) -> Result<Option<u8>, DirectoryError> {
        Ok(self.find_by_id(airport_id)?.and_then(|a| a.model_id))
    }

    pub fn summary(&self) -> DirectorySummary {
        match &self.data {
            Some(data) => DirectorySummary {
                status: "loaded".to_string(),
                total_airports: Some(data.airports.len()),
                mapped_airports: Some(
                    data.airports.iter().filter(|a| a.model_id.is_some()).count(),
                ),
                columns: Some(data.columns.clone()),
                sample_airports: Some(
                    data.airports
                        .iter()
                        .take(SUMMARY_SAMPLE_SIZE)
                        .map(AirportRecord::view)
                        .collect(),
                ),
            },
            None => DirectorySummary {
                status: "Airports data not loaded".to_string(),
                total_airports: None,
                mapped_airports: None,
                columns: None,
                sample_airports: None,
            },
        }
    }
}

fn build(table: AirportTable) -> Result<DirectoryData, DirectoryError> {
    let mut airports = Vec::with_capacity(table.rows.len());
    let mut seen = HashMap::new();

    for (i, row) in table.rows.into_iter().enumerate() {
        let row_number = i + 1;
        let Some(record) = parse_row(row_number, row)? else {
            debug!(row = row_number, "Skipping airport row without ID or name");
            continue;
        };
        if let Some(first) = seen.insert(record.id, row_number) {
            return Err(DirectoryError::Malformed {
                row: row_number,
                reason: format!("duplicate AirportID {} (first seen at row {})", record.id, first),
            });
        }
        airports.push(record);
    }

    // Stable, so equal names keep dataset order
    airports.sort_by(|a, b| a.name.cmp(&b.name));

    let index = airports
        .iter()
        .enumerate()
        .map(|(i, a)| (a.id, i))
        .collect();

    Ok(DirectoryData {
        airports,
        index,
        columns: table.columns,
    })
}

/// Validate a raw row. Returns `Ok(None)` for rows that should be dropped.
fn parse_row(row_number: usize, row: AirportRow) -> Result<Option<AirportRecord>, DirectoryError> {
    let (Some(raw_id), Some(name)) = (row.airport_id, row.airport_name) else {
        return Ok(None);
    };

    let id = match parse_integral(&raw_id) {
        Some(id) if id > 0 => id,
        _ => {
            return Err(DirectoryError::Malformed {
                row: row_number,
                reason: format!("AirportID '{}' is not a positive integer", raw_id),
            })
        }
    };

    let model_id = row
        .model_airport_id
        .as_deref()
        .and_then(|raw| parse_model_id(id, raw));

    Ok(Some(AirportRecord {
        id,
        name,
        code: row.airport_code,
        city: row.city_name,
        state: row.state,
        model_id,
    }))
}

fn parse_model_id(airport_id: i64, raw: &str) -> Option<u8> {
    let parsed = parse_integral(raw)
        .and_then(|v| u8::try_from(v).ok())
        .filter(|v| (MIN_MODEL_AIRPORT_ID..=MAX_MODEL_AIRPORT_ID).contains(v));

    if parsed.is_none() {
        warn!(
            airport_id = airport_id,
            model_airport_id = %raw,
            "Ignoring malformed model airport ID, airport cannot be predicted"
        );
    }
    parsed
}

/// Parse an integer, also accepting integral floats such as `"12.0"`
fn parse_integral(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64)
            .map(|v| v as i64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: Option<&str>, name: Option<&str>, model_id: Option<&str>) -> AirportRow {
        AirportRow {
            airport_id: id.map(str::to_string),
            airport_name: name.map(str::to_string),
            airport_code: None,
            city_name: None,
            state: None,
            model_airport_id: model_id.map(str::to_string),
        }
    }

    fn loaded(rows: Vec<AirportRow>) -> AirportDirectory {
        let mut directory = AirportDirectory::new();
        directory.load(&StaticAirportSource::new(rows)).unwrap();
        directory
    }

    fn sample_directory() -> AirportDirectory {
        loaded(vec![
            row(Some("12892"), Some("Los Angeles International"), Some("2")),
            row(Some("10397"), Some("Hartsfield-Jackson Atlanta Intl"), Some("1")),
            row(Some("11298"), Some("Dallas/Fort Worth International"), Some("3.0")),
            row(Some("14747"), Some("Seattle/Tacoma International"), None),
            row(Some("13930"), Some("Chicago O'Hare International"), Some("abc")),
        ])
    }

    #[test]
    fn test_list_all_sorted_by_name() {
        let directory = sample_directory();
        let names: Vec<&str> = directory
            .list_all()
            .unwrap()
            .iter()
            .map(|a| a.name.as_str())
            .collect();

        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names[0], "Chicago O'Hare International");
    }

    #[test]
    fn test_sort_is_case_sensitive_byte_order() {
        let directory = loaded(vec![
            row(Some("1"), Some("alpha field"), Some("1")),
            row(Some("2"), Some("Zulu field"), Some("2")),
        ]);
        let all = directory.list_all().unwrap();
        assert_eq!(all[0].name, "Zulu field");
        assert_eq!(all[1].name, "alpha field");
    }

    #[test]
    fn test_find_by_id_round_trips_every_record() {
        let directory = sample_directory();
        for airport in directory.list_all().unwrap() {
            assert!(directory.exists(airport.id));
            assert_eq!(directory.find_by_id(airport.id).unwrap().unwrap().id, airport.id);
        }
    }

    #[test]
    fn test_unknown_id_is_absent() {
        let directory = sample_directory();
        assert!(directory.find_by_id(99999).unwrap().is_none());
        assert!(!directory.exists(99999));
        assert_eq!(directory.encoded_id_for(99999).unwrap(), None);
    }

    #[test]
    fn test_encoded_id_mapping() {
        let directory = sample_directory();
        assert_eq!(directory.encoded_id_for(10397).unwrap(), Some(1));
        assert_eq!(directory.encoded_id_for(11298).unwrap(), Some(3));
    }

    #[test]
    fn test_unmapped_records_are_retained() {
        let directory = sample_directory();
        assert!(directory.exists(14747));
        assert!(directory.exists(13930));
        assert_eq!(directory.encoded_id_for(14747).unwrap(), None);
        assert_eq!(directory.encoded_id_for(13930).unwrap(), None);
    }

    #[test]
    fn test_out_of_range_model_id_is_unmapped() {
        let directory = loaded(vec![
            row(Some("1"), Some("Too High"), Some("71")),
            row(Some("2"), Some("Zero"), Some("0")),
            row(Some("3"), Some("Fractional"), Some("4.5")),
            row(Some("4"), Some("Upper Bound"), Some("70")),
        ]);
        assert_eq!(directory.encoded_id_for(1).unwrap(), None);
        assert_eq!(directory.encoded_id_for(2).unwrap(), None);
        assert_eq!(directory.encoded_id_for(3).unwrap(), None);
        assert_eq!(directory.encoded_id_for(4).unwrap(), Some(70));
    }

    #[test]
    fn test_rows_missing_id_or_name_are_dropped() {
        let directory = loaded(vec![
            row(None, Some("No ID"), Some("1")),
            row(Some("2"), None, Some("2")),
            row(Some("3"), Some("Kept"), Some("3")),
        ]);
        assert_eq!(directory.list_all().unwrap().len(), 1);
        assert!(!directory.exists(2));
    }

    #[test]
    fn test_non_integer_id_fails_load() {
        let mut directory = AirportDirectory::new();
        let err = directory
            .load(&StaticAirportSource::new(vec![row(Some("ATL"), Some("Atlanta"), Some("1"))]))
            .unwrap_err();
        assert!(matches!(err, DirectoryError::Malformed { row: 1, .. }));
        assert!(!directory.is_loaded());
    }

    #[test]
    fn test_duplicate_id_fails_load() {
        let mut directory = AirportDirectory::new();
        let err = directory
            .load(&StaticAirportSource::new(vec![
                row(Some("1"), Some("First"), Some("1")),
                row(Some("1"), Some("Second"), Some("2")),
            ]))
            .unwrap_err();
        assert!(matches!(err, DirectoryError::Malformed { row: 2, .. }));
    }

    #[test]
    fn test_failed_reload_clears_previous_data() {
        let mut directory = sample_directory();
        assert!(directory.is_loaded());

        let result = directory.load(&StaticAirportSource::new(vec![row(
            Some("-5"),
            Some("Negative"),
            None,
        )]));
        assert!(result.is_err());
        assert!(matches!(directory.list_all(), Err(DirectoryError::NotLoaded)));
        assert!(!directory.exists(10397));
    }

    #[test]
    fn test_unloaded_lookups_fail() {
        let directory = AirportDirectory::new();
        assert!(matches!(directory.list_all(), Err(DirectoryError::NotLoaded)));
        assert!(matches!(directory.find_by_id(1), Err(DirectoryError::NotLoaded)));
        assert!(matches!(directory.encoded_id_for(1), Err(DirectoryError::NotLoaded)));
        assert!(!directory.exists(1));
    }

    #[test]
    fn test_summary() {
        let summary = sample_directory().summary();
        assert_eq!(summary.status, "loaded");
        assert_eq!(summary.total_airports, Some(5));
        assert_eq!(summary.mapped_airports, Some(3));
        assert_eq!(summary.sample_airports.unwrap().len(), 5);

        let empty = AirportDirectory::new().summary();
        assert_eq!(empty.status, "Airports data not loaded");
        assert!(empty.total_airports.is_none());
    }

    #[test]
    fn test_parse_integral() {
        assert_eq!(parse_integral("42"), Some(42));
        assert_eq!(parse_integral("42.0"), Some(42));
        assert_eq!(parse_integral("42.5"), None);
        assert_eq!(parse_integral("NaN"), None);
        assert_eq!(parse_integral(""), None);
    }
}
