//! Airport dataset sources
//!
//! The directory reads raw rows through [`AirportSource`]; validation and
//! ordering happen in the directory itself.

use crate::error::DirectoryError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Columns that must be present in the dataset header
pub const REQUIRED_COLUMNS: [&str; 3] = ["AirportID", "AirportName", "ModelAirportID"];

/// Raw airport row as read from the dataset, before validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirportRow {
    #[serde(rename = "AirportID")]
    pub airport_id: Option<String>,
    #[serde(rename = "AirportName")]
    pub airport_name: Option<String>,
    #[serde(rename = "AirportCode")]
    pub airport_code: Option<String>,
    #[serde(rename = "CityName")]
    pub city_name: Option<String>,
    #[serde(rename = "State")]
    pub state: Option<String>,
    #[serde(rename = "ModelAirportID")]
    pub model_airport_id: Option<String>,
}

/// Header and rows of an airport dataset
#[derive(Debug, Clone, Default)]
pub struct AirportTable {
    pub columns: Vec<String>,
    pub rows: Vec<AirportRow>,
}

/// Trait for airport dataset sources
pub trait AirportSource: Send + Sync {
    /// Read the full dataset
    fn read(&self) -> Result<AirportTable, DirectoryError>;

    /// Human-readable location for logs
    fn describe(&self) -> String;
}

/// Airport dataset stored as a CSV file with a header row
#[derive(Debug, Clone)]
pub struct CsvAirportFile {
    path: PathBuf,
}

impl CsvAirportFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AirportSource for CsvAirportFile {
    fn read(&self) -> Result<AirportTable, DirectoryError> {
        let file = File::open(&self.path).map_err(|source| DirectoryError::Io {
            path: self.path.clone(),
            source,
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(file);

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        for required in REQUIRED_COLUMNS {
            if !columns.iter().any(|c| c == required) {
                return Err(DirectoryError::MissingColumn(required));
            }
        }

        let rows = reader
            .deserialize::<AirportRow>()
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AirportTable { columns, rows })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Pre-parsed airport rows held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticAirportSource {
    table: AirportTable,
}

impl StaticAirportSource {
    pub fn new(rows: Vec<AirportRow>) -> Self {
        Self {
            table: AirportTable {
                columns: [
                    "AirportID",
                    "AirportName",
                    "AirportCode",
                    "CityName",
                    "State",
                    "ModelAirportID",
                ]
                .iter()
                .map(|c| c.to_string())
                .collect(),
                rows,
            },
        }
    }
}

impl AirportSource for StaticAirportSource {
    fn read(&self) -> Result<AirportTable, DirectoryError> {
        Ok(self.table.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory ({} rows)", self.table.rows.len())
    }
}
