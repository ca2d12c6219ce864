#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CSV intake for case datasets.
//!
//! Reads a CSV with a header row, checks that the `latitude` and
//! `longitude` columns exist (exact, case-sensitive names), and drops rows
//! where either value is missing or not a finite number. Any other columns
//! are ignored.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use geo_profile_models::{Coordinate, ModelError, PointSet};

/// Columns every dataset must have.
pub const REQUIRED_COLUMNS: [&str; 2] = ["latitude", "longitude"];

/// Cell values treated as an empty cell rather than malformed data.
const MISSING_MARKERS: [&str; 8] = ["na", "n/a", "nan", "-nan", "null", "none", "#n/a", "<na>"];

/// Fewest valid rows the analysis accepts.
pub const MIN_VALID_ROWS: usize = 2;

/// Errors that stop a dataset from being loaded.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Reading the file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV could not be parsed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// One or more required columns are absent.
    #[error(
        "The CSV file must contain the columns: {} (missing: {})",
        REQUIRED_COLUMNS.join(", "),
        .missing.join(", ")
    )]
    Schema {
        /// Required columns not found in the header.
        missing: Vec<String>,
    },

    /// Too few usable rows after cleaning.
    #[error("At least {MIN_VALID_ROWS} valid data points are required for the analysis, found {valid}")]
    InsufficientData {
        /// Rows left after dropping missing values.
        valid: usize,
    },

    /// A cleaned row still failed validation.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// A cleaned dataset ready for analysis.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Data rows read from the file.
    pub records: usize,
    /// Rows dropped for a missing or invalid coordinate.
    pub dropped: usize,
    /// Of the dropped rows, those with text that is not a finite number
    /// (as opposed to blank or `NA`-style cells).
    pub malformed: usize,
    /// The remaining case locations, in file order.
    pub points: PointSet,
}

impl Dataset {
    /// The first `n` valid points, for display.
    #[must_use]
    pub fn preview(&self, n: usize) -> &[Coordinate] {
        let all = self.points.as_slice();
        &all[..n.min(all.len())]
    }
}

/// Opens and loads a CSV file.
///
/// # Errors
///
/// See [`load_points`].
pub fn load_points_from_path(path: &Path) -> Result<Dataset, IngestError> {
    log::info!("Loading cases from {}", path.display());
    load_points(File::open(path)?)
}

/// Loads and cleans case coordinates from CSV data.
///
/// # Errors
///
/// * [`IngestError::Schema`] if `latitude` or `longitude` is missing from
///   the header.
/// * [`IngestError::InsufficientData`] if fewer than two rows remain after
///   dropping rows with missing values.
/// * [`IngestError::Csv`] / [`IngestError::Io`] for unreadable input.
pub fn load_points<R: Read>(reader: R) -> Result<Dataset, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_owned())
        .collect();

    let (lat_idx, lon_idx) = required_indices(&headers)?;

    let mut records = 0usize;
    let mut malformed = 0usize;
    let mut coordinates = Vec::new();

    for result in reader.records() {
        let record = result?;
        records += 1;

        let lat = Cell::parse(record.get(lat_idx));
        let lon = Cell::parse(record.get(lon_idx));

        match (lat, lon) {
            (Cell::Value(lat), Cell::Value(lon)) => coordinates.push(Coordinate::new(lat, lon)),
            (Cell::Malformed, _) | (_, Cell::Malformed) => {
                malformed += 1;
                log::warn!(
                    "Dropping row {records}: malformed coordinate latitude={:?} longitude={:?}",
                    record.get(lat_idx).unwrap_or_default(),
                    record.get(lon_idx).unwrap_or_default()
                );
            }
            _ => log::debug!("Dropping row {records}: missing coordinate"),
        }
    }

    let dropped = records - coordinates.len();
    log::info!(
        "Read {records} records, dropped {dropped} ({malformed} malformed), {} valid",
        coordinates.len()
    );

    if coordinates.len() < MIN_VALID_ROWS {
        return Err(IngestError::InsufficientData {
            valid: coordinates.len(),
        });
    }

    Ok(Dataset {
        records,
        dropped,
        malformed,
        points: PointSet::new(coordinates)?,
    })
}

fn required_indices(headers: &[String]) -> Result<(usize, usize), IngestError> {
    let position = |name: &str| headers.iter().position(|h| h == name);

    match (position(REQUIRED_COLUMNS[0]), position(REQUIRED_COLUMNS[1])) {
        (Some(lat), Some(lon)) => Ok((lat, lon)),
        (lat, lon) => {
            let missing = [(REQUIRED_COLUMNS[0], lat), (REQUIRED_COLUMNS[1], lon)]
                .into_iter()
                .filter(|(_, idx)| idx.is_none())
                .map(|(name, _)| name.to_owned())
                .collect();
            Err(IngestError::Schema { missing })
        }
    }
}

/// One coordinate cell after parsing.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Cell {
    Value(f64),
    /// Blank, absent, or an `NA`-style marker.
    Missing,
    /// Text that is not a number, or an infinite value.
    Malformed,
}

impl Cell {
    fn parse(raw: Option<&str>) -> Self {
        let raw = raw.map_or("", str::trim);
        if raw.is_empty() || MISSING_MARKERS.iter().any(|m| raw.eq_ignore_ascii_case(m)) {
            return Self::Missing;
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Self::Value(v),
            _ => Self::Malformed,
        }
    }
}
