use serde::Serialize;
use std::str::FromStr;

use crate::error::ForelastError;

/// One observed or forecast day for one city. Measurements the vendor did not
/// report stay `None` and are written out as empty cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherRecord {
    pub name: String,
    pub datetime: String,
    pub tempmax: Option<f64>,
    pub tempmin: Option<f64>,
    pub temp: Option<f64>,
    pub humidity: Option<f64>,
    pub precip: Option<f64>,
    pub windspeed: Option<f64>,
}

impl WeatherRecord {
    /// Composite identity: one record per city per calendar day.
    pub fn key(&self) -> (&str, &str) {
        (&self.name, &self.datetime)
    }
}

/// Merge `incoming` into `existing` by composite key.
///
/// A later record with a key already seen replaces the earlier one whole;
/// unseen keys append. Existing records without an incoming counterpart are
/// kept unchanged. The result holds exactly one record per distinct key, so
/// feeding a file that accumulated duplicates through one pass also cleans it.
pub fn reconcile(
    existing: Vec<WeatherRecord>,
    incoming: Vec<WeatherRecord>,
) -> Vec<WeatherRecord> {
    let mut merged: Vec<WeatherRecord> = Vec::with_capacity(existing.len() + incoming.len());

    // City tables hold a few thousand rows at most, a linear scan is fine.
    for record in existing.into_iter().chain(incoming) {
        match merged.iter().position(|r| r.key() == record.key()) {
            Some(i) => merged[i] = record,
            None => merged.push(record),
        }
    }

    merged
}

/// Which duplicate to keep when deduplicating on `datetime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keep {
    First,
    Last,
}

impl FromStr for Keep {
    type Err = ForelastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first" => Ok(Keep::First),
            "last" => Ok(Keep::Last),
            _ => Err(ForelastError::config(format!(
                "Invalid keep policy: {s} (expected first or last)"
            ))),
        }
    }
}

/// Sort by date and drop rows sharing a `datetime`, keeping the first or last
/// occurrence. Returns the cleaned rows and how many were removed.
///
/// Old ingest scripts appended without checking for duplicates, so files from
/// that era key on `datetime` alone (one city per file).
pub fn dedup_by_datetime(records: Vec<WeatherRecord>, keep: Keep) -> (Vec<WeatherRecord>, usize) {
    let original = records.len();

    let mut sorted = records;
    sorted.sort_by(|a, b| a.datetime.cmp(&b.datetime));

    let mut result: Vec<WeatherRecord> = Vec::with_capacity(sorted.len());
    for record in sorted {
        match result.iter().position(|r| r.datetime == record.datetime) {
            Some(i) => {
                if keep == Keep::Last {
                    result[i] = record;
                }
            }
            None => result.push(record),
        }
    }

    let removed = original - result.len();
    (result, removed)
}
