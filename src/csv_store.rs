use std::path::Path;

use tracing::{info, warn};

use crate::error::Result;
use crate::record::WeatherRecord;

/// Fixed column set shared by every city file and remote table. The store
/// never adds or drops columns based on what a file happens to contain.
pub const COLUMNS: [&str; 8] = [
    "name",
    "datetime",
    "tempmax",
    "tempmin",
    "temp",
    "humidity",
    "precip",
    "windspeed",
];

/// Read a city table. A missing file is an empty table, not an error.
///
/// Columns are looked up by header name, so files written before a column
/// existed load with `None` there. Cells that fail to parse as numbers are
/// also `None`; a structurally broken row is skipped with a warning.
pub fn load(path: &Path) -> Result<Vec<WeatherRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let headers = reader.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);
    let name_col = position("name");
    let datetime_col = position("datetime");
    let tempmax_col = position("tempmax");
    let tempmin_col = position("tempmin");
    let temp_col = position("temp");
    let humidity_col = position("humidity");
    let precip_col = position("precip");
    let windspeed_col = position("windspeed");

    let mut records = Vec::new();
    for result in reader.records() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping malformed CSV row");
                continue;
            }
        };

        let text = |col: Option<usize>| {
            col.and_then(|i| row.get(i)).unwrap_or("").trim().to_string()
        };
        let number = |col: Option<usize>| -> Option<f64> {
            col.and_then(|i| row.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .and_then(|s| s.parse().ok())
        };

        records.push(WeatherRecord {
            name: text(name_col),
            datetime: text(datetime_col),
            tempmax: number(tempmax_col),
            tempmin: number(tempmin_col),
            temp: number(temp_col),
            humidity: number(humidity_col),
            precip: number(precip_col),
            windspeed: number(windspeed_col),
        });
    }

    Ok(records)
}

/// Overwrite a city table with a header row plus all records in the fixed
/// column order. The writer is flushed and dropped before returning.
pub fn save(path: &Path, records: &[WeatherRecord]) -> Result<usize> {
    info!(path = %path.display(), rows = records.len(), "Writing CSV");

    let mut writer = csv::Writer::from_path(path)?;

    writer.write_record(COLUMNS)?;

    for record in records {
        writer.write_record(record_fields(record))?;
    }

    writer.flush()?;
    Ok(records.len())
}

/// One record as cells in the fixed column order, `None` as an empty cell.
pub(crate) fn record_fields(record: &WeatherRecord) -> [String; 8] {
    let cell = |v: Option<f64>| v.map_or(String::new(), |v| v.to_string());

    [
        record.name.clone(),
        record.datetime.clone(),
        cell(record.tempmax),
        cell(record.tempmin),
        cell(record.temp),
        cell(record.humidity),
        cell(record.precip),
        cell(record.windspeed),
    ]
}
