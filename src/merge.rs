use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::csv_store;
use crate::error::{ForelastError, Result};

#[derive(Debug, Default)]
pub struct MergeSummary {
    pub folders: usize,
    pub files: usize,
    pub skipped: usize,
    pub rows: usize,
}

/// Combine every CSV under the root's year subdirectories (folders named
/// "2000", "2001", ...) into one file, appending `year` and `source_file`
/// columns so rows stay traceable to their origin.
///
/// A file that fails to read is logged and skipped; only the output file
/// itself failing is fatal.
pub fn merge_year_folders(root: &Path, output: &Path) -> Result<MergeSummary> {
    let years = year_folders(root)?;
    if years.is_empty() {
        return Err(ForelastError::config(format!(
            "No year folders found in {}",
            root.display()
        )));
    }

    info!(root = %root.display(), folders = years.len(), "Merging year folders");

    let mut writer = csv::Writer::from_path(output)?;
    writer.write_record(
        csv_store::COLUMNS
            .iter()
            .copied()
            .chain(["year", "source_file"]),
    )?;

    let mut summary = MergeSummary::default();

    for (year, dir) in &years {
        let mut csv_files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .and_then(OsStr::to_str)
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
            })
            .collect();
        csv_files.sort();

        for file in &csv_files {
            let source_file = file
                .file_name()
                .and_then(OsStr::to_str)
                .unwrap_or_default()
                .to_string();

            let records = match csv_store::load(file) {
                Ok(records) => records,
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "Skipping unreadable CSV");
                    summary.skipped += 1;
                    continue;
                }
            };

            for record in &records {
                let mut row: Vec<String> = csv_store::record_fields(record).to_vec();
                row.push(year.clone());
                row.push(source_file.clone());
                writer.write_record(&row)?;
            }

            summary.files += 1;
            summary.rows += records.len();
        }

        summary.folders += 1;
    }

    writer.flush()?;

    info!(
        folders = summary.folders,
        files = summary.files,
        skipped = summary.skipped,
        rows = summary.rows,
        output = %output.display(),
        "Merge complete"
    );

    Ok(summary)
}

/// Year subdirectories of the root, sorted, as (name, path) pairs.
fn year_folders(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut years: Vec<(String, PathBuf)> = fs::read_dir(root)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let path = entry.path();
            let name = entry.file_name().into_string().ok()?;
            (path.is_dir() && !name.is_empty() && name.chars().all(|c| c.is_ascii_digit()))
                .then_some((name, path))
        })
        .collect();
    years.sort();
    Ok(years)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::WeatherRecord;
    use tempfile::TempDir;

    fn record(datetime: &str, temp: f64) -> WeatherRecord {
        WeatherRecord {
            name: "Pasig City, National Capital Region, Philippines".to_string(),
            datetime: datetime.to_string(),
            tempmax: None,
            tempmin: None,
            temp: Some(temp),
            humidity: None,
            precip: None,
            windspeed: None,
        }
    }

    #[test]
    fn merges_year_folders_with_provenance_columns() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        fs::create_dir(root.join("2023")).unwrap();
        fs::create_dir(root.join("2024")).unwrap();
        fs::create_dir(root.join("notes")).unwrap();
        csv_store::save(&root.join("2023/pasig.csv"), &[record("2023-06-01", 28.0)]).unwrap();
        csv_store::save(
            &root.join("2024/pasig.csv"),
            &[record("2024-06-01", 29.0), record("2024-06-02", 30.0)],
        )
        .unwrap();

        let output = root.join("merged.csv");
        let summary = merge_year_folders(root, &output).unwrap();

        assert_eq!(summary.folders, 2);
        assert_eq!(summary.files, 2);
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.skipped, 0);

        let mut reader = csv::Reader::from_path(&output).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 10);
        assert_eq!(&headers[8], "year");
        assert_eq!(&headers[9], "source_file");

        let rows: Vec<csv::StringRecord> =
            reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[0][8], "2023");
        assert_eq!(&rows[1][8], "2024");
        assert_eq!(&rows[1][9], "pasig.csv");
    }

    #[test]
    fn missing_year_folders_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("not-a-year")).unwrap();

        let result = merge_year_folders(dir.path(), &dir.path().join("merged.csv"));
        assert!(result.is_err());
    }
}
