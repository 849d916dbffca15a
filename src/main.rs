mod config;
mod csv_store;
mod error;
mod merge;
mod record;
mod supabase_client;
mod units;
mod weather_client;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};

use config::{CITIES, City, Config, Dataset, cities_matching};
use error::{ForelastError, Result};
use record::Keep;
use supabase_client::{RemoteStore, SupabaseClient};
use weather_client::{WeatherClient, WeatherSource};

#[derive(Parser)]
#[command(
    name = "forelast",
    about = "Fetch Metro Manila daily weather from Visual Crossing and sync it to Supabase"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch observed weather for the past days and sync the city tables
    Sync {
        /// How many days to look back from today (inclusive window)
        #[arg(long, default_value_t = 1)]
        days: i64,

        /// Cities to sync (comma-separated short names). Defaults to all 16.
        #[arg(long, value_delimiter = ',')]
        cities: Option<Vec<String>>,

        /// Directory holding the per-city CSV files
        #[arg(long, default_value = "WeatherData")]
        data_dir: PathBuf,

        /// Output destination: supabase (CSV + remote) or csv (CSV only)
        #[arg(long, default_value = "supabase")]
        output: Output,
    },

    /// Fetch the forecast for the coming days and sync the forecast tables
    Forecast {
        /// How many days ahead of today to fetch (inclusive window)
        #[arg(long, default_value_t = 7)]
        days: i64,

        /// Cities to sync (comma-separated short names). Defaults to all 16.
        #[arg(long, value_delimiter = ',')]
        cities: Option<Vec<String>>,

        /// Directory holding the per-city CSV files
        #[arg(long, default_value = "WeatherData")]
        data_dir: PathBuf,

        /// Output destination: supabase (CSV + remote) or csv (CSV only)
        #[arg(long, default_value = "supabase")]
        output: Output,
    },

    /// Convert a CSV from imperial to metric units, keeping column names
    Convert {
        /// Input CSV file
        #[arg(long)]
        input: PathBuf,

        /// Output CSV file
        #[arg(long)]
        output: PathBuf,
    },

    /// Remove rows sharing a datetime from city CSV files
    Dedup {
        /// CSV files to deduplicate
        files: Vec<PathBuf>,

        /// Which duplicate to keep: first or last
        #[arg(long, default_value = "last")]
        keep: Keep,

        /// Directory to write the cleaned files into
        #[arg(long, default_value = "deduplicated")]
        out_dir: PathBuf,
    },

    /// Merge all CSVs under year subfolders into one file
    Merge {
        /// Root directory containing year folders (2000, 2001, ...)
        #[arg(long)]
        root: PathBuf,

        /// Merged output file
        #[arg(long, default_value = "merged_output.csv")]
        output: PathBuf,
    },
}

#[derive(Debug, Clone, ValueEnum)]
enum Output {
    Supabase,
    Csv,
}

fn run_sync(
    dataset: Dataset,
    days: i64,
    cities: Option<Vec<String>>,
    data_dir: PathBuf,
    output: Output,
) -> Result<()> {
    let config = match output {
        Output::Supabase => Config::load()?,
        Output::Csv => Config::load_fetch_only()?,
    };

    let cities: Vec<&'static City> = match cities {
        Some(names) => cities_matching(&names)?,
        None => CITIES.iter().collect(),
    };

    fs::create_dir_all(&data_dir)?;

    let (from, to) = dataset.date_window(days);
    info!(
        from = %from,
        to = %to,
        cities = cities.len(),
        dataset = ?dataset,
        "Starting sync"
    );

    let weather = WeatherClient::new(config.visual_crossing_api_key.clone());
    let supabase = matches!(output, Output::Supabase).then(|| SupabaseClient::new(&config));

    let summary = sync_batch(
        &cities,
        dataset,
        from,
        to,
        &data_dir,
        &weather,
        supabase.as_ref(),
    );

    info!(
        succeeded = summary.synced,
        failed = summary.failures.len(),
        total = cities.len(),
        "Sync complete"
    );
    for (city, reason) in &summary.failures {
        warn!(city = %city, reason = %reason, "City was skipped");
    }

    // Partial success is expected; failed cities were reported above.
    Ok(())
}

struct BatchSummary {
    synced: usize,
    failures: Vec<(&'static str, String)>,
}

/// Attempt every city exactly once, in list order. A city failing at any
/// stage is recorded and never stops the others.
fn sync_batch<W: WeatherSource, S: RemoteStore>(
    cities: &[&'static City],
    dataset: Dataset,
    from: NaiveDate,
    to: NaiveDate,
    data_dir: &Path,
    weather: &W,
    supabase: Option<&S>,
) -> BatchSummary {
    let mut summary = BatchSummary {
        synced: 0,
        failures: Vec::new(),
    };

    for &city in cities {
        match sync_city(city, dataset, from, to, data_dir, weather, supabase) {
            Ok(rows) => {
                summary.synced += 1;
                info!(city = city.name, rows, "City synced");
            }
            Err(e) => {
                error!(city = city.name, error = %e, "City failed, continuing");
                summary.failures.push((city.name, e.to_string()));
            }
        }
    }

    summary
}

/// One city, one pass: fetch, reconcile into the CSV, persist, upsert.
fn sync_city<W: WeatherSource, S: RemoteStore>(
    city: &City,
    dataset: Dataset,
    from: NaiveDate,
    to: NaiveDate,
    data_dir: &Path,
    weather: &W,
    supabase: Option<&S>,
) -> Result<usize> {
    let fetched = weather.fetch_daily(city, from, to)?;
    let fetched_count = fetched.len();

    let path = city.csv_path(data_dir, dataset);
    let existing = csv_store::load(&path)?;
    let merged = record::reconcile(existing, fetched.clone());
    csv_store::save(&path, &merged)?;

    if let Some(db) = supabase {
        let table = dataset.table_name(city);
        let acknowledged = db.upsert(&table, &fetched)?;
        if acknowledged != fetched_count {
            warn!(
                city = city.name,
                table = %table,
                submitted = fetched_count,
                acknowledged,
                "Upsert count mismatch"
            );
        }
    }

    Ok(fetched_count)
}

fn run_convert(input: PathBuf, output: PathBuf) -> Result<()> {
    if !input.exists() {
        return Err(ForelastError::config(format!(
            "Input file not found: {}",
            input.display()
        )));
    }

    let records = csv_store::load(&input)?;
    let converted = units::convert_to_metric(records);
    let written = csv_store::save(&output, &converted)?;

    info!(rows = written, path = %output.display(), "Done — wrote metric CSV");
    Ok(())
}

fn run_dedup(files: Vec<PathBuf>, keep: Keep, out_dir: PathBuf) -> Result<()> {
    if files.is_empty() {
        return Err(ForelastError::config("No input files given"));
    }

    fs::create_dir_all(&out_dir)?;

    let mut processed = 0usize;
    let mut total_removed = 0usize;
    let mut failures: Vec<(String, String)> = Vec::new();

    for file in &files {
        match dedup_file(file, keep, &out_dir) {
            Ok(removed) => {
                info!(file = %file.display(), removed, "Deduplicated");
                processed += 1;
                total_removed += removed;
            }
            Err(e) => {
                error!(file = %file.display(), error = %e, "Skipping file");
                failures.push((file.display().to_string(), e.to_string()));
            }
        }
    }

    info!(
        processed,
        failed = failures.len(),
        duplicates_removed = total_removed,
        "Dedup complete"
    );
    for (file, reason) in &failures {
        warn!(file = %file, reason = %reason, "File was skipped");
    }

    Ok(())
}

fn dedup_file(file: &Path, keep: Keep, out_dir: &Path) -> Result<usize> {
    if !file.exists() {
        return Err(ForelastError::config(format!(
            "File not found: {}",
            file.display()
        )));
    }

    let file_name = file
        .file_name()
        .ok_or_else(|| ForelastError::config(format!("Not a file path: {}", file.display())))?;

    let records = csv_store::load(file)?;
    let (cleaned, removed) = record::dedup_by_datetime(records, keep);
    csv_store::save(&out_dir.join(file_name), &cleaned)?;

    Ok(removed)
}

fn run_merge(root: PathBuf, output: PathBuf) -> Result<()> {
    let summary = merge::merge_year_folders(&root, &output)?;

    info!(
        folders = summary.folders,
        files = summary.files,
        skipped = summary.skipped,
        rows = summary.rows,
        path = %output.display(),
        "Done — wrote merged CSV"
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Sync {
            days,
            cities,
            data_dir,
            output,
        } => run_sync(Dataset::Weather, days, cities, data_dir, output),
        Command::Forecast {
            days,
            cities,
            data_dir,
            output,
        } => run_sync(Dataset::Forecast, days, cities, data_dir, output),
        Command::Convert { input, output } => run_convert(input, output),
        Command::Dedup {
            files,
            keep,
            out_dir,
        } => run_dedup(files, keep, out_dir),
        Command::Merge { root, output } => run_merge(root, output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::WeatherRecord;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Returns one record per city per run, failing for one scripted city the
    /// way a 500 from the vendor would.
    struct ScriptedSource {
        failing: Option<&'static str>,
        temp: f64,
    }

    impl WeatherSource for ScriptedSource {
        fn fetch_daily(
            &self,
            city: &City,
            from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<Vec<WeatherRecord>> {
            if self.failing == Some(city.name) {
                return Err(ForelastError::fetch(city.name, "500", "Internal Server Error"));
            }
            Ok(vec![WeatherRecord {
                name: city.display_name(),
                datetime: from.to_string(),
                tempmax: None,
                tempmin: None,
                temp: Some(self.temp),
                humidity: None,
                precip: None,
                windspeed: None,
            }])
        }
    }

    struct RecordingStore {
        calls: RefCell<Vec<(String, usize)>>,
        acknowledge: bool,
    }

    impl RecordingStore {
        fn new(acknowledge: bool) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                acknowledge,
            }
        }
    }

    impl RemoteStore for RecordingStore {
        fn upsert(&self, table: &str, records: &[WeatherRecord]) -> Result<usize> {
            self.calls.borrow_mut().push((table.to_string(), records.len()));
            Ok(if self.acknowledge { records.len() } else { 0 })
        }
    }

    #[test]
    fn batch_continues_past_a_failing_city() {
        let dir = TempDir::new().unwrap();
        let cities = cities_matching(&["Marikina".to_string(), "Pasig".to_string()]).unwrap();
        let source = ScriptedSource {
            failing: Some("Marikina"),
            temp: 30.0,
        };
        let store = RecordingStore::new(true);
        let (from, to) = Dataset::Weather.date_window(1);

        let summary = sync_batch(
            &cities,
            Dataset::Weather,
            from,
            to,
            dir.path(),
            &source,
            Some(&store),
        );

        assert_eq!(summary.synced, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].0, "Marikina");

        // Only the surviving city reached the remote store or disk.
        let calls = store.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "pasig_city_weather");
        assert!(dir.path().join("Pasig City Weather Data.csv").exists());
        assert!(!dir.path().join("Marikina City Weather Data.csv").exists());
    }

    #[test]
    fn csv_only_batch_never_touches_the_remote() {
        let dir = TempDir::new().unwrap();
        let cities = cities_matching(&["Taguig".to_string()]).unwrap();
        let source = ScriptedSource {
            failing: None,
            temp: 29.0,
        };
        let (from, to) = Dataset::Forecast.date_window(7);

        let summary = sync_batch(
            &cities,
            Dataset::Forecast,
            from,
            to,
            dir.path(),
            &source,
            None::<&RecordingStore>,
        );

        assert_eq!(summary.synced, 1);
        assert!(dir.path().join("Taguig City Forecast Data.csv").exists());
    }

    #[test]
    fn count_mismatch_does_not_fail_the_city() {
        let dir = TempDir::new().unwrap();
        let cities = cities_matching(&["Pasay".to_string()]).unwrap();
        let source = ScriptedSource {
            failing: None,
            temp: 31.0,
        };
        let store = RecordingStore::new(false);
        let (from, to) = Dataset::Weather.date_window(1);

        let summary = sync_batch(
            &cities,
            Dataset::Weather,
            from,
            to,
            dir.path(),
            &source,
            Some(&store),
        );

        assert_eq!(summary.synced, 1);
        assert!(summary.failures.is_empty());
    }

    #[test]
    fn repeated_sync_reconciles_instead_of_duplicating() {
        let dir = TempDir::new().unwrap();
        let cities = cities_matching(&["Pasig".to_string()]).unwrap();
        let (from, to) = Dataset::Weather.date_window(1);

        let first = ScriptedSource {
            failing: None,
            temp: 30.0,
        };
        sync_batch(
            &cities,
            Dataset::Weather,
            from,
            to,
            dir.path(),
            &first,
            None::<&RecordingStore>,
        );

        let second = ScriptedSource {
            failing: None,
            temp: 31.5,
        };
        sync_batch(
            &cities,
            Dataset::Weather,
            from,
            to,
            dir.path(),
            &second,
            None::<&RecordingStore>,
        );

        let records = csv_store::load(&dir.path().join("Pasig City Weather Data.csv")).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].temp, Some(31.5));
    }
}
