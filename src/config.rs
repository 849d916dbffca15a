use std::path::{Path, PathBuf};

use chrono::{Duration, Local, NaiveDate};

use crate::error::{ForelastError, Result};

/// The 16 NCR cities the site covers. Short names as the vendor resolves them;
/// query and display forms are derived.
#[derive(Debug, Clone)]
pub struct City {
    pub name: &'static str,
}

pub const CITIES: &[City] = &[
    City { name: "Caloocan" },
    City { name: "Las Piñas" },
    City { name: "Makati" },
    City { name: "Malabon" },
    City { name: "Mandaluyong" },
    City { name: "Manila" },
    City { name: "Marikina" },
    City { name: "Muntinlupa" },
    City { name: "Navotas" },
    City { name: "Parañaque" },
    City { name: "Pasay" },
    City { name: "Pasig" },
    City { name: "Quezon" },
    City { name: "San Juan" },
    City { name: "Taguig" },
    City { name: "Valenzuela" },
];

impl City {
    /// Location string sent to the weather API, e.g. "Pasig City".
    pub fn query_name(&self) -> String {
        format!("{} City", self.name)
    }

    /// Full display name stored in the `name` column.
    pub fn display_name(&self) -> String {
        format!("{} City, National Capital Region, Philippines", self.name)
    }

    /// Normalized stem used for remote table names.
    pub fn table_stem(&self) -> String {
        normalize_location(self.name)
    }

    pub fn csv_path(&self, data_dir: &Path, dataset: Dataset) -> PathBuf {
        data_dir.join(format!("{} City {} Data.csv", self.name, dataset.file_label()))
    }
}

/// Resolve a list of city names (case-insensitive short names) against CITIES.
pub fn cities_matching(names: &[String]) -> Result<Vec<&'static City>> {
    let mut selected = Vec::with_capacity(names.len());
    for name in names {
        let city = CITIES
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ForelastError::config(format!("Unknown city: {name}")))?;
        selected.push(city);
    }
    Ok(selected)
}

/// Remote tables that were created with a spelling differing from what plain
/// lower-case + diacritic folding would produce. Keyed on the lower-cased,
/// underscored form; checked before the generic fold so these stay pinned.
const TABLE_EXCEPTIONS: &[(&str, &str)] = &[
    ("las_piñas", "las_pinas"),
    ("parañaque", "paranaque"),
    // The remote tables for Marikina were created under this spelling.
    ("marikina", "markina"),
    ("quezon_city", "quezon"),
];

/// Normalize a location name into a remote table stem: lower-case, trimmed,
/// spaces to underscores, exception table applied, remaining diacritics folded
/// to ASCII.
pub fn normalize_location(name: &str) -> String {
    let lowered = name.trim().to_lowercase().replace(' ', "_");

    for (from, to) in TABLE_EXCEPTIONS {
        if lowered == *from {
            return (*to).to_string();
        }
    }

    lowered.chars().map(fold_diacritic).collect()
}

fn fold_diacritic(c: char) -> char {
    match c {
        'ñ' => 'n',
        'á' => 'a',
        'é' => 'e',
        'í' => 'i',
        'ó' => 'o',
        'ú' => 'u',
        'ü' => 'u',
        _ => c,
    }
}

/// Which remote table family and date window a sync run targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Weather,
    Forecast,
}

impl Dataset {
    pub fn table_name(&self, city: &City) -> String {
        match self {
            Dataset::Weather => format!("{}_city_weather", city.table_stem()),
            Dataset::Forecast => format!("{}_city_forecast", city.table_stem()),
        }
    }

    fn file_label(&self) -> &'static str {
        match self {
            Dataset::Weather => "Weather",
            Dataset::Forecast => "Forecast",
        }
    }

    /// Inclusive date range for a run: observed data looks back from today,
    /// forecasts look forward.
    pub fn date_window(&self, days: i64) -> (NaiveDate, NaiveDate) {
        let today = Local::now().date_naive();
        match self {
            Dataset::Weather => (today - Duration::days(days), today),
            Dataset::Forecast => (today, today + Duration::days(days)),
        }
    }
}

#[derive(Debug)]
pub struct Config {
    pub visual_crossing_api_key: String,
    pub supabase_url: String,
    pub supabase_key: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let get = |key: &str| -> Result<String> {
            std::env::var(key).map_err(|_| ForelastError::EnvVar(key.to_string()))
        };

        Ok(Config {
            visual_crossing_api_key: get("VISUAL_CROSSING_API_KEY")?,
            supabase_url: get("SUPABASE_URL")?,
            supabase_key: get("SUPABASE_KEY")?,
        })
    }

    /// Load only the weather API key (for CSV-only runs without Supabase).
    pub fn load_fetch_only() -> Result<Self> {
        dotenvy::dotenv().ok();

        let visual_crossing_api_key = std::env::var("VISUAL_CROSSING_API_KEY")
            .map_err(|_| ForelastError::EnvVar("VISUAL_CROSSING_API_KEY".to_string()))?;

        Ok(Config {
            visual_crossing_api_key,
            supabase_url: String::new(),
            supabase_key: String::new(),
        })
    }

    pub fn supabase_rest_url(&self) -> String {
        format!("{}/rest/v1", self.supabase_url.trim_end_matches('/'))
    }
}
