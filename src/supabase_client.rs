use tracing::debug;

use crate::config::Config;
use crate::error::{ForelastError, Result};
use crate::record::WeatherRecord;

/// Remote table sink keyed on `datetime`. The driver is written against this
/// so batches can run against a double in tests.
pub trait RemoteStore {
    fn upsert(&self, table: &str, records: &[WeatherRecord]) -> Result<usize>;
}

pub struct SupabaseClient {
    client: reqwest::blocking::Client,
    rest_url: String,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            rest_url: config.supabase_rest_url(),
            api_key: config.supabase_key.clone(),
        }
    }
}

impl RemoteStore for SupabaseClient {
    /// Upsert rows into a city table, keyed on the `datetime` column: rows
    /// with a matching date are overwritten, the rest are inserted.
    ///
    /// Returns the number of rows the remote acknowledged. The caller decides
    /// whether a count mismatch matters; a failed request (including a table
    /// that does not exist yet) is a store error.
    fn upsert(&self, table: &str, records: &[WeatherRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        debug!(table, rows = records.len(), "Upserting rows");

        let url = format!("{}/{}", self.rest_url, table);
        let resp = self
            .client
            .post(&url)
            .header("apikey", self.api_key.as_str())
            .bearer_auth(&self.api_key)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .query(&[("on_conflict", "datetime")])
            .json(records)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(ForelastError::store(format!(
                "{table}: HTTP {status}: {text}"
            )));
        }

        // With return=representation the body is the array of affected rows.
        let acknowledged: Vec<serde_json::Value> = resp.json()?;
        Ok(acknowledged.len())
    }
}
