use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::config::City;
use crate::error::{ForelastError, Result};
use crate::record::WeatherRecord;

const TIMELINE_BASE_URL: &str =
    "https://weather.visualcrossing.com/VisualCrossingWebServices/rest/services/timeline";

/// Source of day-records for a city over an inclusive date range. The driver
/// is written against this so batches can run against a double in tests.
pub trait WeatherSource {
    fn fetch_daily(
        &self,
        city: &City,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<WeatherRecord>>;
}

pub struct WeatherClient {
    client: reqwest::blocking::Client,
    api_key: String,
}

// --- Visual Crossing timeline response types ---

#[derive(Debug, Deserialize)]
pub struct TimelineResponse {
    #[serde(rename = "resolvedAddress")]
    #[allow(dead_code)]
    pub resolved_address: Option<String>,
    pub days: Option<Vec<TimelineDay>>,
}

#[derive(Debug, Deserialize)]
pub struct TimelineDay {
    pub datetime: Option<String>,
    pub tempmax: Option<f64>,
    pub tempmin: Option<f64>,
    pub temp: Option<f64>,
    pub humidity: Option<f64>,
    pub precip: Option<f64>,
    pub windspeed: Option<f64>,
}

impl WeatherClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            api_key,
        }
    }
}

impl WeatherSource for WeatherClient {
    /// Fetch one day-record per calendar day in `from..=to` for a city.
    ///
    /// Holds no per-city state; calls are independent and safe in any order.
    /// A non-success status or a response without days is a fetch error the
    /// driver logs and skips.
    fn fetch_daily(
        &self,
        city: &City,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<WeatherRecord>> {
        // The url parser percent-encodes the space in "<name> City".
        let url = format!(
            "{TIMELINE_BASE_URL}/{location}/{from}/{to}",
            location = city.query_name()
        );

        info!(city = city.name, from = %from, to = %to, "Fetching daily weather");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("unitGroup", "metric"),
                ("include", "days"),
                ("key", self.api_key.as_str()),
                ("contentType", "json"),
            ])
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().unwrap_or_default();
            let detail = if detail.trim().is_empty() {
                "Unexpected error from weather API".to_string()
            } else {
                detail.trim().to_string()
            };
            return Err(ForelastError::fetch(city.name, status.as_str(), detail));
        }

        let body: TimelineResponse = resp.json()?;

        let days = body.days.unwrap_or_default();
        if days.is_empty() {
            return Err(ForelastError::fetch(
                city.name,
                status.as_str(),
                "No days in response",
            ));
        }

        let display_name = city.display_name();
        let rows: Vec<WeatherRecord> = days
            .iter()
            .map(|day| day_to_record(&display_name, day))
            .collect();

        info!(city = city.name, rows = rows.len(), "Received day records");
        Ok(rows)
    }
}

fn day_to_record(display_name: &str, day: &TimelineDay) -> WeatherRecord {
    WeatherRecord {
        name: display_name.to_string(),
        datetime: day.datetime.clone().unwrap_or_default(),
        tempmax: day.tempmax,
        tempmin: day.tempmin,
        temp: day.temp,
        humidity: day.humidity,
        precip: day.precip,
        windspeed: day.windspeed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_vendor_day_to_record() {
        let day = TimelineDay {
            datetime: Some("2025-04-10".to_string()),
            tempmax: Some(33.1),
            tempmin: Some(25.2),
            temp: Some(29.0),
            humidity: Some(70.5),
            precip: Some(1.2),
            windspeed: Some(14.8),
        };

        let record = day_to_record("Pasig City, National Capital Region, Philippines", &day);

        assert_eq!(record.name, "Pasig City, National Capital Region, Philippines");
        assert_eq!(record.datetime, "2025-04-10");
        assert_eq!(record.temp, Some(29.0));
        assert_eq!(record.windspeed, Some(14.8));
    }

    #[test]
    fn absent_vendor_fields_stay_none() {
        let day = TimelineDay {
            datetime: Some("2025-04-10".to_string()),
            tempmax: None,
            tempmin: None,
            temp: Some(29.0),
            humidity: None,
            precip: None,
            windspeed: None,
        };

        let record = day_to_record("Taguig City, National Capital Region, Philippines", &day);

        assert_eq!(record.tempmax, None);
        assert_eq!(record.precip, None);
        assert_eq!(record.temp, Some(29.0));
    }

    #[test]
    fn timeline_response_tolerates_unknown_fields() {
        let json = r#"{
            "queryCost": 1,
            "resolvedAddress": "Pasig, National Capital Region, Pilipinas",
            "timezone": "Asia/Manila",
            "days": [
                {
                    "datetime": "2025-04-10",
                    "tempmax": 33.1,
                    "temp": 29.0,
                    "uvindex": 9,
                    "conditions": "Partially cloudy"
                }
            ]
        }"#;

        let body: TimelineResponse = serde_json::from_str(json).unwrap();
        let days = body.days.unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].tempmax, Some(33.1));
        assert_eq!(days[0].humidity, None);
    }

    #[test]
    fn missing_days_deserializes_to_none() {
        let body: TimelineResponse =
            serde_json::from_str(r#"{"resolvedAddress": "Pasig"}"#).unwrap();
        assert!(body.days.is_none());
    }
}
