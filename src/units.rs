use crate::record::WeatherRecord;

/// Convert imperial measurements to metric, keeping column names: Fahrenheit
/// to Celsius for the temperature columns, inches to millimeters for
/// precipitation, miles per hour to kilometers per hour for wind speed.
///
/// Empty cells stay empty; nothing is fabricated for missing measurements.
pub fn convert_to_metric(records: Vec<WeatherRecord>) -> Vec<WeatherRecord> {
    records.into_iter().map(convert_record).collect()
}

fn convert_record(mut record: WeatherRecord) -> WeatherRecord {
    record.tempmax = record.tempmax.map(fahrenheit_to_celsius);
    record.tempmin = record.tempmin.map(fahrenheit_to_celsius);
    record.temp = record.temp.map(fahrenheit_to_celsius);
    record.precip = record.precip.map(|v| v * 25.4);
    record.windspeed = record.windspeed.map(|v| v * 1.60934);
    record
}

fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}
