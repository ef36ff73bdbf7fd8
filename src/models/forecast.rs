//! Weather forecast model and the mapping from the hourly gateway payload

use serde::{Deserialize, Serialize};

/// Hourly forecast payload as returned by the enrichment gateway.
///
/// The five arrays are parallel: index `i` across all of them describes one
/// hourly sample. Missing arrays decode as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecast {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default, rename = "temperature_2m")]
    pub temperature: Vec<f64>,
    #[serde(default)]
    pub precipitation: Vec<f64>,
    #[serde(default, rename = "wind_speed_10m")]
    pub wind_speed: Vec<f64>,
    #[serde(default, rename = "wind_direction_10m")]
    pub wind_direction: Vec<f64>,
}

/// A single hourly forecast sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherForecast {
    /// Timestamp in the source API's format, passed through verbatim
    pub time: String,
    /// Temperature at 2m in Celsius
    pub temperature: f64,
    /// Precipitation amount in mm
    pub precipitation: f64,
    /// Wind speed at 10m in km/h
    pub wind_speed: f64,
    /// Wind direction at 10m in degrees
    pub wind_direction: f64,
}

/// Forecast data attached to a power plant after a successful forecast lookup.
///
/// The samples and the derived precipitation flag always come from the same fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    /// Hourly samples in the source API's order
    pub weather_forecasts: Vec<WeatherForecast>,
    /// True iff any hourly precipitation value is strictly positive
    pub has_precipitation_today: bool,
}

impl WeatherReport {
    /// Zip the parallel hourly arrays into an ordered sample sequence.
    ///
    /// Arrays of unequal length are truncated to the shortest one.
    #[must_use]
    pub fn from_hourly(hourly: &HourlyForecast) -> Self {
        let weather_forecasts: Vec<WeatherForecast> = hourly
            .time
            .iter()
            .zip(&hourly.temperature)
            .zip(&hourly.precipitation)
            .zip(&hourly.wind_speed)
            .zip(&hourly.wind_direction)
            .map(
                |((((time, &temperature), &precipitation), &wind_speed), &wind_direction)| {
                    WeatherForecast {
                        time: time.clone(),
                        temperature,
                        precipitation,
                        wind_speed,
                        wind_direction,
                    }
                },
            )
            .collect();

        let has_precipitation_today = weather_forecasts.iter().any(|f| f.precipitation > 0.0);

        Self {
            weather_forecasts,
            has_precipitation_today,
        }
    }
}
