//! Open-Meteo client for elevation and hourly forecast lookups
//!
//! Transient failures (network errors, 5xx, 429) are retried with exponential
//! backoff inside the client; everything else surfaces as a [`GatewayError`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::{EnrichmentGateway, GatewayError};
use crate::config::OpenMeteoConfig;
use crate::models::HourlyForecast;
use crate::{KazeError, Result};

const HOURLY_VARIABLES: &str = "temperature_2m,precipitation,wind_speed_10m,wind_direction_10m";

#[derive(Debug, Deserialize)]
struct ElevationResponse {
    #[serde(default)]
    elevation: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    hourly: HourlyForecast,
}

/// Open-Meteo API client
pub struct OpenMeteoGateway {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: Option<String>,
}

impl OpenMeteoGateway {
    /// Create a new client
    pub fn new(config: &OpenMeteoConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("kaze/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| KazeError::config(format!("Failed to create HTTP client: {e}")))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(
        &self,
        path: &str,
        latitude: f64,
        longitude: f64,
        extra: &[(&str, &str)],
    ) -> std::result::Result<Url, GatewayError> {
        let mut params: Vec<(&str, String)> = vec![
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
        ];
        params.extend(extra.iter().map(|(k, v)| (*k, (*v).to_string())));
        if let Some(api_key) = &self.api_key {
            params.push(("apikey", api_key.clone()));
        }

        Url::parse_with_params(&format!("{}/{}", self.base_url, path), &params)
            .map_err(|e| GatewayError::request(format!("invalid URL: {e}")))
    }

    async fn fetch<T: DeserializeOwned>(&self, url: Url) -> std::result::Result<T, GatewayError> {
        let start_time = Instant::now();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatewayError::request(format!("error making request to Open-Meteo API: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Open-Meteo API returned {}", status);
            return Err(GatewayError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::request(format!("error reading response body: {e}")))?;

        debug!(
            "Open-Meteo response of {} bytes in {:.3}s",
            body.len(),
            start_time.elapsed().as_secs_f64()
        );

        serde_json::from_slice(&body).map_err(GatewayError::decode)
    }
}

#[async_trait]
impl EnrichmentGateway for OpenMeteoGateway {
    #[instrument(skip(self))]
    async fn elevation(&self, latitude: f64, longitude: f64) -> std::result::Result<f64, GatewayError> {
        let url = self.endpoint("elevation", latitude, longitude, &[])?;
        debug!("Fetching elevation data");

        let response: ElevationResponse = self.fetch(url).await?;
        response
            .elevation
            .first()
            .copied()
            .ok_or(GatewayError::EmptyElevation)
    }

    #[instrument(skip(self))]
    async fn forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> std::result::Result<HourlyForecast, GatewayError> {
        let url = self.endpoint(
            "forecast",
            latitude,
            longitude,
            &[("hourly", HOURLY_VARIABLES)],
        )?;
        debug!("Fetching weather forecast data");

        let response: ForecastResponse = self.fetch(url).await?;
        Ok(response.hourly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(api_key: Option<&str>) -> OpenMeteoGateway {
        let config = OpenMeteoConfig {
            base_url: "https://api.open-meteo.com/v1/".to_string(),
            api_key: api_key.map(str::to_string),
            ..OpenMeteoConfig::default()
        };
        OpenMeteoGateway::new(&config).unwrap()
    }

    #[test]
    fn test_client_creation_trims_base_url() {
        assert_eq!(gateway(None).base_url, "https://api.open-meteo.com/v1");
    }

    #[test]
    fn test_elevation_endpoint() {
        let url = gateway(None).endpoint("elevation", 52.52, 13.41, &[]).unwrap();
        assert_eq!(url.path(), "/v1/elevation");
        assert_eq!(url.query(), Some("latitude=52.52&longitude=13.41"));
    }

    #[test]
    fn test_forecast_endpoint_with_api_key() {
        let url = gateway(Some("secret"))
            .endpoint("forecast", -1.5, 0.0, &[("hourly", HOURLY_VARIABLES)])
            .unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("latitude".into(), "-1.5".into())));
        assert!(pairs.contains(&("longitude".into(), "0".into())));
        assert!(pairs.contains(&("hourly".into(), HOURLY_VARIABLES.into())));
        assert!(pairs.contains(&("apikey".into(), "secret".into())));
    }

    #[test]
    fn test_forecast_response_without_hourly_block() {
        let response: ForecastResponse = serde_json::from_str(r#"{"latitude": 1.0}"#).unwrap();
        assert!(response.hourly.time.is_empty());
    }
}
