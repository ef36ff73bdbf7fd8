//! Enrichment gateway: elevation and forecast lookups by coordinate

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::HourlyForecast;

pub mod open_meteo;

pub use open_meteo::OpenMeteoGateway;

/// The two independent lookups a power plant can be enriched with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lookup {
    Elevation,
    Forecast,
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Elevation => write!(f, "elevation"),
            Lookup::Forecast => write!(f, "weather forecast"),
        }
    }
}

/// Distinct failure causes of a gateway lookup
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// Network or protocol failure
    #[error("request failed: {message}")]
    Request { message: String },

    /// The gateway answered with a non-success status
    #[error("received non-OK response: {status}")]
    Status { status: u16 },

    /// The payload could not be decoded
    #[error("error decoding response body: {message}")]
    Decode { message: String },

    /// Success status but no elevation value in the payload
    #[error("no elevation data received")]
    EmptyElevation,
}

impl GatewayError {
    pub fn request<S: ToString>(message: S) -> Self {
        Self::Request {
            message: message.to_string(),
        }
    }

    pub fn decode<S: ToString>(message: S) -> Self {
        Self::Decode {
            message: message.to_string(),
        }
    }
}

/// Capability boundary for the external coordinate lookups.
///
/// Implementations own any retry policy; callers treat one failure as final.
#[async_trait]
pub trait EnrichmentGateway: Send + Sync {
    /// Elevation in meters above sea level
    async fn elevation(&self, latitude: f64, longitude: f64) -> Result<f64, GatewayError>;

    /// Hourly forecast as parallel arrays
    async fn forecast(&self, latitude: f64, longitude: f64)
    -> Result<HourlyForecast, GatewayError>;
}
