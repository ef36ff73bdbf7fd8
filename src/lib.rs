//! `kaze` - Power plant registry with on-demand enrichment
//!
//! Power plants are served over GraphQL. Elevation and hourly weather
//! forecasts are fetched from Open-Meteo only when a query selects them.

pub mod api;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod gateway;
pub mod graphql;
pub mod logging;
pub mod models;
pub mod pagination;
pub mod service;
pub mod store;
pub mod web;

// Re-export core types for public API
pub use config::KazeConfig;
pub use enrichment::{Enricher, EnrichmentPlan};
pub use error::KazeError;
pub use gateway::{EnrichmentGateway, GatewayError, Lookup, OpenMeteoGateway};
pub use graphql::{Executor, GraphQlRequest, GraphQlResponse, RequestedFields};
pub use models::{
    HourlyForecast, NewPowerPlant, PageResult, PowerPlant, PowerPlantPatch, WeatherForecast,
    WeatherReport,
};
pub use pagination::PageRequest;
pub use service::PowerPlantService;
pub use store::{InMemoryPowerPlantStore, PowerPlantStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, KazeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
