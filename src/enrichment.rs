//! Enrichment orchestration: decide which lookups a request needs, run them
//! per plant and merge the results

use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, instrument};

use crate::gateway::{EnrichmentGateway, Lookup};
use crate::graphql::RequestedFields;
use crate::graphql::schema::POWER_PLANTS_FIELD;
use crate::models::{PowerPlant, WeatherReport};
use crate::{KazeError, Result};

const ELEVATION_FIELD: &str = "elevation";
const FORECAST_FIELD: &str = "weatherForecasts";

/// Which lookups to perform for each plant of a request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentPlan {
    pub elevation: bool,
    pub forecast: bool,
}

impl EnrichmentPlan {
    /// No lookups at all
    pub const NONE: Self = Self {
        elevation: false,
        forecast: false,
    };

    #[must_use]
    pub fn new(elevation: bool, forecast: bool) -> Self {
        Self {
            elevation,
            forecast,
        }
    }

    /// Derive the plan from the requested paths below `prefix`.
    ///
    /// Only `elevation` and `weatherForecasts` trigger lookups;
    /// `hasPrecipitationToday` alone does not.
    #[must_use]
    pub fn from_requested(requested: &RequestedFields, prefix: &str) -> Self {
        let path = |field: &str| {
            if prefix.is_empty() {
                field.to_string()
            } else {
                format!("{prefix}.{field}")
            }
        };
        Self {
            elevation: requested.contains(&path(ELEVATION_FIELD)),
            forecast: requested.contains(&path(FORECAST_FIELD)),
        }
    }

    /// Plan for a single-plant query
    #[must_use]
    pub fn for_single(requested: &RequestedFields) -> Self {
        Self::from_requested(requested, "")
    }

    /// Plan for a list query, whose plant fields sit below `powerPlants`
    #[must_use]
    pub fn for_list(requested: &RequestedFields) -> Self {
        Self::from_requested(requested, POWER_PLANTS_FIELD)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.elevation && !self.forecast
    }
}

/// Runs enrichment lookups through the gateway
#[derive(Clone)]
pub struct Enricher {
    gateway: Arc<dyn EnrichmentGateway>,
    max_concurrency: usize,
}

impl Enricher {
    /// `max_concurrency` bounds how many plants of one list are enriched at once
    pub fn new(gateway: Arc<dyn EnrichmentGateway>, max_concurrency: usize) -> Self {
        Self {
            gateway,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Enrich one plant.
    ///
    /// Both lookups run concurrently. The plant is consumed, so a failure of
    /// either lookup leaves nothing partially enriched behind.
    #[instrument(skip(self, plant), fields(id = %plant.id))]
    pub async fn enrich(&self, mut plant: PowerPlant, plan: EnrichmentPlan) -> Result<PowerPlant> {
        if plan.is_empty() {
            return Ok(plant);
        }

        let (latitude, longitude) = (plant.latitude, plant.longitude);

        let elevation = async {
            if !plan.elevation {
                return Ok(None);
            }
            self.gateway
                .elevation(latitude, longitude)
                .await
                .map(Some)
                .map_err(|e| KazeError::enrichment(Lookup::Elevation, e))
        };

        let weather = async {
            if !plan.forecast {
                return Ok(None);
            }
            self.gateway
                .forecast(latitude, longitude)
                .await
                .map(|hourly| Some(WeatherReport::from_hourly(&hourly)))
                .map_err(|e| KazeError::enrichment(Lookup::Forecast, e))
        };

        let (elevation, weather) = futures::try_join!(elevation, weather)?;
        debug!(
            "Enriched power plant (elevation: {}, forecast: {})",
            elevation.is_some(),
            weather.is_some()
        );

        if elevation.is_some() {
            plant.elevation = elevation;
        }
        if weather.is_some() {
            plant.weather = weather;
        }
        Ok(plant)
    }

    /// Enrich a page of plants, keeping their order.
    ///
    /// The first failure fails the whole batch and drops the lookups still in flight.
    pub async fn enrich_all(
        &self,
        plants: Vec<PowerPlant>,
        plan: EnrichmentPlan,
    ) -> Result<Vec<PowerPlant>> {
        if plan.is_empty() {
            return Ok(plants);
        }

        stream::iter(plants)
            .map(|plant| self.enrich(plant, plan))
            .buffered(self.max_concurrency)
            .try_collect()
            .await
    }
}
