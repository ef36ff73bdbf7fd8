//! Power plant service: the operations exposed to the transport layer

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::Result;
use crate::enrichment::{Enricher, EnrichmentPlan};
use crate::models::{NewPowerPlant, PageResult, PowerPlant, PowerPlantPatch};
use crate::pagination::{PageRequest, assemble_page};
use crate::store::PowerPlantStore;

#[derive(Clone)]
pub struct PowerPlantService {
    store: Arc<dyn PowerPlantStore>,
    enricher: Enricher,
}

impl PowerPlantService {
    pub fn new(store: Arc<dyn PowerPlantStore>, enricher: Enricher) -> Self {
        Self { store, enricher }
    }

    /// Validate and store a new plant. The result carries no derived data.
    #[instrument(skip(self, plant), fields(name = %plant.name))]
    pub async fn create(&self, plant: NewPowerPlant) -> Result<PowerPlant> {
        plant.validate()?;
        debug!(
            latitude = plant.latitude,
            longitude = plant.longitude,
            "Creating power plant"
        );
        self.store.create(plant).await
    }

    /// Apply a sparse update and return the stored state afterwards.
    ///
    /// An empty patch writes nothing.
    #[instrument(skip(self, patch), fields(id = %patch.id))]
    pub async fn update(&self, patch: PowerPlantPatch) -> Result<PowerPlant> {
        patch.validate()?;
        if patch.is_empty() {
            debug!("Empty update, nothing to write");
        } else {
            debug!(
                name = ?patch.name,
                latitude = ?patch.latitude,
                longitude = ?patch.longitude,
                "Updating power plant"
            );
            self.store.update(&patch).await?;
        }
        self.store.get_by_id(&patch.id).await
    }

    /// Fetch one plant with the requested derived data
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str, plan: EnrichmentPlan) -> Result<PowerPlant> {
        debug!(
            with_elevation = plan.elevation,
            with_weather_forecasts = plan.forecast,
            "Getting power plant"
        );
        let plant = self.store.get_by_id(id).await?;
        self.enricher.enrich(plant, plan).await
    }

    /// Fetch one page of plants with the requested derived data
    #[instrument(skip(self))]
    pub async fn list(&self, request: PageRequest, plan: EnrichmentPlan) -> Result<PageResult> {
        debug!(
            page = request.page,
            page_size = request.page_size,
            with_elevation = plan.elevation,
            with_weather_forecasts = plan.forecast,
            "Listing power plants"
        );
        assemble_page(self.store.as_ref(), &self.enricher, request, plan).await
    }
}
