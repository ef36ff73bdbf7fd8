use std::sync::Arc;

use anyhow::Result;
use kaze::config::{KazeConfig, StoreBackend, StoreConfig};
use kaze::{Enricher, InMemoryPowerPlantStore, OpenMeteoGateway, PowerPlantService, PowerPlantStore};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = KazeConfig::load()?;
    kaze::logging::init_tracing(&config.logging)?;

    info!("Starting kaze {}", kaze::VERSION);

    let store = build_store(&config.store).await?;
    let gateway = Arc::new(OpenMeteoGateway::new(&config.open_meteo)?);
    let enricher = Enricher::new(gateway, config.enrichment.max_concurrency);
    let service = PowerPlantService::new(store, enricher);

    kaze::web::run(service, &config.server).await
}

async fn build_store(config: &StoreConfig) -> Result<Arc<dyn PowerPlantStore>> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory power plant store");
            Ok(Arc::new(InMemoryPowerPlantStore::new()))
        }
        StoreBackend::Postgres => postgres_store(config).await,
    }
}

#[cfg(feature = "postgres")]
async fn postgres_store(config: &StoreConfig) -> Result<Arc<dyn PowerPlantStore>> {
    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("No database URL configured"))?;
    let store = kaze::store::PostgresPowerPlantStore::connect(url).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "postgres"))]
async fn postgres_store(_config: &StoreConfig) -> Result<Arc<dyn PowerPlantStore>> {
    anyhow::bail!("The postgres store backend requires building with `--features postgres`")
}
