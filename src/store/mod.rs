//! Power plant store: CRUD and paginated listing by ID

use async_trait::async_trait;

use crate::Result;
use crate::models::{NewPowerPlant, PageResult, PowerPlant, PowerPlantPatch};

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryPowerPlantStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresPowerPlantStore;

/// Capability boundary for power plant persistence.
///
/// Plants returned by a store never carry elevation or forecast data.
#[async_trait]
pub trait PowerPlantStore: Send + Sync {
    /// Persist a new plant; the store assigns its ID
    async fn create(&self, plant: NewPowerPlant) -> Result<PowerPlant>;

    /// Fetch a plant, `KazeError::NotFound` when absent
    async fn get_by_id(&self, id: &str) -> Result<PowerPlant>;

    /// Overwrite only the supplied fields; an empty patch writes nothing
    async fn update(&self, patch: &PowerPlantPatch) -> Result<()>;

    /// Plants in `[offset, offset + limit)` ascending by ID, plus the total count
    async fn list(&self, offset: i64, limit: i64) -> Result<PageResult>;
}
