//! In-process store, ordered by numeric ID

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::PowerPlantStore;
use crate::models::{NewPowerPlant, PageResult, PowerPlant, PowerPlantPatch};
use crate::{KazeError, Result};

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    plants: BTreeMap<u64, PowerPlant>,
}

/// Store keeping all plants in memory; IDs are assigned sequentially from 1
#[derive(Debug, Default)]
pub struct InMemoryPowerPlantStore {
    inner: RwLock<Inner>,
}

impl InMemoryPowerPlantStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn parse_id(id: &str) -> Result<u64> {
    id.trim().parse().map_err(|_| KazeError::not_found(id))
}

fn to_usize(value: i64, what: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| KazeError::validation(format!("{what} must not be negative")))
}

#[async_trait]
impl PowerPlantStore for InMemoryPowerPlantStore {
    async fn create(&self, plant: NewPowerPlant) -> Result<PowerPlant> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = inner.next_id;

        let stored = PowerPlant::new(id.to_string(), plant.name, plant.latitude, plant.longitude);
        inner.plants.insert(id, stored.clone());
        debug!("Inserted power plant {}", id);

        Ok(stored)
    }

    async fn get_by_id(&self, id: &str) -> Result<PowerPlant> {
        let key = parse_id(id)?;
        self.inner
            .read()
            .await
            .plants
            .get(&key)
            .cloned()
            .ok_or_else(|| KazeError::not_found(id))
    }

    async fn update(&self, patch: &PowerPlantPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let key = parse_id(&patch.id)?;
        let mut inner = self.inner.write().await;
        let plant = inner
            .plants
            .get_mut(&key)
            .ok_or_else(|| KazeError::not_found(&patch.id))?;
        patch.apply_to(plant);

        Ok(())
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<PageResult> {
        let offset = to_usize(offset, "offset")?;
        let limit = to_usize(limit, "limit")?;

        let inner = self.inner.read().await;
        let power_plants = inner
            .plants
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        let total_count = i64::try_from(inner.plants.len())
            .map_err(|e| KazeError::store("list", e))?;

        Ok(PageResult {
            power_plants,
            total_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded(count: usize) -> InMemoryPowerPlantStore {
        let store = InMemoryPowerPlantStore::new();
        for i in 0..count {
            store
                .create(NewPowerPlant::new(format!("Plant {i}"), 1.0, 2.0))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let store = InMemoryPowerPlantStore::new();
        let first = store
            .create(NewPowerPlant::new("Solar Plant", 1.234, 5.678))
            .await
            .unwrap();
        let second = store
            .create(NewPowerPlant::new("Wind Farm", 52.6, 13.4))
            .await
            .unwrap();

        assert_eq!(first.id, "1");
        assert_eq!(second.id, "2");
        assert_eq!(first.name, "Solar Plant");
        assert_eq!(first.latitude, 1.234);
        assert_eq!(first.longitude, 5.678);
        assert!(first.elevation.is_none() && first.weather.is_none());
    }

    #[tokio::test]
    async fn test_get_unknown_or_malformed_id_is_not_found() {
        let store = seeded(1).await;
        assert!(matches!(
            store.get_by_id("99").await,
            Err(KazeError::NotFound { .. })
        ));
        assert!(matches!(
            store.get_by_id("abc").await,
            Err(KazeError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_overwrites_supplied_fields_only() {
        let store = seeded(1).await;
        store
            .update(&PowerPlantPatch::new("1").with_name("Renamed"))
            .await
            .unwrap();

        let plant = store.get_by_id("1").await.unwrap();
        assert_eq!(plant.name, "Renamed");
        assert_eq!(plant.latitude, 1.0);
        assert_eq!(plant.longitude, 2.0);
    }

    #[tokio::test]
    async fn test_update_missing_plant_is_not_found() {
        let store = seeded(1).await;
        let result = store
            .update(&PowerPlantPatch::new("5").with_latitude(0.0))
            .await;
        assert!(matches!(result, Err(KazeError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_pages_in_id_order_with_total() {
        let store = seeded(25).await;

        let page = store.list(20, 10).await.unwrap();
        assert_eq!(page.total_count, 25);
        let ids: Vec<&str> = page.power_plants.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["21", "22", "23", "24", "25"]);

        let empty = store.list(0, 0).await.unwrap();
        assert!(empty.power_plants.is_empty());
        assert_eq!(empty.total_count, 25);
    }

    #[tokio::test]
    async fn test_list_rejects_negative_window() {
        let store = seeded(1).await;
        assert!(store.list(-10, 10).await.is_err());
        assert!(store.list(0, -1).await.is_err());
    }
}
