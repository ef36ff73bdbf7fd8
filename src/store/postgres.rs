//! PostgreSQL store backed by the `power_plants` table
//!
//! Expected schema:
//! ```sql
//! CREATE TABLE power_plants (
//!     id        SERIAL PRIMARY KEY,
//!     name      TEXT NOT NULL,
//!     latitude  DOUBLE PRECISION NOT NULL,
//!     longitude DOUBLE PRECISION NOT NULL
//! );
//! ```

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use super::PowerPlantStore;
use crate::models::{NewPowerPlant, PageResult, PowerPlant, PowerPlantPatch};
use crate::{KazeError, Result};

#[derive(Debug, FromRow)]
struct PowerPlantRow {
    id: i32,
    name: String,
    latitude: f64,
    longitude: f64,
}

impl From<PowerPlantRow> for PowerPlant {
    fn from(row: PowerPlantRow) -> Self {
        PowerPlant::new(row.id.to_string(), row.name, row.latitude, row.longitude)
    }
}

/// Store using a PostgreSQL connection pool
#[derive(Clone, Debug)]
pub struct PostgresPowerPlantStore {
    pool: PgPool,
}

impl PostgresPowerPlantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and verify the connection
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| KazeError::store("connect", e))?;
        info!("Connected to PostgreSQL");
        Ok(Self::new(pool))
    }
}

fn parse_id(id: &str) -> Result<i32> {
    id.trim().parse().map_err(|_| KazeError::not_found(id))
}

#[async_trait]
impl PowerPlantStore for PostgresPowerPlantStore {
    async fn create(&self, plant: NewPowerPlant) -> Result<PowerPlant> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"INSERT INTO power_plants (name, latitude, longitude) VALUES ($1, $2, $3) RETURNING id"#,
        )
        .bind(&plant.name)
        .bind(plant.latitude)
        .bind(plant.longitude)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| KazeError::store("create", e))?;

        debug!("Inserted power plant {}", id);
        Ok(PowerPlant::new(
            id.to_string(),
            plant.name,
            plant.latitude,
            plant.longitude,
        ))
    }

    async fn get_by_id(&self, id: &str) -> Result<PowerPlant> {
        let key = parse_id(id)?;
        sqlx::query_as::<_, PowerPlantRow>(
            r#"SELECT id, name, latitude, longitude FROM power_plants WHERE id = $1"#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| KazeError::store("get", e))?
        .map(PowerPlant::from)
        .ok_or_else(|| KazeError::not_found(id))
    }

    async fn update(&self, patch: &PowerPlantPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let key = parse_id(&patch.id)?;
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE power_plants SET ");
        {
            let mut assignments = builder.separated(", ");
            if let Some(name) = &patch.name {
                assignments.push("name = ");
                assignments.push_bind_unseparated(name.clone());
            }
            if let Some(latitude) = patch.latitude {
                assignments.push("latitude = ");
                assignments.push_bind_unseparated(latitude);
            }
            if let Some(longitude) = patch.longitude {
                assignments.push("longitude = ");
                assignments.push_bind_unseparated(longitude);
            }
        }
        builder.push(" WHERE id = ");
        builder.push_bind(key);

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| KazeError::store("update", e))?;

        if result.rows_affected() == 0 {
            return Err(KazeError::not_found(&patch.id));
        }
        Ok(())
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<PageResult> {
        let total_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM power_plants")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| KazeError::store("count", e))?;

        let rows = sqlx::query_as::<_, PowerPlantRow>(
            r#"SELECT id, name, latitude, longitude FROM power_plants ORDER BY id LIMIT $1 OFFSET $2"#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| KazeError::store("list", e))?;

        Ok(PageResult {
            power_plants: rows.into_iter().map(PowerPlant::from).collect(),
            total_count,
        })
    }
}
