//! Power plant entity, its create/update inputs and the paginated list envelope

use serde::{Deserialize, Serialize};

use super::WeatherReport;
use crate::{KazeError, Result};

/// A registered power plant.
///
/// `elevation` and `weather` are derived data: they stay `None` until a read
/// explicitly asks for them, and each is only ever set from one complete lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerPlant {
    /// Store-assigned identity
    pub id: String,
    pub name: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Meters above sea level
    pub elevation: Option<f64>,
    #[serde(flatten)]
    pub weather: Option<WeatherReport>,
}

impl PowerPlant {
    /// Create a plant as read from the store, without derived data
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            latitude,
            longitude,
            elevation: None,
            weather: None,
        }
    }
}

/// Input for creating a power plant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPowerPlant {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl NewPowerPlant {
    #[must_use]
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }

    /// Check required fields and coordinate ranges
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        validate_latitude(self.latitude)?;
        validate_longitude(self.longitude)?;
        Ok(())
    }
}

/// Sparse update of a power plant.
///
/// `None` means "not supplied": the stored value is left untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PowerPlantPatch {
    pub id: String,
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl PowerPlantPatch {
    /// Create an empty patch for the given plant
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_latitude(mut self, latitude: f64) -> Self {
        self.latitude = Some(latitude);
        self
    }

    #[must_use]
    pub fn with_longitude(mut self, longitude: f64) -> Self {
        self.longitude = Some(longitude);
        self
    }

    /// True when no field is supplied
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.latitude.is_none() && self.longitude.is_none()
    }

    /// Apply the supplied fields to a stored plant
    pub fn apply_to(&self, plant: &mut PowerPlant) {
        if let Some(name) = &self.name {
            plant.name.clone_from(name);
        }
        if let Some(latitude) = self.latitude {
            plant.latitude = latitude;
        }
        if let Some(longitude) = self.longitude {
            plant.longitude = longitude;
        }
    }

    /// Check the supplied fields only
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(KazeError::validation("id is required"));
        }
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(latitude) = self.latitude {
            validate_latitude(latitude)?;
        }
        if let Some(longitude) = self.longitude {
            validate_longitude(longitude)?;
        }
        Ok(())
    }
}

/// One page of power plants plus the size of the whole unfiltered listing
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    /// Page contents, ascending by ID
    pub power_plants: Vec<PowerPlant>,
    /// Total number of stored plants, independent of the page size
    pub total_count: i64,
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(KazeError::validation("name is required"));
    }
    Ok(())
}

fn validate_latitude(latitude: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(KazeError::validation(format!(
            "Latitude must be between -90 and 90, got: {latitude}"
        )));
    }
    Ok(())
}

fn validate_longitude(longitude: f64) -> Result<()> {
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(KazeError::validation(format!(
            "Longitude must be between -180 and 180, got: {longitude}"
        )));
    }
    Ok(())
}
