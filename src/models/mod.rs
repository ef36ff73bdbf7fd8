//! Data models for the kaze service
//!
//! - Power plant: the stored entity, its create/update inputs and list pages
//! - Forecast: hourly weather samples attached on demand

pub mod forecast;
pub mod power_plant;

pub use forecast::{HourlyForecast, WeatherForecast, WeatherReport};
pub use power_plant::{NewPowerPlant, PageResult, PowerPlant, PowerPlantPatch};
