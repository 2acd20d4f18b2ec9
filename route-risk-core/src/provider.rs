use crate::{
    Config,
    model::{Place, WeatherObservation},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// Resolves free-text place names to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// `Ok(None)` when the provider has no match.
    async fn geocode(&self, query: &str) -> anyhow::Result<Option<Place>>;
}

/// Fetches current conditions at a coordinate, normalized to imperial units.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn current_weather(&self, lat: f64, lon: f64) -> anyhow::Result<WeatherObservation>;
}

/// Build the OpenWeather provider from config; it serves both roles.
pub fn openweather_from_config(config: &Config) -> anyhow::Result<Arc<OpenWeatherProvider>> {
    let provider = OpenWeatherProvider::from_config(&config.provider)?;
    Ok(Arc::new(provider))
}
