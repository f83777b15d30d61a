use crate::{
    Config,
    error::Result,
    model::{Coordinate, Place},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// Remote weather service. Every call is a suspension point; implementations
/// must not touch shared state.
#[async_trait]
pub trait WeatherApi: Send + Sync + Debug {
    async fn current_weather(&self, coord: Coordinate) -> Result<CurrentWeatherPayload>;

    async fn forecast(&self, coord: Coordinate) -> Result<ForecastPayload>;

    /// Forward geocoding restricted to US places.
    async fn geocode(&self, query: &str) -> Result<Vec<GeoPlace>>;

    async fn reverse_geocode(&self, coord: Coordinate) -> Result<Vec<GeoPlace>>;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeoPlace {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub state: Option<String>,
}

impl From<GeoPlace> for Place {
    fn from(geo: GeoPlace) -> Self {
        Place::new(geo.name, geo.state, geo.lat, geo.lon)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CurrentWeatherPayload {
    pub coord: CoordPayload,
    pub weather: Vec<ConditionPayload>,
    pub main: MainPayload,
    /// Meters.
    pub visibility: f64,
    pub clouds: CloudsPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CoordPayload {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConditionPayload {
    #[serde(default)]
    pub main: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MainPayload {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CloudsPayload {
    pub all: u8,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ForecastPayload {
    pub list: Vec<ForecastEntryPayload>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ForecastEntryPayload {
    /// Unix seconds.
    pub dt: i64,
    pub main: ForecastMainPayload,
    pub weather: Vec<ForecastIconPayload>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ForecastMainPayload {
    pub temp: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ForecastIconPayload {
    #[serde(default)]
    pub icon: String,
}

/// Construct the HTTP provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherApi>> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured.\n\
             Hint: run `skyview configure` and enter your OpenWeather API key."
        )
    })?;

    let provider = OpenWeatherProvider::new(
        api_key.to_owned(),
        config.base_url(),
        config.request_timeout(),
    )?;

    Ok(Arc::new(provider))
}
