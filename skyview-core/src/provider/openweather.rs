use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::{
    error::{Result, WeatherError},
    model::Coordinate,
    provider::{CurrentWeatherPayload, ForecastPayload, GeoPlace},
};

use super::WeatherApi;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

const GEOCODE_LIMIT: &str = "5";
const FORECAST_COUNT: &str = "8";
const UNITS: &str = "imperial";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, what, "OpenWeather request");

        let res = self
            .http
            .get(&url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                WeatherError::Network(format!("Failed to send OpenWeather {what} request: {e}"))
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            WeatherError::Network(format!("Failed to read OpenWeather {what} response body: {e}"))
        })?;

        if !status.is_success() {
            return Err(WeatherError::Network(format!(
                "OpenWeather {what} request failed with status {status}: {}",
                truncate_body(&body),
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            WeatherError::Decode(format!("Failed to parse OpenWeather {what} JSON: {e}"))
        })
    }
}

fn coord_query(coord: Coordinate) -> Vec<(&'static str, String)> {
    vec![("lat", coord.lat.to_string()), ("lon", coord.lon.to_string())]
}

#[async_trait]
impl WeatherApi for OpenWeatherProvider {
    async fn current_weather(&self, coord: Coordinate) -> Result<CurrentWeatherPayload> {
        let mut query = coord_query(coord);
        query.push(("units", UNITS.to_string()));

        self.get_json("/data/2.5/weather", &query, "current weather").await
    }

    async fn forecast(&self, coord: Coordinate) -> Result<ForecastPayload> {
        let mut query = coord_query(coord);
        query.push(("units", UNITS.to_string()));
        query.push(("cnt", FORECAST_COUNT.to_string()));

        self.get_json("/data/2.5/forecast", &query, "forecast").await
    }

    async fn geocode(&self, query: &str) -> Result<Vec<GeoPlace>> {
        let query = vec![
            ("q", format!("{query},US")),
            ("limit", GEOCODE_LIMIT.to_string()),
        ];

        self.get_json("/geo/1.0/direct", &query, "geocoding").await
    }

    async fn reverse_geocode(&self, coord: Coordinate) -> Result<Vec<GeoPlace>> {
        self.get_json("/geo/1.0/reverse", &coord_query(coord), "reverse geocoding")
            .await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
