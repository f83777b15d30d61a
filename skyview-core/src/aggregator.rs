use std::sync::Arc;
use tokio::sync::mpsc;

use crate::{
    convert,
    model::{CurrentWeather, RecentSearchEntry},
    provider::WeatherApi,
};

/// A recent search with its live conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentWeather {
    pub entry: RecentSearchEntry,
    pub weather: CurrentWeather,
}

impl RecentWeather {
    pub fn city_state(&self) -> String {
        self.entry.place.city_state()
    }

    pub fn temp_display(&self) -> String {
        self.weather.temp_display()
    }

    pub fn icon_url(&self) -> Option<String> {
        self.weather.icon_url()
    }
}

/// Background enrichment of the recent-searches list. Never touches the
/// view-state bus; a failed lookup just leaves that entry out.
#[derive(Debug, Clone)]
pub struct RecentWeatherAggregator {
    api: Arc<dyn WeatherApi>,
}

impl RecentWeatherAggregator {
    pub fn new(api: Arc<dyn WeatherApi>) -> Self {
        Self { api }
    }

    /// Fetch current weather for every entry concurrently.
    ///
    /// Pairs arrive in completion order, not input order. The channel closes
    /// once every lookup has finished.
    pub fn fetch(&self, entries: Vec<RecentSearchEntry>) -> mpsc::Receiver<RecentWeather> {
        let (tx, rx) = mpsc::channel(entries.len().max(1));

        for entry in entries {
            let api = Arc::clone(&self.api);
            let tx = tx.clone();

            tokio::spawn(async move {
                match api.current_weather(entry.place.coordinate()).await {
                    Ok(payload) => {
                        let weather = convert::current_weather(&payload);
                        let _ = tx.send(RecentWeather { entry, weather }).await;
                    }
                    Err(err) => {
                        tracing::warn!(
                            place = %entry.place.city_state(),
                            error = %err,
                            "recent search weather unavailable"
                        );
                    }
                }
            });
        }

        rx
    }
}
