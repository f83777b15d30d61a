//! Wiring of the components for one running host.

use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;

use crate::{
    Config,
    aggregator::{RecentWeather, RecentWeatherAggregator},
    coordinator::WeatherCoordinator,
    error::WeatherError,
    location::{LocationSource, first_fix},
    model::{Place, WeatherSnapshot},
    provider::WeatherApi,
    recent::RecentSearchStore,
    search::{DEFAULT_DEBOUNCE, SearchHandle, SearchQueryPipeline},
    store::Store,
    view_state::ViewStateBus,
};

#[derive(Debug, Clone, Copy)]
pub struct SessionTimings {
    pub debounce: Duration,
    pub location_timeout: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            location_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&Config> for SessionTimings {
    fn from(config: &Config) -> Self {
        Self {
            debounce: config.debounce(),
            location_timeout: config.location_timeout(),
        }
    }
}

/// Every collaborator is passed in; nothing is created implicitly.
#[derive(Debug, Clone)]
pub struct WeatherSession {
    api: Arc<dyn WeatherApi>,
    bus: ViewStateBus,
    location: Arc<dyn LocationSource>,
    coordinator: WeatherCoordinator,
    recent: RecentSearchStore,
    aggregator: RecentWeatherAggregator,
    timings: SessionTimings,
}

impl WeatherSession {
    /// Build the session and rehydrate the recent-searches cache.
    pub async fn open(
        api: Arc<dyn WeatherApi>,
        store: Arc<dyn Store>,
        location: Arc<dyn LocationSource>,
        bus: ViewStateBus,
        timings: SessionTimings,
    ) -> Self {
        let recent = RecentSearchStore::load(store).await;

        Self {
            coordinator: WeatherCoordinator::new(Arc::clone(&api), bus.clone()),
            aggregator: RecentWeatherAggregator::new(Arc::clone(&api)),
            api,
            bus,
            location,
            recent,
            timings,
        }
    }

    pub fn bus(&self) -> &ViewStateBus {
        &self.bus
    }

    pub fn coordinator(&self) -> &WeatherCoordinator {
        &self.coordinator
    }

    pub fn recent(&self) -> &RecentSearchStore {
        &self.recent
    }

    /// Start a search pipeline feeding geocode results for this session.
    pub fn search(&self) -> SearchHandle {
        SearchQueryPipeline::spawn(
            Arc::clone(&self.api),
            self.bus.clone(),
            self.timings.debounce,
        )
    }

    /// The place to show first: a live location fix, else the most recent
    /// search, else nothing.
    pub async fn initial_place(&self) -> Option<Place> {
        match first_fix(self.location.as_ref(), self.timings.location_timeout).await {
            Ok(Some(coord)) => return Some(Place::from_coordinate(coord)),
            Ok(None) => tracing::info!("no location fix, falling back to recent searches"),
            Err(WeatherError::PermissionDenied) => {
                tracing::info!("location denied, falling back to recent searches")
            }
            Err(err) => tracing::warn!(error = %err, "location unavailable"),
        }

        self.recent.most_recent().await.map(|entry| entry.place)
    }

    /// Resolve the initial place, or publish the placeholder snapshot.
    pub async fn start(&self) -> WeatherSnapshot {
        match self.initial_place().await {
            Some(place) => self.coordinator.resolve(place).await,
            None => {
                self.coordinator.show_placeholder();
                WeatherSnapshot::placeholder()
            }
        }
    }

    /// A place picked by the user: remember it, then resolve its weather.
    /// A failing store only costs the history entry.
    pub async fn select(&self, place: Place) -> WeatherSnapshot {
        if let Err(err) = self.recent.upsert(place.clone()).await {
            tracing::warn!(error = %err, "recent search not recorded");
        }
        self.coordinator.resolve(place).await
    }

    /// Live conditions for every cached search, in completion order.
    pub async fn recent_weather(&self) -> mpsc::Receiver<RecentWeather> {
        let entries = self.recent.list().await;
        self.aggregator.fetch(entries)
    }

    /// User acknowledged the error dialog.
    pub fn dismiss_error(&self) {
        self.bus.dismiss();
    }
}
