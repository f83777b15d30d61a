//! Fans out current weather, forecast and (for raw coordinates) reverse
//! geocoding for one place, and merges the results into a [`WeatherSnapshot`].
//!
//! The latest snapshot is published on a watch channel and updated as each leg
//! lands. Every `resolve` call gets a generation number; legs of an older
//! generation are dropped instead of overwriting a newer place.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::sync::watch;

use crate::{
    convert,
    error::WeatherError,
    model::{Coordinate, CurrentWeather, ForecastItem, Place, PlaceOrigin, WeatherSnapshot},
    provider::WeatherApi,
    view_state::ViewStateBus,
};

#[derive(Debug)]
struct Inner {
    api: Arc<dyn WeatherApi>,
    bus: ViewStateBus,
    snapshot: watch::Sender<WeatherSnapshot>,
    generation: AtomicU64,
}

#[derive(Debug, Clone)]
pub struct WeatherCoordinator {
    inner: Arc<Inner>,
}

/// What the current leg produced for this resolve.
#[derive(Debug, Default)]
struct CurrentLeg {
    current: Option<CurrentWeather>,
    label: Option<(String, Option<String>)>,
}

impl WeatherCoordinator {
    pub fn new(api: Arc<dyn WeatherApi>, bus: ViewStateBus) -> Self {
        let (snapshot, _rx) = watch::channel(WeatherSnapshot::placeholder());
        Self {
            inner: Arc::new(Inner {
                api,
                bus,
                snapshot,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Latest published snapshot, possibly partial.
    pub fn snapshot(&self) -> WeatherSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WeatherSnapshot> {
        self.inner.snapshot.subscribe()
    }

    /// Publish the neutral placeholder, superseding anything in flight.
    ///
    /// Legs of a superseded resolve are dropped, so a `Loading` they raised is
    /// settled here.
    pub fn show_placeholder(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.snapshot.send_replace(WeatherSnapshot::placeholder());
        self.inner.bus.dismiss_after_success();
    }

    /// Fetch weather for `place` and return the merged snapshot once both legs
    /// have settled. A failed leg leaves its fields at their defaults and puts
    /// the bus into `Error`; the other leg still lands.
    pub async fn resolve(&self, place: Place) -> WeatherSnapshot {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(place = %place.city_state(), generation, "resolving weather");

        self.inner.snapshot.send_replace(WeatherSnapshot::new(place.clone()));
        self.inner.bus.set_loading();

        let (current, forecast) = tokio::join!(
            self.current_leg(generation, &place),
            self.forecast_leg(generation, place.coordinate()),
        );

        // Same fields the legs published, merged in a fixed order.
        let mut merged = WeatherSnapshot::new(place);
        if let Some((name, state)) = current.label {
            merged.apply_label(name, state);
        }
        if let Some(current) = current.current {
            merged.apply_current(current);
        }
        if let Some(items) = forecast {
            merged.apply_forecast(items);
        }
        merged
    }

    async fn current_leg(&self, generation: u64, place: &Place) -> CurrentLeg {
        let payload = match self.inner.api.current_weather(place.coordinate()).await {
            Ok(payload) => payload,
            Err(err) => {
                self.fail(generation, "current weather", &err);
                return CurrentLeg::default();
            }
        };

        let current = convert::current_weather(&payload);
        let fetched_at = Coordinate::new(current.lat, current.lon);
        let mut leg = CurrentLeg {
            current: Some(current.clone()),
            label: None,
        };

        if !self.apply(generation, |snapshot| snapshot.apply_current(current)) {
            return leg;
        }
        self.inner.bus.dismiss_after_success();

        if place.origin == PlaceOrigin::Coordinates {
            leg.label = self.reverse_label(generation, fetched_at).await;
        }
        leg
    }

    async fn reverse_label(
        &self,
        generation: u64,
        coord: Coordinate,
    ) -> Option<(String, Option<String>)> {
        let found = match self.inner.api.reverse_geocode(coord).await {
            Ok(found) => found,
            Err(err) => {
                self.fail(generation, "reverse geocoding", &err);
                return None;
            }
        };

        let Some(first) = found.into_iter().next() else {
            let err = WeatherError::NoResults(format!("{}, {}", coord.lat, coord.lon));
            tracing::warn!(error = %err, "keeping placeholder label");
            return None;
        };

        let label = (first.name, first.state);
        let (name, state) = label.clone();
        self.apply(generation, |snapshot| snapshot.apply_label(name, state));
        Some(label)
    }

    async fn forecast_leg(&self, generation: u64, coord: Coordinate) -> Option<Vec<ForecastItem>> {
        match self.inner.api.forecast(coord).await {
            Ok(payload) => {
                let items = convert::forecast_items(&payload);
                let published = items.clone();
                if self.apply(generation, |snapshot| snapshot.apply_forecast(published)) {
                    self.inner.bus.dismiss_after_success();
                }
                Some(items)
            }
            Err(err) => {
                self.fail(generation, "forecast", &err);
                None
            }
        }
    }

    /// Apply `update` to the published snapshot if `generation` is still the latest.
    fn apply(&self, generation: u64, update: impl FnOnce(&mut WeatherSnapshot)) -> bool {
        let inner = &self.inner;
        inner.snapshot.send_if_modified(|snapshot| {
            if inner.generation.load(Ordering::SeqCst) != generation {
                tracing::debug!(generation, "dropping update for superseded place");
                return false;
            }
            update(snapshot);
            true
        })
    }

    fn fail(&self, generation: u64, leg: &str, err: &WeatherError) {
        if self.inner.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, leg, error = %err, "ignoring failure for superseded place");
            return;
        }
        tracing::warn!(leg, error = %err, "weather fetch failed");
        self.inner.bus.set_error(err);
    }
}
