//! Core library for `skyview`.
//!
//! This crate defines:
//! - Place resolution from a location fix, a debounced text search or the
//!   recent-searches cache
//! - A coordinator merging current weather and forecast into one snapshot
//! - A shared Idle / Loading / Error bus that every fetch reports into
//! - Boundaries for the weather API, device location and durable storage
//!
//! It has no entry point of its own; `skyview-cli` is one host for it.

pub mod aggregator;
pub mod config;
pub mod convert;
pub mod coordinator;
pub mod error;
pub mod location;
pub mod model;
pub mod provider;
pub mod recent;
pub mod search;
pub mod session;
pub mod store;
pub mod view_state;

#[cfg(test)]
mod testing;

pub use aggregator::{RecentWeather, RecentWeatherAggregator};
pub use config::Config;
pub use coordinator::WeatherCoordinator;
pub use error::WeatherError;
pub use location::{Authorization, FixedLocation, LocationSource};
pub use model::{Coordinate, CurrentWeather, ForecastItem, Place, PlaceOrigin, RecentSearchEntry, WeatherSnapshot};
pub use provider::{WeatherApi, provider_from_config};
pub use recent::RecentSearchStore;
pub use search::{SearchHandle, SearchPhase, SearchQueryPipeline, SearchState, normalize};
pub use session::{SessionTimings, WeatherSession};
pub use store::{JsonFileStore, MemoryStore, Store};
pub use view_state::{ViewState, ViewStateBus};
