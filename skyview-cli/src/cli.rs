use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{Password, Select, list_option::ListOption};
use skyview_core::{
    Config, Coordinate, FixedLocation, JsonFileStore, Place, SearchPhase, SessionTimings,
    ViewStateBus, WeatherSession, provider_from_config,
    search::{MIN_QUERY_LEN, normalize},
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skyview", version, about = "Current weather and a short forecast")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and, optionally, a fixed device location.
    Configure {
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },

    /// Show weather for the device location, the last search, or explicit coordinates.
    Show {
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },

    /// Search a US place by name, pick one and show its weather.
    Search {
        /// City name, e.g. "San Francisco" or "sanfrancisco".
        text: String,
    },

    /// List recent searches with their current temperature.
    Recent,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { lat, lon } => configure(lat.zip(lon)),
            Command::Show { lat, lon } => show(lat.zip(lon)).await,
            Command::Search { text } => search(&text).await,
            Command::Recent => recent().await,
        }
    }
}

fn configure(location: Option<(f64, f64)>) -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    config.set_api_key(api_key.trim().to_string());

    if let Some((lat, lon)) = location {
        config.set_location(Some(Coordinate::new(lat, lon)));
    }

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn open_session() -> anyhow::Result<WeatherSession> {
    let config = Config::load()?.with_env_overrides();
    let api = provider_from_config(&config)?;
    let recent_path = Config::recent_searches_path()?;
    tracing::debug!(path = %recent_path.display(), "using recent searches file");
    let store = Arc::new(JsonFileStore::new(recent_path));
    let location = Arc::new(FixedLocation::new(config.location));
    let bus = ViewStateBus::new(config.settle_delay());

    Ok(WeatherSession::open(api, store, location, bus, SessionTimings::from(&config)).await)
}

async fn show(coordinate: Option<(f64, f64)>) -> anyhow::Result<()> {
    let session = open_session().await?;

    let snapshot = match coordinate {
        Some((lat, lon)) => {
            let place = Place::from_coordinate(Coordinate::new(lat, lon));
            session.coordinator().resolve(place).await
        }
        None => session.start().await,
    };

    render::snapshot(&snapshot);
    render::report_error(&session);
    Ok(())
}

async fn search(text: &str) -> anyhow::Result<()> {
    let query = normalize(text);
    if query.chars().count() < MIN_QUERY_LEN {
        bail!("Search text must have at least {MIN_QUERY_LEN} letters or digits");
    }

    let session = open_session().await?;
    let handle = session.search();
    handle.set_text(text);

    // Leave the initial Empty state first, then wait for the outcome.
    handle.wait_for(|s| s.phase != SearchPhase::Empty).await;
    let state = handle
        .wait_for(|s| matches!(s.phase, SearchPhase::Results | SearchPhase::Empty))
        .await
        .context("Search pipeline stopped unexpectedly")?;

    if state.places.is_empty() {
        render::report_error(&session);
        println!("No places found for \"{query}\".");
        return Ok(());
    }

    let labels: Vec<String> = state.places.iter().map(Place::city_state).collect();
    let picked = Select::new("Pick a place:", labels)
        .raw_prompt()
        .context("No place selected")?;
    let place = picked_place(&state.places, &picked).context("Picked place is out of range")?;
    tracing::debug!(index = picked.index, lat = place.lat, lon = place.lon, "place picked");

    let snapshot = session.select(place).await;
    render::snapshot(&snapshot);
    render::report_error(&session);
    Ok(())
}

/// Map the picked row back by position; labels are not unique.
fn picked_place(places: &[Place], picked: &ListOption<String>) -> Option<Place> {
    places.get(picked.index).cloned()
}

async fn recent() -> anyhow::Result<()> {
    let session = open_session().await?;

    let entries = session.recent().list().await;
    if entries.is_empty() {
        println!("No recent searches yet. Try `skyview search <city>`.");
        return Ok(());
    }

    let mut updates = session.recent_weather().await;
    let mut shown = 0;
    while let Some(item) = updates.recv().await {
        render::recent(&item);
        shown += 1;
    }

    if shown < entries.len() {
        eprintln!(
            "Weather unavailable for {} of {} recent searches.",
            entries.len() - shown,
            entries.len()
        );
    }
    Ok(())
}
