use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label of the synthesized first forecast entry.
pub const NOW_LABEL: &str = "now";

/// Shown wherever a value has not arrived yet.
pub const PLACEHOLDER: &str = "–";

const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn/";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Where a [`Place`] came from. Decides whether the coordinator asks for a
/// reverse-geocoded label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceOrigin {
    #[default]
    Search,
    Recent,
    Coordinates,
}

/// A named or coordinate-identified location.
///
/// Equality is identity: `(name, state, lat, lon)`. The origin is not part of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub state: Option<String>,
    pub lat: f64,
    pub lon: f64,
    #[serde(skip)]
    pub origin: PlaceOrigin,
}

impl Place {
    pub fn new(name: impl Into<String>, state: Option<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            state,
            lat,
            lon,
            origin: PlaceOrigin::Search,
        }
    }

    /// A place known only by its coordinate, e.g. a device location fix.
    pub fn from_coordinate(coord: Coordinate) -> Self {
        Self {
            name: String::new(),
            state: None,
            lat: coord.lat,
            lon: coord.lon,
            origin: PlaceOrigin::Coordinates,
        }
    }

    /// Neutral place used when neither a location nor a cached search exists.
    pub fn placeholder() -> Self {
        Self::from_coordinate(Coordinate::new(0.0, 0.0))
    }

    pub fn with_origin(mut self, origin: PlaceOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }

    /// `"name"` or `"name, state"`; the placeholder dash for unnamed places.
    pub fn city_state(&self) -> String {
        if self.name.is_empty() {
            return PLACEHOLDER.to_string();
        }

        match self.state.as_deref() {
            Some(state) if !state.is_empty() => format!("{}, {}", self.name, state),
            _ => self.name.clone(),
        }
    }
}

impl PartialEq for Place {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.state == other.state
            && self.lat == other.lat
            && self.lon == other.lon
    }
}

/// Current conditions with raw numeric fields; display strings are derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub lat: f64,
    pub lon: f64,
    pub condition_summary: String,
    pub condition_detail: String,
    pub icon_code: String,
    pub temp_f: f64,
    pub feels_like_f: f64,
    pub humidity_pct: u8,
    pub visibility_mi: f64,
    pub cloudiness_pct: u8,
}

impl CurrentWeather {
    pub fn temp_display(&self) -> String {
        format_temp(Some(self.temp_f))
    }

    pub fn feels_like_display(&self) -> String {
        format_temp(Some(self.feels_like_f))
    }

    pub fn humidity_display(&self) -> String {
        format!("{}%", self.humidity_pct)
    }

    pub fn cloudiness_display(&self) -> String {
        format!("{}%", self.cloudiness_pct)
    }

    pub fn visibility_display(&self) -> String {
        format!("{:.1} mi", self.visibility_mi)
    }

    /// Detail text capitalized word by word ("broken clouds" -> "Broken Clouds").
    pub fn condition_display(&self) -> String {
        self.condition_detail
            .split_whitespace()
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn icon_url(&self) -> Option<String> {
        icon_url(&self.icon_code)
    }
}

/// One hourly forecast period. `temp_f` is `None` only for a "now" entry
/// synthesized before current weather arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastItem {
    pub period_label: String,
    pub temp_f: Option<f64>,
    pub icon_code: String,
}

impl ForecastItem {
    /// The "now" entry mirroring `current`, or a placeholder.
    pub fn now(current: Option<&CurrentWeather>) -> Self {
        Self {
            period_label: NOW_LABEL.to_string(),
            temp_f: current.map(|c| c.temp_f),
            icon_code: current.map(|c| c.icon_code.clone()).unwrap_or_default(),
        }
    }

    pub fn temp_display(&self) -> String {
        format_temp(self.temp_f)
    }

    pub fn icon_url(&self) -> Option<String> {
        icon_url(&self.icon_code)
    }
}

/// Merged, displayable weather for one place.
///
/// Rebuilt for every new place. The current and forecast legs each write
/// their own fields, so applying them in either order gives the same value.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub place: Place,
    pub current: Option<CurrentWeather>,
    pub forecast: Vec<ForecastItem>,
}

impl WeatherSnapshot {
    pub fn new(place: Place) -> Self {
        Self {
            place,
            current: None,
            forecast: Vec::new(),
        }
    }

    pub fn placeholder() -> Self {
        Self::new(Place::placeholder())
    }

    pub fn city_state(&self) -> String {
        self.place.city_state()
    }

    pub fn temp_display(&self) -> String {
        format_temp(self.current.as_ref().map(|c| c.temp_f))
    }

    pub fn feels_like_display(&self) -> String {
        format_temp(self.current.as_ref().map(|c| c.feels_like_f))
    }

    pub fn humidity_display(&self) -> String {
        self.current
            .as_ref()
            .map(CurrentWeather::humidity_display)
            .unwrap_or_else(|| format!("{PLACEHOLDER}%"))
    }

    pub fn cloudiness_display(&self) -> String {
        self.current
            .as_ref()
            .map(CurrentWeather::cloudiness_display)
            .unwrap_or_else(|| format!("{PLACEHOLDER}%"))
    }

    pub fn visibility_display(&self) -> String {
        self.current
            .as_ref()
            .map(CurrentWeather::visibility_display)
            .unwrap_or_else(|| format!("{PLACEHOLDER} mi"))
    }

    pub fn condition_display(&self) -> String {
        self.current
            .as_ref()
            .map(CurrentWeather::condition_display)
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }

    /// Stores current conditions and refreshes the "now" entry if the
    /// forecast has already arrived.
    pub fn apply_current(&mut self, current: CurrentWeather) {
        if let Some(first) = self.forecast.first_mut() {
            *first = ForecastItem::now(Some(&current));
        }
        self.current = Some(current);
    }

    /// Replaces the forecast with `now` followed by `items` in API order.
    pub fn apply_forecast(&mut self, items: Vec<ForecastItem>) {
        let mut forecast = Vec::with_capacity(items.len() + 1);
        forecast.push(ForecastItem::now(self.current.as_ref()));
        forecast.extend(items);
        self.forecast = forecast;
    }

    /// Replaces the display label, keeping the coordinate the weather was fetched for.
    pub fn apply_label(&mut self, name: String, state: Option<String>) {
        self.place.name = name;
        self.place.state = state;
    }
}

/// A cached past selection. The cache keeps at most three, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentSearchEntry {
    pub place: Place,
    pub captured_at: DateTime<Utc>,
}

impl RecentSearchEntry {
    pub fn new(place: Place) -> Self {
        Self {
            place: place.with_origin(PlaceOrigin::Recent),
            captured_at: Utc::now(),
        }
    }

    pub fn same_place(&self, place: &Place) -> bool {
        self.place == *place
    }
}

/// `https://openweathermap.org/img/wn/{code}@2x.png`; no URL for an empty code.
pub fn icon_url(icon_code: &str) -> Option<String> {
    if icon_code.is_empty() {
        return None;
    }
    Some(format!("{ICON_BASE_URL}{icon_code}@2x.png"))
}

/// Whole degrees rounded to nearest, or the placeholder.
pub fn format_temp(temp_f: Option<f64>) -> String {
    match temp_f {
        Some(t) => format!("{}°", t.round() as i64),
        None => format!("{PLACEHOLDER}°"),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
