//! Debounced, normalized place search.
//!
//! Text goes in through a [`SearchHandle`]; a single actor task owns the
//! pipeline state and publishes [`SearchState`] on a watch channel. Geocode
//! requests run on their own tasks and report back to the actor tagged with
//! a sequence number; only the latest one may touch the results.

use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, watch},
    time::Instant,
};

use crate::{
    error::Result,
    model::Place,
    provider::{GeoPlace, WeatherApi},
    view_state::ViewStateBus,
};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);

/// Shortest normalized query that is sent to the geocoder.
pub const MIN_QUERY_LEN: usize = 3;

// The geocoder rejects multi-word city names typed as one word.
const CITY_ALIASES: &[(&str, &str)] = &[
    ("newyork", "New York"),
    ("losangeles", "Los Angeles"),
    ("sanfrancisco", "San Francisco"),
    ("sandiego", "San Diego"),
    ("sanjose", "San Jose"),
    ("lasvegas", "Las Vegas"),
    ("sanantonio", "San Antonio"),
    ("santamonica", "Santa Monica"),
    ("fortworth", "Fort Worth"),
    ("longbeach", "Long Beach"),
    ("virginiabeach", "Virginia Beach"),
    ("kansascity", "Kansas City"),
    ("oklahomacity", "Oklahoma City"),
    ("saltlakecity", "Salt Lake City"),
    ("batonrouge", "Baton Rouge"),
    ("santabarbara", "Santa Barbara"),
    ("neworleans", "New Orleans"),
    ("grandrapids", "Grand Rapids"),
    ("littlerock", "Little Rock"),
    ("sanbernardino", "San Bernardino"),
    ("coloradosprings", "Colorado Springs"),
    ("corpuschristi", "Corpus Christi"),
    ("palmsprings", "Palm Springs"),
    ("siouxfalls", "Sioux Falls"),
    ("desmoines", "Des Moines"),
    ("greenbay", "Green Bay"),
    ("santacruz", "Santa Cruz"),
    ("grandprairie", "Grand Prairie"),
    ("westpalmbeach", "West Palm Beach"),
    ("stpetersburg", "St. Petersburg"),
    ("santaclara", "Santa Clara"),
    ("lakecharles", "Lake Charles"),
    ("fortlauderdale", "Fort Lauderdale"),
    ("saintpaul", "Saint Paul"),
    ("newhaven", "New Haven"),
    ("fortcollins", "Fort Collins"),
    ("jerseycity", "Jersey City"),
    ("sanmateo", "San Mateo"),
    ("sanmarcos", "San Marcos"),
    ("newportbeach", "Newport Beach"),
    ("santafe", "Santa Fe"),
    ("sanclemente", "San Clemente"),
    ("sanleandro", "San Leandro"),
    ("sanrafael", "San Rafael"),
    ("sanramon", "San Ramon"),
    ("santarosa", "Santa Rosa"),
    ("sangabriel", "San Gabriel"),
    ("westcovina", "West Covina"),
    ("northcharleston", "North Charleston"),
    ("newbrunswick", "New Brunswick"),
    ("portsaintlucie", "Port Saint Lucie"),
    ("rockhill", "Rock Hill"),
    ("coralsprings", "Coral Springs"),
    ("santaclarita", "Santa Clarita"),
    ("sandysprings", "Sandy Springs"),
    ("southbend", "South Bend"),
    ("sanangelo", "San Angelo"),
    ("grandjunction", "Grand Junction"),
    ("fortmyers", "Fort Myers"),
    ("palmbeachgardens", "Palm Beach Gardens"),
    ("royalpalmbeach", "Royal Palm Beach"),
    ("greatfalls", "Great Falls"),
    ("grandforks", "Grand Forks"),
    ("collegestation", "College Station"),
    ("olivebranch", "Olive Branch"),
    ("bowlinggreen", "Bowling Green"),
    ("baycity", "Bay City"),
    ("cedarrapids", "Cedar Rapids"),
    ("hiltonheadisland", "Hilton Head Island"),
    ("westvalleycity", "West Valley City"),
    ("westjordan", "West Jordan"),
    ("sanluisobispo", "San Luis Obispo"),
    ("eastlansing", "East Lansing"),
    ("portorange", "Port Orange"),
    ("mountpleasant", "Mount Pleasant"),
    ("panamacitybeach", "Panama City Beach"),
    ("lincolnpark", "Lincoln Park"),
    ("sanbruno", "San Bruno"),
    ("missionviejo", "Mission Viejo"),
    ("westnewyork", "West New York"),
    ("crystallake", "Crystal Lake"),
    ("eaglepass", "Eagle Pass"),
    ("redwoodcity", "Redwood City"),
    ("roundrock", "Round Rock"),
    ("castlerock", "Castle Rock"),
    ("twinfalls", "Twin Falls"),
    ("johnscreek", "Johns Creek"),
    ("sugarland", "Sugar Land"),
    ("sanbuenaventura", "San Buenaventura"),
    ("fountainvalley", "Fountain Valley"),
    ("sanfernando", "San Fernando"),
];

/// Clean raw search text into a geocoder query.
///
/// Strips everything outside `[a-zA-Z0-9 -]`, turns dashes into spaces,
/// collapses whitespace and lowercases. If the result with spaces removed is a
/// known multi-word city, its canonical spelling is returned instead.
pub fn normalize(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
        .map(|c| if c == '-' { ' ' } else { c })
        .collect();

    let lowered = cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let key: String = lowered.chars().filter(|c| *c != ' ').collect();

    match canonical_city(&key) {
        Some(city) => city.to_string(),
        None => lowered,
    }
}

fn canonical_city(key: &str) -> Option<&'static str> {
    CITY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, city)| *city)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchPhase {
    #[default]
    Empty,
    Debouncing,
    Querying,
    Results,
}

/// What the search view shows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchState {
    pub phase: SearchPhase,
    /// Normalized query of the latest dispatch.
    pub query: Option<String>,
    pub places: Vec<Place>,
}

#[derive(Debug)]
enum Input {
    Text(String),
    Clear,
}

#[derive(Debug)]
struct Response {
    seq: u64,
    query: String,
    result: Result<Vec<GeoPlace>>,
}

/// Cheap, cloneable front of a running pipeline. The actor stops once every
/// handle is dropped.
#[derive(Debug, Clone)]
pub struct SearchHandle {
    input: mpsc::UnboundedSender<Input>,
    state: watch::Receiver<SearchState>,
}

impl SearchHandle {
    /// Feed the latest raw text, e.g. on every keystroke.
    pub fn set_text(&self, text: impl Into<String>) {
        if self.input.send(Input::Text(text.into())).is_err() {
            tracing::warn!("search pipeline is no longer running");
        }
    }

    /// Drop pending input and any shown or in-flight results.
    pub fn clear(&self) {
        if self.input.send(Input::Clear).is_err() {
            tracing::warn!("search pipeline is no longer running");
        }
    }

    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.clone()
    }

    /// Wait until the published state satisfies `pred`.
    pub async fn wait_for(&self, pred: impl FnMut(&SearchState) -> bool) -> Option<SearchState> {
        let mut rx = self.state.clone();
        let state = rx.wait_for(pred).await.ok()?.clone();
        Some(state)
    }
}

pub struct SearchQueryPipeline {
    api: Arc<dyn WeatherApi>,
    bus: ViewStateBus,
    debounce: Duration,
    state: watch::Sender<SearchState>,
    last_text: Option<String>,
    pending: Option<String>,
    deadline: Option<Instant>,
    seq: u64,
    responses: mpsc::UnboundedSender<Response>,
}

impl SearchQueryPipeline {
    /// Start the pipeline actor on the current runtime.
    pub fn spawn(api: Arc<dyn WeatherApi>, bus: ViewStateBus, debounce: Duration) -> SearchHandle {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SearchState::default());

        let pipeline = Self {
            api,
            bus,
            debounce,
            state: state_tx,
            last_text: None,
            pending: None,
            deadline: None,
            seq: 0,
            responses: response_tx,
        };
        tokio::spawn(pipeline.run(input_rx, response_rx));

        SearchHandle {
            input: input_tx,
            state: state_rx,
        }
    }

    async fn run(
        mut self,
        mut inputs: mpsc::UnboundedReceiver<Input>,
        mut responses: mpsc::UnboundedReceiver<Response>,
    ) {
        loop {
            let deadline = self.deadline;

            tokio::select! {
                input = inputs.recv() => match input {
                    Some(Input::Text(text)) => self.on_text(text),
                    Some(Input::Clear) => self.on_clear(),
                    None => break,
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.on_settled();
                }
                Some(response) = responses.recv() => self.on_response(response),
            }
        }

        tracing::debug!("search pipeline stopped");
    }

    fn on_text(&mut self, text: String) {
        let trimmed = text.trim();
        if trimmed.is_empty() || self.last_text.as_deref() == Some(trimmed) {
            return;
        }

        self.last_text = Some(trimmed.to_string());
        self.pending = Some(trimmed.to_string());
        self.deadline = Some(Instant::now() + self.debounce);
        self.state.send_modify(|state| state.phase = SearchPhase::Debouncing);
    }

    fn on_clear(&mut self) {
        self.last_text = None;
        self.pending = None;
        self.deadline = None;
        self.seq += 1;
        self.state.send_replace(SearchState::default());
    }

    fn on_settled(&mut self) {
        self.deadline = None;
        let Some(text) = self.pending.take() else {
            return;
        };

        // Any response still in flight is now stale.
        self.seq += 1;
        let query = normalize(&text);

        if query.chars().count() < MIN_QUERY_LEN {
            tracing::debug!(%query, "query too short, clearing results");
            self.state.send_replace(SearchState::default());
            return;
        }

        self.state.send_replace(SearchState {
            phase: SearchPhase::Querying,
            query: Some(query.clone()),
            places: Vec::new(),
        });
        self.bus.set_loading();

        tracing::debug!(seq = self.seq, %query, "dispatching geocode");
        let seq = self.seq;
        let api = Arc::clone(&self.api);
        let responses = self.responses.clone();
        tokio::spawn(async move {
            let result = api.geocode(&query).await;
            let _ = responses.send(Response { seq, query, result });
        });
    }

    fn on_response(&mut self, response: Response) {
        if response.seq != self.seq {
            tracing::debug!(
                seq = response.seq,
                latest = self.seq,
                query = %response.query,
                "dropping stale geocode response"
            );
            // Settle the Loading this request raised unless a newer one is running.
            if self.state.borrow().phase != SearchPhase::Querying {
                self.bus.dismiss_after_success();
            }
            return;
        }

        match response.result {
            Ok(found) => {
                tracing::debug!(query = %response.query, count = found.len(), "geocode results");
                let places = found.into_iter().map(Place::from).collect();
                self.state.send_replace(SearchState {
                    phase: SearchPhase::Results,
                    query: Some(response.query),
                    places,
                });
                self.bus.dismiss_after_success();
            }
            Err(err) => {
                tracing::warn!(query = %response.query, error = %err, "geocode failed");
                self.state.send_replace(SearchState {
                    phase: SearchPhase::Empty,
                    query: Some(response.query),
                    places: Vec::new(),
                });
                self.bus.set_error(&err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::WeatherError,
        testing::{FakeApi, geo},
        view_state::ViewState,
    };

    const WINDOW: Duration = Duration::from_millis(1000);

    fn start(api: &Arc<FakeApi>) -> (SearchHandle, ViewStateBus) {
        let bus = ViewStateBus::default();
        let handle = SearchQueryPipeline::spawn(api.clone(), bus.clone(), WINDOW);
        (handle, bus)
    }

    async fn settle() {
        tokio::time::sleep(WINDOW + Duration::from_millis(50)).await;
    }

    #[test]
    fn normalize_cleans_and_lowercases() {
        assert_eq!(normalize("  Boise!!  "), "boise");
        assert_eq!(normalize("Winston-Salem"), "winston salem");
        assert_eq!(normalize("a  -  b\tc"), "a b c");
        assert_eq!(normalize("Café"), "caf");
    }

    #[test]
    fn normalize_maps_aliases() {
        assert_eq!(normalize("New York"), "New York");
        assert_eq!(normalize("newyork"), "New York");
        assert_eq!(normalize("sanfrancisco"), "San Francisco");
        assert_eq!(normalize("SALT-LAKE-CITY"), "Salt Lake City");
        assert_eq!(normalize("stpetersburg"), "St. Petersburg");
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = [
            "New York",
            "newyork",
            "  san   francisco ",
            "St. Petersburg",
            "winston-salem",
            "Fort---Worth",
            "x",
            "",
            "Boise, ID",
            "west new york",
        ];

        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input: {input:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_input_dispatches_only_last_value() {
        let api = Arc::new(FakeApi::default());
        let (handle, _bus) = start(&api);

        for text in ["sa", "san", "san f", "san fr", "san francisco"] {
            handle.set_text(text);
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        settle().await;

        assert_eq!(api.geocode_queries(), vec!["San Francisco".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn alias_is_applied_before_dispatch() {
        let api = Arc::new(FakeApi::default());
        let (handle, _bus) = start(&api);

        handle.set_text("sanfrancisco");
        settle().await;

        assert_eq!(api.geocode_queries(), vec!["San Francisco".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn short_query_clears_results_without_dispatch() {
        let api = Arc::new(FakeApi::default());
        api.geocode_returns(
            "boise",
            vec![geo("Boise", Some("ID"), 43.6, -116.2)],
            Duration::ZERO,
        );
        let (handle, _bus) = start(&api);

        handle.set_text("boise");
        settle().await;
        assert_eq!(handle.state().places.len(), 1);

        handle.set_text("bo!");
        settle().await;

        assert_eq!(api.geocode_queries(), vec!["boise".to_string()]);
        assert_eq!(handle.state(), SearchState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_and_repeated_text_is_ignored() {
        let api = Arc::new(FakeApi::default());
        let (handle, _bus) = start(&api);

        handle.set_text("austin");
        settle().await;
        handle.set_text("  austin ");
        handle.set_text("   ");
        settle().await;

        assert_eq!(api.geocode_queries(), vec!["austin".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn results_are_cleared_when_new_query_dispatches() {
        let api = Arc::new(FakeApi::default());
        api.geocode_returns(
            "austin",
            vec![geo("Austin", Some("TX"), 30.27, -97.74)],
            Duration::ZERO,
        )
        .geocode_returns(
            "dallas",
            vec![geo("Dallas", Some("TX"), 32.78, -96.8)],
            Duration::from_secs(2),
        );
        let (handle, _bus) = start(&api);

        handle.set_text("austin");
        settle().await;
        assert_eq!(handle.state().places[0].name, "Austin");

        handle.set_text("dallas");
        settle().await;

        let querying = handle.state();
        assert_eq!(querying.phase, SearchPhase::Querying);
        assert!(querying.places.is_empty());

        let done = handle
            .wait_for(|s| s.phase == SearchPhase::Results)
            .await
            .unwrap();
        assert_eq!(done.places[0].city_state(), "Dallas, TX");
    }

    #[tokio::test(start_paused = true)]
    async fn stale_response_is_dropped() {
        let api = Arc::new(FakeApi::default());
        api.geocode_returns(
            "portland",
            vec![geo("Portland", Some("OR"), 45.5, -122.7)],
            Duration::from_secs(5),
        )
        .geocode_returns(
            "seattle",
            vec![geo("Seattle", Some("WA"), 47.6, -122.3)],
            Duration::ZERO,
        );
        let (handle, bus) = start(&api);

        handle.set_text("portland");
        settle().await;
        handle.set_text("seattle");
        settle().await;
        assert_eq!(handle.state().places[0].name, "Seattle");

        // Let the slow portland response land.
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(
            api.geocode_queries(),
            vec!["portland".to_string(), "seattle".to_string()]
        );
        let state = handle.state();
        assert_eq!(state.query.as_deref(), Some("seattle"));
        assert_eq!(state.places[0].name, "Seattle");
        assert_eq!(bus.current(), ViewState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_invalidates_in_flight_request() {
        let api = Arc::new(FakeApi::default());
        api.geocode_returns(
            "denver",
            vec![geo("Denver", Some("CO"), 39.7, -105.0)],
            Duration::from_secs(3),
        );
        let (handle, bus) = start(&api);

        handle.set_text("denver");
        settle().await;
        handle.clear();
        tokio::time::sleep(Duration::from_secs(4)).await;

        assert_eq!(handle.state(), SearchState::default());
        assert_eq!(bus.current(), ViewState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn geocode_drives_view_state() {
        let api = Arc::new(FakeApi::default());
        api.geocode_returns("reno", Vec::new(), Duration::from_millis(500));
        let (handle, bus) = start(&api);

        handle.set_text("reno");
        settle().await;
        assert_eq!(bus.current(), ViewState::Loading);

        handle.wait_for(|s| s.phase == SearchPhase::Results).await;
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(bus.current(), ViewState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn geocode_failure_surfaces_error() {
        #[derive(Debug)]
        struct Offline;

        #[async_trait::async_trait]
        impl WeatherApi for Offline {
            async fn current_weather(
                &self,
                _: crate::model::Coordinate,
            ) -> Result<crate::provider::CurrentWeatherPayload> {
                Err(WeatherError::Network("offline".into()))
            }
            async fn forecast(
                &self,
                _: crate::model::Coordinate,
            ) -> Result<crate::provider::ForecastPayload> {
                Err(WeatherError::Network("offline".into()))
            }
            async fn geocode(&self, _: &str) -> Result<Vec<GeoPlace>> {
                Err(WeatherError::Network("offline".into()))
            }
            async fn reverse_geocode(
                &self,
                _: crate::model::Coordinate,
            ) -> Result<Vec<GeoPlace>> {
                Err(WeatherError::Network("offline".into()))
            }
        }

        let bus = ViewStateBus::default();
        let handle = SearchQueryPipeline::spawn(Arc::new(Offline), bus.clone(), WINDOW);

        handle.set_text("miami");
        settle().await;

        assert!(bus.current().error().unwrap().contains("offline"));
        assert!(handle.state().places.is_empty());
    }
}
