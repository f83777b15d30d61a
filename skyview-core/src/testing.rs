//! Scripted `WeatherApi` fake shared by the unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

use crate::{
    error::{Result, WeatherError},
    model::Coordinate,
    provider::{
        CloudsPayload, ConditionPayload, CoordPayload, CurrentWeatherPayload,
        ForecastEntryPayload, ForecastIconPayload, ForecastMainPayload, ForecastPayload, GeoPlace,
        MainPayload, WeatherApi,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Current(Coordinate),
    Forecast(Coordinate),
    Geocode(String),
    Reverse(Coordinate),
}

#[derive(Debug, Clone)]
struct Scripted<K, T> {
    key: K,
    delay: Duration,
    result: Result<T>,
}

#[derive(Debug, Default)]
pub struct FakeApi {
    current: Mutex<Vec<Scripted<Coordinate, CurrentWeatherPayload>>>,
    forecast: Mutex<Vec<Scripted<Coordinate, ForecastPayload>>>,
    geocode: Mutex<Vec<Scripted<String, Vec<GeoPlace>>>>,
    reverse: Mutex<Vec<Scripted<Coordinate, Vec<GeoPlace>>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeApi {
    pub fn current_at(&self, coord: Coordinate, temp_f: f64, delay: Duration) -> &Self {
        self.current.lock().push(Scripted {
            key: coord,
            delay,
            result: Ok(current_payload(coord, temp_f)),
        });
        self
    }

    pub fn current_fails(&self, coord: Coordinate, err: WeatherError, delay: Duration) -> &Self {
        self.current.lock().push(Scripted {
            key: coord,
            delay,
            result: Err(err),
        });
        self
    }

    pub fn forecast_at(&self, coord: Coordinate, temps: &[f64], delay: Duration) -> &Self {
        self.forecast.lock().push(Scripted {
            key: coord,
            delay,
            result: Ok(forecast_payload(temps)),
        });
        self
    }

    pub fn forecast_fails(&self, coord: Coordinate, err: WeatherError, delay: Duration) -> &Self {
        self.forecast.lock().push(Scripted {
            key: coord,
            delay,
            result: Err(err),
        });
        self
    }

    pub fn geocode_returns(&self, query: &str, places: Vec<GeoPlace>, delay: Duration) -> &Self {
        self.geocode.lock().push(Scripted {
            key: query.to_string(),
            delay,
            result: Ok(places),
        });
        self
    }

    pub fn reverse_returns(&self, coord: Coordinate, places: Vec<GeoPlace>) -> &Self {
        self.reverse.lock().push(Scripted {
            key: coord,
            delay: Duration::ZERO,
            result: Ok(places),
        });
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn geocode_queries(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Geocode(query) => Some(query),
                _ => None,
            })
            .collect()
    }

    pub fn reverse_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Reverse(_)))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

fn lookup<K: PartialEq, T: Clone>(
    scripts: &Mutex<Vec<Scripted<K, T>>>,
    key: &K,
) -> Option<(Duration, Result<T>)> {
    scripts
        .lock()
        .iter()
        .find(|s| s.key == *key)
        .map(|s| (s.delay, s.result.clone()))
}

#[async_trait]
impl WeatherApi for FakeApi {
    async fn current_weather(&self, coord: Coordinate) -> Result<CurrentWeatherPayload> {
        self.record(Call::Current(coord));
        let (delay, result) =
            lookup(&self.current, &coord).unwrap_or((Duration::ZERO, Ok(current_payload(coord, 70.0))));
        tokio::time::sleep(delay).await;
        result
    }

    async fn forecast(&self, coord: Coordinate) -> Result<ForecastPayload> {
        self.record(Call::Forecast(coord));
        let (delay, result) = lookup(&self.forecast, &coord)
            .unwrap_or((Duration::ZERO, Ok(forecast_payload(&[65.0, 63.0]))));
        tokio::time::sleep(delay).await;
        result
    }

    async fn geocode(&self, query: &str) -> Result<Vec<GeoPlace>> {
        self.record(Call::Geocode(query.to_string()));
        let (delay, result) =
            lookup(&self.geocode, &query.to_string()).unwrap_or((Duration::ZERO, Ok(Vec::new())));
        tokio::time::sleep(delay).await;
        result
    }

    async fn reverse_geocode(&self, coord: Coordinate) -> Result<Vec<GeoPlace>> {
        self.record(Call::Reverse(coord));
        let (delay, result) =
            lookup(&self.reverse, &coord).unwrap_or((Duration::ZERO, Ok(Vec::new())));
        tokio::time::sleep(delay).await;
        result
    }
}

pub fn current_payload(coord: Coordinate, temp_f: f64) -> CurrentWeatherPayload {
    CurrentWeatherPayload {
        coord: CoordPayload {
            lat: coord.lat,
            lon: coord.lon,
        },
        weather: vec![ConditionPayload {
            main: "Clear".into(),
            description: "clear sky".into(),
            icon: "01d".into(),
        }],
        main: MainPayload {
            temp: temp_f,
            feels_like: temp_f - 1.0,
            humidity: 40,
        },
        visibility: 10000.0,
        clouds: CloudsPayload { all: 5 },
    }
}

pub fn forecast_payload(temps: &[f64]) -> ForecastPayload {
    ForecastPayload {
        list: temps
            .iter()
            .enumerate()
            .map(|(i, temp)| ForecastEntryPayload {
                dt: 1_700_000_000 + i as i64 * 10_800,
                main: ForecastMainPayload { temp: *temp },
                weather: vec![ForecastIconPayload { icon: "02d".into() }],
            })
            .collect(),
    }
}

pub fn geo(name: &str, state: Option<&str>, lat: f64, lon: f64) -> GeoPlace {
    GeoPlace {
        name: name.to_string(),
        lat,
        lon,
        state: state.map(str::to_string),
    }
}
