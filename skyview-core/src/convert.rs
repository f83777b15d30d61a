//! Payload to model conversion.

use chrono::{DateTime, Local, TimeZone};

use crate::{
    model::{CurrentWeather, ForecastItem},
    provider::{CurrentWeatherPayload, ForecastPayload},
};

pub const MILES_PER_METER: f64 = 0.000621371;

pub fn meters_to_miles(meters: f64) -> f64 {
    meters * MILES_PER_METER
}

pub fn current_weather(payload: &CurrentWeatherPayload) -> CurrentWeather {
    let condition = payload.weather.first();

    CurrentWeather {
        lat: payload.coord.lat,
        lon: payload.coord.lon,
        condition_summary: condition.map(|c| c.main.clone()).unwrap_or_default(),
        condition_detail: condition.map(|c| c.description.clone()).unwrap_or_default(),
        icon_code: condition.map(|c| c.icon.clone()).unwrap_or_default(),
        temp_f: payload.main.temp,
        feels_like_f: payload.main.feels_like,
        humidity_pct: payload.main.humidity,
        visibility_mi: meters_to_miles(payload.visibility),
        cloudiness_pct: payload.clouds.all,
    }
}

/// Forecast items labelled in the local time zone, in API order.
pub fn forecast_items(payload: &ForecastPayload) -> Vec<ForecastItem> {
    forecast_items_in(payload, &Local)
}

pub fn forecast_items_in<Tz: TimeZone>(payload: &ForecastPayload, tz: &Tz) -> Vec<ForecastItem>
where
    Tz::Offset: std::fmt::Display,
{
    payload
        .list
        .iter()
        .map(|entry| ForecastItem {
            period_label: hour_label_in(entry.dt, tz),
            temp_f: Some(entry.main.temp),
            icon_code: entry
                .weather
                .first()
                .map(|w| w.icon.clone())
                .unwrap_or_default(),
        })
        .collect()
}

/// `"3pm"`-style hour of day for a unix timestamp.
pub fn hour_label_in<Tz: TimeZone>(unix_secs: i64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match DateTime::from_timestamp(unix_secs, 0) {
        Some(utc) => utc.with_timezone(tz).format("%-I%P").to_string(),
        None => crate::model::PLACEHOLDER.to_string(),
    }
}
