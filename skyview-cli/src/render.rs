use chrono::Local;
use skyview_core::{RecentWeather, ViewState, WeatherSession, WeatherSnapshot};

pub fn snapshot(snapshot: &WeatherSnapshot) {
    println!("{}  {}", snapshot.city_state(), snapshot.temp_display());

    println!("  {}", snapshot.condition_display());
    println!("  Feels like  {}", snapshot.feels_like_display());
    println!("  Humidity    {}", snapshot.humidity_display());
    println!("  Cloudiness  {}", snapshot.cloudiness_display());
    println!("  Visibility  {}", snapshot.visibility_display());

    if !snapshot.forecast.is_empty() {
        let row: Vec<String> = snapshot
            .forecast
            .iter()
            .map(|item| format!("{} {}", item.period_label, item.temp_display()))
            .collect();
        println!("  {}", row.join(" | "));
    }
}

pub fn recent(item: &RecentWeather) {
    let searched = item.entry.captured_at.with_timezone(&Local);
    println!(
        "{:<28} {:>5}  searched {}",
        item.city_state(),
        item.temp_display(),
        searched.format("%b %-d %-I:%M%P")
    );
}

/// Surface a pending error the way a dialog would, then acknowledge it.
pub fn report_error(session: &WeatherSession) {
    if let ViewState::Error(message) = session.bus().current() {
        eprintln!("Error: {message}");
        session.dismiss_error();
    }
}
