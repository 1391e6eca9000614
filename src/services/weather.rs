use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const WEATHER_API_BASE: &str = "https://api.weatherapi.com/v1";

/// The API serves at most ten forecast days.
pub const MAX_FORECAST_DAYS: u8 = 10;

#[derive(Clone)]
pub struct WeatherClient {
    http: Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct Forecast {
    pub location: Location,
    pub current: Current,
    pub forecast: ForecastDays,
    #[serde(default)]
    pub alerts: Option<Alerts>,
}

#[derive(Debug, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub localtime: String,
}

#[derive(Debug, Deserialize)]
pub struct Condition {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct Current {
    pub temp_c: f64,
    pub temp_f: f64,
    pub feelslike_c: f64,
    pub feelslike_f: f64,
    pub condition: Condition,
    pub wind_kph: f64,
    pub wind_mph: f64,
    pub wind_dir: String,
    pub humidity: f64,
    pub vis_km: f64,
    pub vis_miles: f64,
    pub uv: f64,
    #[serde(default)]
    pub air_quality: Option<AirQuality>,
}

#[derive(Debug, Deserialize)]
pub struct AirQuality {
    pub co: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastDays {
    pub forecastday: Vec<ForecastDay>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastDay {
    pub date: String,
    pub day: Day,
    pub astro: Astro,
}

#[derive(Debug, Deserialize)]
pub struct Day {
    pub maxtemp_c: f64,
    pub maxtemp_f: f64,
    pub mintemp_c: f64,
    pub mintemp_f: f64,
    pub condition: Condition,
    pub daily_chance_of_rain: f64,
    pub daily_chance_of_snow: f64,
}

#[derive(Debug, Deserialize)]
pub struct Astro {
    pub sunrise: String,
    pub sunset: String,
}

#[derive(Debug, Deserialize)]
pub struct Alerts {
    #[serde(default)]
    pub alert: Vec<Alert>,
}

#[derive(Debug, Deserialize)]
pub struct Alert {
    pub headline: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl WeatherClient {
    pub fn new(http: Client, api_key: String) -> Self {
        Self { http, api_key }
    }

    /// Current conditions plus `days` of forecast (clamped to 1..=10).
    pub async fn forecast(&self, location: &str, days: u8) -> anyhow::Result<Forecast> {
        let days = days.clamp(1, MAX_FORECAST_DAYS).to_string();
        debug!("Weather: fetching {} day(s) for {}", days, location);

        let response = self
            .http
            .get(format!("{}/forecast.json", WEATHER_API_BASE))
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", location),
                ("days", days.as_str()),
                ("aqi", "yes"),
                ("alerts", "yes"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorBody>()
                .await
                .map(|b| b.error.message)
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!("API Error {}: {}", status.as_u16(), message));
        }

        Ok(response.json::<Forecast>().await?)
    }
}

fn place(location: &Location) -> String {
    [location.name.as_str(), location.region.as_str(), location.country.as_str()]
        .iter()
        .filter(|s| !s.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_current(data: &Forecast) -> String {
    let current = &data.current;
    let mut out = format!("🌤️ **Weather for {}**\n\n", place(&data.location));
    out.push_str(&format!("**Current Conditions** ({})\n", data.location.localtime));
    out.push_str(&format!("🌡️ **Temperature:** {}°C ({}°F)\n", current.temp_c, current.temp_f));
    out.push_str(&format!("🌡️ **Feels like:** {}°C ({}°F)\n", current.feelslike_c, current.feelslike_f));
    out.push_str(&format!("☁️ **Condition:** {}\n", current.condition.text));
    out.push_str(&format!(
        "💨 **Wind:** {} km/h ({} mph) {}\n",
        current.wind_kph, current.wind_mph, current.wind_dir
    ));
    out.push_str(&format!("💧 **Humidity:** {}%\n", current.humidity));
    out.push_str(&format!("👁️ **Visibility:** {} km ({} miles)\n", current.vis_km, current.vis_miles));
    out.push_str(&format!("🌡️ **UV Index:** {}\n", current.uv));

    if let Some(aq) = &current.air_quality {
        let fmt = |v: Option<f64>| v.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "N/A".to_string());
        out.push_str(&format!(
            "🌬️ **Air Quality:** CO: {}, NO2: {}, O3: {}\n",
            fmt(aq.co),
            fmt(aq.no2),
            fmt(aq.o3)
        ));
    }

    if let Some(today) = data.forecast.forecastday.first() {
        let day = &today.day;
        out.push_str("\n**Today's Forecast**\n");
        out.push_str(&format!(
            "🌡️ **High/Low:** {}°C / {}°C ({}°F / {}°F)\n",
            day.maxtemp_c, day.mintemp_c, day.maxtemp_f, day.mintemp_f
        ));
        out.push_str(&format!("☁️ **Condition:** {}\n", day.condition.text));
        out.push_str(&format!("🌧️ **Chance of rain:** {}%\n", day.daily_chance_of_rain));
        out.push_str(&format!("❄️ **Chance of snow:** {}%\n", day.daily_chance_of_snow));
        out.push_str(&format!(
            "🌅 **Sunrise:** {} | 🌇 **Sunset:** {}\n",
            today.astro.sunrise, today.astro.sunset
        ));
    }

    if let Some(alerts) = data.alerts.as_ref().filter(|a| !a.alert.is_empty()) {
        out.push_str("\n⚠️ **Weather Alerts:**\n");
        for alert in alerts.alert.iter().take(2) {
            out.push_str(&format!("• {}\n", alert.headline));
        }
    }

    out
}

pub fn format_forecast(data: &Forecast, days: u8) -> String {
    let mut out = format!("📅 **{}-Day Forecast for {}**\n\n", days, place(&data.location));
    for entry in &data.forecast.forecastday {
        let day = &entry.day;
        out.push_str(&format!("**{}**\n", entry.date));
        out.push_str(&format!(
            "🌡️ {}°C - {}°C ({}°F - {}°F)\n",
            day.mintemp_c, day.maxtemp_c, day.mintemp_f, day.maxtemp_f
        ));
        out.push_str(&format!("☁️ {}\n", day.condition.text));
        out.push_str(&format!(
            "🌧️ Rain: {}% | ❄️ Snow: {}%\n\n",
            day.daily_chance_of_rain, day.daily_chance_of_snow
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "location": {"name": "London", "region": "City of London, Greater London", "country": "United Kingdom", "localtime": "2024-05-01 12:00"},
        "current": {
            "temp_c": 14.0, "temp_f": 57.2, "feelslike_c": 13.1, "feelslike_f": 55.6,
            "condition": {"text": "Partly cloudy"},
            "wind_kph": 11.2, "wind_mph": 6.9, "wind_dir": "WSW",
            "humidity": 72, "vis_km": 10.0, "vis_miles": 6.0, "uv": 4.0,
            "air_quality": {"co": 230.3, "no2": 13.5, "o3": null}
        },
        "forecast": {"forecastday": [
            {"date": "2024-05-01",
             "day": {"maxtemp_c": 16.2, "maxtemp_f": 61.2, "mintemp_c": 9.1, "mintemp_f": 48.4,
                     "condition": {"text": "Patchy rain nearby"},
                     "daily_chance_of_rain": 86, "daily_chance_of_snow": 0},
             "astro": {"sunrise": "05:32 AM", "sunset": "08:22 PM"}},
            {"date": "2024-05-02",
             "day": {"maxtemp_c": 18.0, "maxtemp_f": 64.4, "mintemp_c": 10.0, "mintemp_f": 50.0,
                     "condition": {"text": "Sunny"},
                     "daily_chance_of_rain": 0, "daily_chance_of_snow": 0},
             "astro": {"sunrise": "05:30 AM", "sunset": "08:24 PM"}}
        ]},
        "alerts": {"alert": [{"headline": "Wind warning"}, {"headline": "Flood watch"}, {"headline": "Third"}]}
    }"#;

    #[test]
    fn test_format_current() {
        let data: Forecast = serde_json::from_str(FIXTURE).unwrap();
        let text = format_current(&data);
        assert!(text.starts_with("🌤️ **Weather for London, City of London, Greater London, United Kingdom**"));
        assert!(text.contains("🌡️ **Temperature:** 14°C (57.2°F)"));
        assert!(text.contains("💧 **Humidity:** 72%"));
        assert!(text.contains("O3: N/A"));
        assert!(text.contains("🌧️ **Chance of rain:** 86%"));
        assert!(text.contains("• Flood watch"));
        assert!(!text.contains("Third"));
    }

    #[test]
    fn test_format_forecast() {
        let data: Forecast = serde_json::from_str(FIXTURE).unwrap();
        let text = format_forecast(&data, 2);
        assert!(text.starts_with("📅 **2-Day Forecast for London"));
        assert!(text.contains("**2024-05-02**"));
        assert!(text.contains("☁️ Sunny"));
    }

    #[test]
    fn test_missing_alerts_ok() {
        let mut value: serde_json::Value = serde_json::from_str(FIXTURE).unwrap();
        value.as_object_mut().unwrap().remove("alerts");
        let data: Forecast = serde_json::from_value(value).unwrap();
        assert!(!format_current(&data).contains("Weather Alerts"));
    }
}
