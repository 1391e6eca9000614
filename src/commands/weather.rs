use crate::services::weather::{format_current, format_forecast, MAX_FORECAST_DAYS};
use crate::{Context, Error};
use tracing::warn;

const NOT_CONFIGURED: &str = "❌ WeatherAPI key not configured";

/// Get current weather for a location
#[poise::command(slash_command)]
pub async fn weather(
    ctx: Context<'_>,
    #[description = "City name, zip code, or coordinates"]
    location: String,
) -> Result<(), Error> {
    let Some(client) = &ctx.data().weather else {
        ctx.say(NOT_CONFIGURED).await?;
        return Ok(());
    };
    ctx.defer().await?;

    match client.forecast(&location, 1).await {
        Ok(data) => {
            ctx.say(format_current(&data)).await?;
        }
        Err(e) => {
            warn!("Weather lookup for '{}' failed: {}", location, e);
            ctx.say(format!("❌ {}", e)).await?;
        }
    }
    Ok(())
}

/// Get a weather forecast for a location
#[poise::command(slash_command)]
pub async fn forecast(
    ctx: Context<'_>,
    #[description = "City name, zip code, or coordinates"]
    location: String,
    #[description = "Number of days to forecast (1-10, default: 3)"]
    #[min = 1]
    #[max = 10]
    days: Option<u8>,
) -> Result<(), Error> {
    let days = days.unwrap_or(3);
    if !(1..=MAX_FORECAST_DAYS).contains(&days) {
        ctx.say("❌ Days must be between 1 and 10.").await?;
        return Ok(());
    }
    let Some(client) = &ctx.data().weather else {
        ctx.say(NOT_CONFIGURED).await?;
        return Ok(());
    };
    ctx.defer().await?;

    match client.forecast(&location, days).await {
        Ok(data) => {
            ctx.say(format_forecast(&data, days)).await?;
        }
        Err(e) => {
            warn!("Forecast lookup for '{}' failed: {}", location, e);
            ctx.say(format!("❌ {}", e)).await?;
        }
    }
    Ok(())
}
