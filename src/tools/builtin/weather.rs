use crate::services::weather::{format_current, WeatherClient};
use crate::tools::{Tool, ToolError};
use async_trait::async_trait;

pub struct WeatherTool {
    client: WeatherClient,
}

impl WeatherTool {
    pub fn new(client: WeatherClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn directive(&self) -> &'static str {
        "GET_WEATHER"
    }

    fn description(&self) -> &str {
        "Current weather and today's forecast for a location"
    }

    fn usage(&self) -> &str {
        "<city or location>"
    }

    async fn execute(&self, argument: &str) -> Result<String, ToolError> {
        let data = self.client.forecast(argument, 1).await?;
        Ok(format_current(&data))
    }
}
