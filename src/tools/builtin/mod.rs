pub mod command;
pub mod spotify;
pub mod steam;
pub mod weather;
pub mod web_search;
pub mod website;

use crate::config::Config;
use crate::db::Database;
use crate::services::{SpotifyClient, SteamClient, WeatherClient};
use crate::tools::ToolRegistry;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Registers every tool whose credentials are present.
pub fn register_builtin_tools(
    registry: &mut ToolRegistry,
    config: &Config,
    http: &Client,
    db: &Database,
    steam: &SteamClient,
    weather: Option<&WeatherClient>,
) -> anyhow::Result<()> {
    registry.register(Arc::new(command::SafeCommandTool::new(
        config.tools.safe_commands.clone(),
        Duration::from_secs(config.tools.command_timeout_secs),
    )))?;

    if let Some(key) = &config.searchapi_key {
        registry.register(Arc::new(web_search::WebSearchTool::new(http.clone(), key.clone())))?;
    }

    registry.register(Arc::new(website::VisitWebsiteTool::new(http.clone())))?;

    if let Some(client) = weather {
        registry.register(Arc::new(weather::WeatherTool::new(client.clone())))?;
    }

    registry.register(Arc::new(steam::SteamSearchTool::new(steam.clone())))?;
    if steam.has_api_key() {
        registry.register(Arc::new(steam::SteamUserTool::new(steam.clone(), db.clone())))?;
    }

    if let (Some(id), Some(secret)) = (&config.spotify_client_id, &config.spotify_client_secret) {
        let client = SpotifyClient::new(http.clone(), id.clone(), secret.clone());
        registry.register(Arc::new(spotify::SpotifySearchTool::new(client)))?;
    }

    let names: Vec<&str> = registry.list_tools().iter().map(|t| t.directive()).collect();
    info!("Registered tools: {}", names.join(", "));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[test]
    fn test_unconfigured_tools_skipped() {
        let config = test_config();
        let db = Database::open(":memory:").unwrap();
        let http = Client::new();
        let steam = SteamClient::new(http.clone(), None);
        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry, &config, &http, &db, &steam, None).unwrap();

        let names: Vec<&str> = registry.list_tools().iter().map(|t| t.directive()).collect();
        assert_eq!(names, vec!["EXECUTE_COMMAND", "VISIT_WEBSITE", "STEAM_SEARCH"]);
    }
}
