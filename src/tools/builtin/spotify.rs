use crate::services::spotify::{format_track, SpotifyClient};
use crate::tools::{Tool, ToolError};
use async_trait::async_trait;

pub struct SpotifySearchTool {
    client: SpotifyClient,
}

impl SpotifySearchTool {
    pub fn new(client: SpotifyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for SpotifySearchTool {
    fn directive(&self) -> &'static str {
        "SPOTIFY_SEARCH"
    }

    fn description(&self) -> &str {
        "Find songs on Spotify"
    }

    fn usage(&self) -> &str {
        "<song, artist or album>"
    }

    async fn execute(&self, argument: &str) -> Result<String, ToolError> {
        let tracks = self.client.search_tracks(argument, 5).await?;
        if tracks.is_empty() {
            return Ok(format!("🎵 No Spotify tracks found for \"{}\".", argument));
        }

        let list = tracks.iter().map(format_track).collect::<Vec<_>>().join("\n");
        Ok(format!("🎵 **Spotify results for \"{}\":**\n{}", argument, list))
    }
}
