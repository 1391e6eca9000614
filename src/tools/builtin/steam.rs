use crate::db::Database;
use crate::services::steam::{format_price, persona_state_name, OwnedGame, PlayerSummary, SteamClient};
use crate::tools::{Tool, ToolError};
use async_trait::async_trait;

const MAX_STORE_RESULTS: usize = 5;
const MAX_TOP_GAMES: usize = 5;

pub struct SteamSearchTool {
    client: SteamClient,
}

impl SteamSearchTool {
    pub fn new(client: SteamClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for SteamSearchTool {
    fn directive(&self) -> &'static str {
        "STEAM_SEARCH"
    }

    fn description(&self) -> &str {
        "Search the Steam store for games and prices"
    }

    fn usage(&self) -> &str {
        "<game name>"
    }

    async fn execute(&self, argument: &str) -> Result<String, ToolError> {
        let items = self.client.search_store(argument, MAX_STORE_RESULTS).await?;
        if items.is_empty() {
            return Ok(format!("🎮 No Steam games found for \"{}\".", argument));
        }

        let mut out = format!("🎮 **Steam results for \"{}\":**\n", argument);
        for (i, item) in items.iter().enumerate() {
            out.push_str(&format!(
                "{}. **{}** ({})\n   <https://store.steampowered.com/app/{}>\n",
                i + 1,
                item.name,
                format_price(item.price.as_ref()),
                item.id
            ));
        }
        Ok(out)
    }
}

/// Steam profile of a Discord user who linked their account with `/link_steam`.
pub struct SteamUserTool {
    client: SteamClient,
    db: Database,
}

impl SteamUserTool {
    pub fn new(client: SteamClient, db: Database) -> Self {
        Self { client, db }
    }
}

/// Accepts `123`, `<@123>` or `<@!123>`.
pub fn parse_discord_user_id(input: &str) -> Option<u64> {
    let trimmed = input
        .trim()
        .trim_start_matches("<@")
        .trim_start_matches('!')
        .trim_end_matches('>');
    trimmed.parse().ok()
}

fn format_profile(summary: &PlayerSummary, games: &[OwnedGame]) -> String {
    let mut out = format!("🎮 **Steam profile: {}**\n", summary.personaname);
    out.push_str(&format!("Status: {}\n", persona_state_name(summary.personastate)));
    if let Some(game) = &summary.gameextrainfo {
        out.push_str(&format!("Currently playing: {}\n", game));
    }
    if !summary.profileurl.is_empty() {
        out.push_str(&format!("<{}>\n", summary.profileurl));
    }

    if summary.communityvisibilitystate != 3 {
        out.push_str("Game library is private.\n");
    } else if games.is_empty() {
        out.push_str("No games found.\n");
    } else {
        out.push_str(&format!("\n**Top games** ({} owned):\n", games.len()));
        for game in games.iter().take(MAX_TOP_GAMES) {
            let name = game.name.as_deref().unwrap_or("Unknown game");
            out.push_str(&format!(
                "• {} ({:.1} hrs)\n",
                name,
                game.playtime_forever as f64 / 60.0
            ));
        }
    }
    out
}

#[async_trait]
impl Tool for SteamUserTool {
    fn directive(&self) -> &'static str {
        "STEAM_USER"
    }

    fn description(&self) -> &str {
        "Steam profile and most played games of a Discord user with a linked Steam account"
    }

    fn usage(&self) -> &str {
        "<discord user id or mention>"
    }

    async fn execute(&self, argument: &str) -> Result<String, ToolError> {
        let user_id = parse_discord_user_id(argument)
            .ok_or_else(|| ToolError::Parse(format!("'{}' is not a Discord user id", argument)))?;

        let settings = self
            .db
            .run_blocking(move |db| db.get_user_settings(&user_id.to_string()))
            .await?;
        let Some(steam_id) = settings.steam_id else {
            return Ok(format!(
                "<@{}> has not linked a Steam account. They can use `/link_steam` to do so.",
                user_id
            ));
        };

        let summary = self
            .client
            .get_player_summary(&steam_id)
            .await?
            .ok_or_else(|| ToolError::Parse(format!("No Steam profile found for {}", steam_id)))?;
        let games = if summary.communityvisibilitystate == 3 {
            self.client.get_owned_games(&steam_id).await?
        } else {
            Vec::new()
        };

        Ok(format_profile(&summary, &games))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_discord_user_id() {
        assert_eq!(parse_discord_user_id("123"), Some(123));
        assert_eq!(parse_discord_user_id("<@123>"), Some(123));
        assert_eq!(parse_discord_user_id(" <@!123> "), Some(123));
        assert_eq!(parse_discord_user_id("someone"), None);
    }

    #[test]
    fn test_format_profile() {
        let summary = PlayerSummary {
            steamid: "76561197960287930".into(),
            personaname: "gabe".into(),
            profileurl: "https://steamcommunity.com/id/gabe/".into(),
            personastate: 1,
            communityvisibilitystate: 3,
            gameextrainfo: Some("Half-Life".into()),
        };
        let games = vec![
            OwnedGame { appid: 70, name: Some("Half-Life".into()), playtime_forever: 90 },
            OwnedGame { appid: 220, name: None, playtime_forever: 30 },
        ];
        let text = format_profile(&summary, &games);
        assert!(text.contains("**Steam profile: gabe**"));
        assert!(text.contains("Status: Online"));
        assert!(text.contains("• Half-Life (1.5 hrs)"));
        assert!(text.contains("• Unknown game (0.5 hrs)"));

        let private = PlayerSummary { communityvisibilitystate: 1, ..summary };
        assert!(format_profile(&private, &[]).contains("Game library is private."));
    }

    #[tokio::test]
    async fn test_unlinked_user() {
        let db = Database::open(":memory:").unwrap();
        db.execute_init().unwrap();
        let tool = SteamUserTool::new(SteamClient::new(reqwest::Client::new(), Some("k".into())), db);
        let out = tool.execute("<@42>").await.unwrap();
        assert!(out.contains("has not linked a Steam account"));
    }
}
