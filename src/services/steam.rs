use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

const STEAM_API_BASE: &str = "https://api.steampowered.com";
const STEAM_STORE_SEARCH: &str = "https://store.steampowered.com/api/storesearch/";

/// Steam Web API (profile data, needs a key) and the public store search.
#[derive(Clone)]
pub struct SteamClient {
    http: Client,
    api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreItem {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub price: Option<StorePrice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorePrice {
    pub currency: String,
    #[serde(rename = "final")]
    pub final_cents: u64,
    #[serde(default)]
    pub initial: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerSummary {
    pub steamid: String,
    pub personaname: String,
    #[serde(default)]
    pub profileurl: String,
    #[serde(default)]
    pub personastate: u8,
    #[serde(default)]
    pub communityvisibilitystate: u8,
    #[serde(default)]
    pub gameextrainfo: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwnedGame {
    pub appid: u64,
    #[serde(default)]
    pub name: Option<String>,
    /// Minutes.
    #[serde(default)]
    pub playtime_forever: u64,
}

#[derive(Deserialize)]
struct Envelope<T> {
    response: T,
}

#[derive(Deserialize)]
struct VanityResponse {
    success: u8,
    steamid: Option<String>,
}

#[derive(Deserialize)]
struct PlayersResponse {
    #[serde(default)]
    players: Vec<PlayerSummary>,
}

#[derive(Deserialize)]
struct OwnedGamesResponse {
    #[serde(default)]
    games: Vec<OwnedGame>,
}

#[derive(Deserialize)]
struct StoreSearchResponse {
    #[serde(default)]
    items: Vec<StoreItem>,
}

impl SteamClient {
    pub fn new(http: Client, api_key: Option<String>) -> Self {
        Self { http, api_key }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn key(&self) -> anyhow::Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Steam Web API key (STEAM_WEB) not configured"))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> anyhow::Result<T> {
        let response = self.http.get(url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("Steam API returned HTTP {}", status.as_u16()));
        }
        Ok(response.json::<T>().await?)
    }

    /// Custom profile URL name to a 64-bit Steam ID. `None` when no such profile exists.
    pub async fn resolve_vanity_url(&self, vanity: &str) -> anyhow::Result<Option<String>> {
        let url = format!("{}/ISteamUser/ResolveVanityURL/v0001/", STEAM_API_BASE);
        let body: Envelope<VanityResponse> = self
            .get_json(&url, &[("key", self.key()?), ("vanityurl", vanity)])
            .await?;

        if body.response.success == 1 {
            Ok(body.response.steamid)
        } else {
            warn!("Steam: could not resolve vanity URL '{}'", vanity);
            Ok(None)
        }
    }

    pub async fn get_player_summary(&self, steam_id: &str) -> anyhow::Result<Option<PlayerSummary>> {
        let url = format!("{}/ISteamUser/GetPlayerSummaries/v0002/", STEAM_API_BASE);
        let body: Envelope<PlayersResponse> = self
            .get_json(&url, &[("key", self.key()?), ("steamids", steam_id)])
            .await?;
        Ok(body.response.players.into_iter().next())
    }

    /// Owned games, most played first. Private profiles return an empty list.
    pub async fn get_owned_games(&self, steam_id: &str) -> anyhow::Result<Vec<OwnedGame>> {
        let url = format!("{}/IPlayerService/GetOwnedGames/v0001/", STEAM_API_BASE);
        let body: Envelope<OwnedGamesResponse> = self
            .get_json(
                &url,
                &[
                    ("key", self.key()?),
                    ("steamid", steam_id),
                    ("include_appinfo", "1"),
                    ("include_played_free_games", "1"),
                ],
            )
            .await?;

        let mut games = body.response.games;
        games.sort_by(|a, b| b.playtime_forever.cmp(&a.playtime_forever));
        Ok(games)
    }

    pub async fn search_store(&self, term: &str, limit: usize) -> anyhow::Result<Vec<StoreItem>> {
        debug!("Steam: store search for {}", term);
        let body: StoreSearchResponse = self
            .get_json(STEAM_STORE_SEARCH, &[("term", term), ("l", "english"), ("cc", "US")])
            .await?;
        Ok(body.items.into_iter().take(limit).collect())
    }
}

/// A raw Steam ID is a 17-digit number.
pub fn is_valid_steam_id(id: &str) -> bool {
    id.len() == 17 && id.chars().all(|c| c.is_ascii_digit())
}

pub fn persona_state_name(state: u8) -> &'static str {
    match state {
        0 => "Offline",
        1 => "Online",
        2 => "Busy",
        3 => "Away",
        4 => "Snooze",
        5 => "Looking to trade",
        6 => "Looking to play",
        _ => "Unknown",
    }
}

pub fn format_price(price: Option<&StorePrice>) -> String {
    match price {
        None => "Free".to_string(),
        Some(p) if p.final_cents == 0 => "Free".to_string(),
        Some(p) => {
            let amount = format!("{}.{:02} {}", p.final_cents / 100, p.final_cents % 100, p.currency);
            if p.initial > p.final_cents {
                let off = 100 - (p.final_cents * 100 / p.initial);
                format!("{} (-{}%)", amount, off)
            } else {
                amount
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steam_id_validation() {
        assert!(is_valid_steam_id("76561197960287930"));
        assert!(!is_valid_steam_id("7656119796028793"));
        assert!(!is_valid_steam_id("7656119796028793a"));
    }

    #[test]
    fn test_store_item_parsing_and_price() {
        let body: StoreSearchResponse = serde_json::from_str(
            r#"{"total": 2, "items": [
                {"type": "app", "name": "Portal 2", "id": 620, "price": {"currency": "USD", "initial": 999, "final": 199}},
                {"type": "app", "name": "Dota 2", "id": 570}
            ]}"#,
        )
        .unwrap();
        assert_eq!(body.items.len(), 2);
        assert_eq!(format_price(body.items[0].price.as_ref()), "1.99 USD (-80%)");
        assert_eq!(format_price(body.items[1].price.as_ref()), "Free");
    }

    #[test]
    fn test_vanity_parsing() {
        let ok: Envelope<VanityResponse> =
            serde_json::from_str(r#"{"response": {"steamid": "76561197960287930", "success": 1}}"#).unwrap();
        assert_eq!(ok.response.steamid.as_deref(), Some("76561197960287930"));

        let missing: Envelope<VanityResponse> =
            serde_json::from_str(r#"{"response": {"success": 42, "message": "No match"}}"#).unwrap();
        assert_eq!(missing.response.success, 42);
        assert!(missing.response.steamid.is_none());
    }

    #[tokio::test]
    async fn test_profile_calls_need_key() {
        let client = SteamClient::new(Client::new(), None);
        let err = client.get_player_summary("76561197960287930").await.unwrap_err();
        assert!(err.to_string().contains("STEAM_WEB"));
    }
}
