use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::fs;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Programs the EXECUTE_COMMAND directive may run
    pub safe_commands: Vec<String>,
    pub command_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            safe_commands: DEFAULT_SAFE_COMMANDS.iter().map(|c| c.to_string()).collect(),
            command_timeout_secs: 10,
        }
    }
}

const DEFAULT_SAFE_COMMANDS: &[&str] = &[
    "uptime", "date", "whoami", "uname", "df", "free", "hostname", "ps",
];

#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    pub owner_id: Option<u64>,
    pub openrouter_api_key: Option<String>,
    pub openrouter_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub llm_timeout_secs: u64,
    pub database_url: String,
    pub status_message: String,
    // Context settings
    pub context_message_limit: usize,
    pub channel_cache_channels: usize,
    pub channel_cache_messages: usize,
    pub random_message_chance: f64,
    // Maintenance
    pub message_retention_days: u64,
    pub cleanup_interval: Duration,
    pub user_summary_max_age_hours: i64,
    // External tool credentials
    pub searchapi_key: Option<String>,
    pub weatherapi_key: Option<String>,
    pub steam_web_key: Option<String>,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub transcription_url: Option<String>,
    pub transcription_model: String,
    pub transcription_api_key: Option<String>,
    pub tools: ToolsConfig,
}

pub const DEFAULT_MODEL: &str = "google/gemini-2.0-flash-001";

const MAX_CLEANUP_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);
const MAX_SUMMARY_AGE_HOURS: i64 = 10 * 365 * 24;

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::from_filename("ai.env").ok();
        dotenv().ok();
        Self::build()
    }

    fn build() -> anyhow::Result<Self> {
        Ok(Config {
            discord_token: env::var("DISCORD_TOKEN")
                .map_err(|_| anyhow::anyhow!("Missing DISCORD_TOKEN environment variable"))?,
            owner_id: env::var("OWNER_ID").ok().and_then(|id| id.parse().ok()),
            openrouter_api_key: non_empty_var("OPENROUTER_API_KEY"),
            openrouter_url: env::var("OPENROUTER_URL")
                .unwrap_or_else(|_| "https://openrouter.ai/api/v1".to_string()),
            model: env::var("OPENROUTER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            max_tokens: parse_var("MAX_TOKENS", 1000),
            temperature: parse_var_checked("TEMPERATURE", 0.7, |t: &f32| t.is_finite()),
            llm_timeout_secs: parse_var("LLM_TIMEOUT_SECS", 120),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "data/bot_messages.db".to_string()),
            status_message: env::var("STATUS_MESSAGE")
                .unwrap_or_else(|_| "Mention me to chat!".to_string()),
            context_message_limit: parse_var("CONTEXT_MESSAGE_LIMIT", 20),
            channel_cache_channels: parse_var("CHANNEL_CACHE_CHANNELS", 500),
            channel_cache_messages: parse_var("CHANNEL_CACHE_MESSAGES", 30),
            random_message_chance: parse_var_checked("RANDOM_MESSAGE_CHANCE", 0.4, |c: &f64| c.is_finite())
                .clamp(0.0, 1.0),
            message_retention_days: parse_var("MESSAGE_RETENTION_DAYS", 90),
            cleanup_interval: env::var("CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| humantime::parse_duration(&v).ok())
                .filter(|d| !d.is_zero() && *d <= MAX_CLEANUP_INTERVAL)
                .unwrap_or(Duration::from_secs(24 * 60 * 60)),
            user_summary_max_age_hours: parse_var_checked("USER_SUMMARY_MAX_AGE_HOURS", 24, |h: &i64| {
                (1..=MAX_SUMMARY_AGE_HOURS).contains(h)
            }),
            searchapi_key: non_empty_var("SEARCHAPI_KEY"),
            weatherapi_key: non_empty_var("WEATHERAPI_KEY")
                .filter(|k| k != "your_weatherapi_key_here"),
            steam_web_key: non_empty_var("STEAM_WEB"),
            spotify_client_id: non_empty_var("SPOTIFY_CLIENT_ID"),
            spotify_client_secret: non_empty_var("SPOTIFY_CLIENT_SECRET"),
            transcription_url: non_empty_var("TRANSCRIPTION_URL"),
            transcription_model: env::var("TRANSCRIPTION_MODEL")
                .unwrap_or_else(|_| "whisper-1".to_string()),
            transcription_api_key: non_empty_var("TRANSCRIPTION_API_KEY"),
            tools: Self::load_tools_config(),
        })
    }

    /// Reads the optional `[tools]` table from `gork.toml`.
    pub fn load_tools_config() -> ToolsConfig {
        #[derive(Deserialize)]
        struct GorkToml {
            #[serde(default)]
            tools: ToolsConfig,
        }

        let path = env::var("GORK_CONFIG").unwrap_or_else(|_| "gork.toml".to_string());
        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<GorkToml>(&content) {
                Ok(parsed) => parsed.tools,
                Err(e) => {
                    tracing::warn!("Ignoring malformed {}: {}", path, e);
                    ToolsConfig::default()
                }
            },
            Err(_) => ToolsConfig::default(),
        }
    }

    pub fn is_owner(&self, user_id: u64) -> bool {
        self.owner_id == Some(user_id)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Like `parse_var`, but parsed values rejected by `valid` also fall back to the default.
fn parse_var_checked<T: FromStr>(key: &str, default: T, valid: impl Fn(&T) -> bool) -> T {
    match env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok()) {
        Some(v) if valid(&v) => v,
        Some(_) => {
            tracing::warn!("Ignoring out-of-range {}, using the default", key);
            default
        }
        None => default,
    }
}

fn redact(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| "[REDACTED]")
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"[REDACTED]")
            .field("owner_id", &self.owner_id)
            .field("openrouter_api_key", &redact(&self.openrouter_api_key))
            .field("openrouter_url", &self.openrouter_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("llm_timeout_secs", &self.llm_timeout_secs)
            .field("database_url", &self.database_url)
            .field("status_message", &self.status_message)
            .field("context_message_limit", &self.context_message_limit)
            .field("channel_cache_channels", &self.channel_cache_channels)
            .field("channel_cache_messages", &self.channel_cache_messages)
            .field("random_message_chance", &self.random_message_chance)
            .field("message_retention_days", &self.message_retention_days)
            .field("cleanup_interval", &humantime::format_duration(self.cleanup_interval).to_string())
            .field("user_summary_max_age_hours", &self.user_summary_max_age_hours)
            .field("searchapi_key", &redact(&self.searchapi_key))
            .field("weatherapi_key", &redact(&self.weatherapi_key))
            .field("steam_web_key", &redact(&self.steam_web_key))
            .field("spotify_client_id", &self.spotify_client_id)
            .field("spotify_client_secret", &redact(&self.spotify_client_secret))
            .field("transcription_url", &self.transcription_url)
            .field("transcription_model", &self.transcription_model)
            .field("transcription_api_key", &redact(&self.transcription_api_key))
            .field("tools", &self.tools)
            .finish()
    }
}

/// Discord message limit is 2000 characters
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        discord_token: "test".to_string(),
        owner_id: Some(1),
        openrouter_api_key: None,
        openrouter_url: "http://localhost:1/v1".to_string(),
        model: DEFAULT_MODEL.to_string(),
        max_tokens: 1000,
        temperature: 0.7,
        llm_timeout_secs: 5,
        database_url: ":memory:".to_string(),
        status_message: "test".to_string(),
        context_message_limit: 20,
        channel_cache_channels: 10,
        channel_cache_messages: 5,
        random_message_chance: 0.4,
        message_retention_days: 90,
        cleanup_interval: Duration::from_secs(3600),
        user_summary_max_age_hours: 24,
        searchapi_key: None,
        weatherapi_key: None,
        steam_web_key: None,
        spotify_client_id: None,
        spotify_client_secret: None,
        transcription_url: None,
        transcription_model: "whisper-1".to_string(),
        transcription_api_key: None,
        tools: ToolsConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_logic() {
        // 1. Missing token
        env::remove_var("DISCORD_TOKEN");
        assert!(Config::build().is_err(), "Should fail without DISCORD_TOKEN");

        // 2. Defaults
        env::set_var("DISCORD_TOKEN", "test_token");
        env::remove_var("OPENROUTER_MODEL");
        env::remove_var("RANDOM_MESSAGE_CHANCE");
        let config = Config::build().unwrap();
        assert_eq!(config.discord_token, "test_token");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_tokens, 1000);
        assert!((config.random_message_chance - 0.4).abs() < f64::EPSILON);

        // 3. Out-of-range chance is clamped, humantime interval parsed
        env::set_var("RANDOM_MESSAGE_CHANCE", "7");
        env::set_var("CLEANUP_INTERVAL", "6h");
        let config = Config::build().unwrap();
        assert_eq!(config.random_message_chance, 1.0);
        assert_eq!(config.cleanup_interval, Duration::from_secs(6 * 3600));

        // 4. Debug redaction
        env::set_var("OPENROUTER_API_KEY", "secret_api_key");
        let debug_output = format!("{:?}", Config::build().unwrap());
        assert!(!debug_output.contains("test_token"));
        assert!(!debug_output.contains("secret_api_key"));
        assert!(debug_output.contains("[REDACTED]"));

        // 5. Values that would break the random roll or timers fall back to defaults
        for chance in ["nan", "NaN", "inf", "-inf"] {
            env::set_var("RANDOM_MESSAGE_CHANCE", chance);
            let config = Config::build().unwrap();
            assert!((config.random_message_chance - 0.4).abs() < f64::EPSILON, "{}", chance);
        }
        env::set_var("RANDOM_MESSAGE_CHANCE", "-0.5");
        assert_eq!(Config::build().unwrap().random_message_chance, 0.0);

        env::set_var("TEMPERATURE", "nan");
        assert!((Config::build().unwrap().temperature - 0.7).abs() < f32::EPSILON);

        for interval in ["0s", "0ms", "500years"] {
            env::set_var("CLEANUP_INTERVAL", interval);
            assert_eq!(Config::build().unwrap().cleanup_interval, Duration::from_secs(24 * 3600), "{}", interval);
        }

        for hours in ["9223372036854775807", "0", "-5"] {
            env::set_var("USER_SUMMARY_MAX_AGE_HOURS", hours);
            assert_eq!(Config::build().unwrap().user_summary_max_age_hours, 24, "{}", hours);
        }
        env::set_var("USER_SUMMARY_MAX_AGE_HOURS", "48");
        assert_eq!(Config::build().unwrap().user_summary_max_age_hours, 48);

        env::remove_var("DISCORD_TOKEN");
        env::remove_var("OPENROUTER_API_KEY");
        env::remove_var("RANDOM_MESSAGE_CHANCE");
        env::remove_var("CLEANUP_INTERVAL");
        env::remove_var("TEMPERATURE");
        env::remove_var("USER_SUMMARY_MAX_AGE_HOURS");
    }

    #[test]
    fn test_tools_config_toml() {
        #[derive(Deserialize)]
        struct GorkToml {
            #[serde(default)]
            tools: ToolsConfig,
        }

        let parsed: GorkToml = toml::from_str(
            "[tools]\nsafe_commands = [\"uptime\"]\n",
        )
        .unwrap();
        assert_eq!(parsed.tools.safe_commands, vec!["uptime".to_string()]);
        assert_eq!(parsed.tools.command_timeout_secs, 10);

        let empty: GorkToml = toml::from_str("").unwrap();
        assert!(empty.tools.safe_commands.contains(&"date".to_string()));
    }
}
