pub mod cache;
pub mod commands;
pub mod config;
pub mod content_filter;
pub mod context;
pub mod db;
pub mod discord_text;
pub mod handler;
pub mod llm;
pub mod respond;
pub mod services;
pub mod summarize;
pub mod system_prompt;
pub mod tools;

use std::sync::Arc;
use std::time::{Duration, Instant};

/// Custom data passed to all commands
pub struct Data {
    pub config: config::Config,
    pub llm_client: llm::LlmClient,
    pub db: db::Database,
    pub cache: cache::MessageCache,
    pub tools: Arc<tools::ToolRegistry>,
    pub weather: Option<services::WeatherClient>,
    pub steam: services::SteamClient,
    pub transcriber: Option<services::Transcriber>,
    /// Message ids currently being handled
    pub in_flight: handler::InFlight,
    pub presence: commands::status::PresenceState,
    pub started_at: Instant,
    /// Bot's own user ID for context formatting
    pub bot_id: u64,
}

impl Data {
    /// Wires up clients and tools. The database must already be initialized.
    pub fn new(config: config::Config, db: db::Database, bot_id: u64) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        let llm_client = llm::LlmClient::new(&config)?;
        let cache = cache::MessageCache::new(config.channel_cache_channels, config.channel_cache_messages);

        let weather = config
            .weatherapi_key
            .clone()
            .map(|key| services::WeatherClient::new(http.clone(), key));
        let steam = services::SteamClient::new(http.clone(), config.steam_web_key.clone());
        let transcriber = config.transcription_url.as_deref().map(|url| {
            services::Transcriber::new(
                http.clone(),
                url,
                config.transcription_model.clone(),
                config.transcription_api_key.clone(),
            )
        });

        let mut registry = tools::ToolRegistry::new();
        tools::builtin::register_builtin_tools(
            &mut registry,
            &config,
            &http,
            &db,
            &steam,
            weather.as_ref(),
        )?;

        Ok(Self {
            config,
            llm_client,
            db,
            cache,
            tools: Arc::new(registry),
            weather,
            steam,
            transcriber,
            in_flight: handler::InFlight::default(),
            presence: commands::status::PresenceState::default(),
            started_at: Instant::now(),
            bot_id,
        })
    }
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
