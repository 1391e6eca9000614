use crate::content_filter::FilterLevel;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentInfo {
    pub filename: String,
    pub size: u32,
    pub content_type: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewUserMessage {
    pub user_id: String,
    pub username: String,
    pub user_display_name: Option<String>,
    pub channel_id: String,
    pub channel_name: Option<String>,
    pub guild_id: Option<String>,
    pub guild_name: Option<String>,
    pub message_id: String,
    pub content: String,
    pub attachments: Vec<AttachmentInfo>,
    /// Unix seconds
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default)]
pub struct NewBotResponse {
    pub original_message_id: String,
    pub response_message_id: String,
    pub content: String,
    pub response_chunks: usize,
    /// 1-based
    pub chunk_number: usize,
    pub processing_time_ms: Option<i64>,
    pub model_used: Option<String>,
    pub tokens_used: Option<u32>,
    pub timestamp: i64,
}

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub message_id: String,
    pub content: String,
    pub timestamp: String,
    pub response_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: String,
    pub has_attachments: bool,
    pub model_used: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChannelMessage {
    pub message_id: String,
    pub user_id: String,
    pub username: String,
    pub content: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationStats {
    pub total_messages: i64,
    pub total_responses: i64,
    /// Only computed for unfiltered stats
    pub unique_users: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct UserSettings {
    pub user_id: String,
    pub username: Option<String>,
    pub nsfw_mode: bool,
    pub content_filter_level: FilterLevel,
    pub steam_id: Option<String>,
    pub steam_username: Option<String>,
    pub updated_at: Option<String>,
}

/// Partial update; `None` fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct UserSettingsUpdate {
    pub username: Option<String>,
    pub user_display_name: Option<String>,
    pub nsfw_mode: Option<bool>,
    pub content_filter_level: Option<FilterLevel>,
    pub steam_id: Option<String>,
    pub steam_username: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuildSettings {
    pub random_messages_enabled: bool,
    pub bot_reply_enabled: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GuildSettingsUpdate {
    pub guild_name: Option<String>,
    pub random_messages_enabled: Option<bool>,
    pub bot_reply_enabled: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelSettings {
    pub reply_all_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct UserSummary {
    pub user_id: String,
    pub summary: String,
    pub model_used: Option<String>,
    pub message_count: i64,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SteamLinkCheck {
    Available,
    LinkedToOtherUser(String),
}
