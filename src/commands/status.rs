use crate::commands::{ephemeral, error_embed, COLOR_BLUE, COLOR_GREEN};
use crate::{Context, Error};
use poise::serenity_prelude as serenity;
use poise::ChoiceParameter;
use std::sync::{Mutex, PoisonError};
use tracing::info;

const MAX_STATUS_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum ActivityKind {
    Playing,
    Listening,
    Watching,
    Streaming,
    Custom,
    Competing,
}

impl ActivityKind {
    pub fn to_activity(self, text: &str, url: Option<&str>) -> Result<serenity::ActivityData, String> {
        Ok(match self {
            ActivityKind::Playing => serenity::ActivityData::playing(text),
            ActivityKind::Listening => serenity::ActivityData::listening(text),
            ActivityKind::Watching => serenity::ActivityData::watching(text),
            ActivityKind::Competing => serenity::ActivityData::competing(text),
            ActivityKind::Custom => serenity::ActivityData::custom(text),
            ActivityKind::Streaming => {
                let url = url.ok_or_else(|| "URL is required for streaming status.".to_string())?;
                serenity::ActivityData::streaming(text, url).map_err(|e| format!("Invalid stream URL: {}", e))?
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceInfo {
    pub kind: ActivityKind,
    pub text: String,
    pub url: Option<String>,
}

/// What the bot last set as its activity. The gateway does not echo our
/// own presence back, so it is tracked here.
#[derive(Default)]
pub struct PresenceState(Mutex<Option<PresenceInfo>>);

impl PresenceState {
    pub fn set(&self, info: Option<PresenceInfo>) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = info;
    }

    pub fn get(&self) -> Option<PresenceInfo> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn describe(&self) -> String {
        match self.get() {
            Some(p) => {
                let mut out = format!("{}: {}", p.kind.name(), p.text);
                if let Some(url) = p.url {
                    out.push_str(&format!("\nURL: {}", url));
                }
                out
            }
            None => "None".to_string(),
        }
    }
}

fn validate_text(text: &str) -> Result<(), &'static str> {
    if text.chars().count() > MAX_STATUS_LEN {
        Err("Status text must be 128 characters or less.")
    } else {
        Ok(())
    }
}

/// Set the bot's custom status (Owner only)
#[poise::command(slash_command, owners_only, hide_in_help)]
pub async fn setstatus(
    ctx: Context<'_>,
    #[description = "Type of status to set"]
    #[rename = "type"]
    kind: ActivityKind,
    #[description = "The status text to display"]
    text: String,
    #[description = "URL for streaming status (only used if type is 'streaming')"]
    url: Option<String>,
) -> Result<(), Error> {
    if let Err(msg) = validate_text(&text) {
        ctx.send(ephemeral(error_embed("❌ Error", msg))).await?;
        return Ok(());
    }

    let activity = match kind.to_activity(&text, url.as_deref()) {
        Ok(activity) => activity,
        Err(msg) => {
            ctx.send(ephemeral(error_embed("❌ Error", msg))).await?;
            return Ok(());
        }
    };

    ctx.serenity_context().set_activity(Some(activity));
    let url = if kind == ActivityKind::Streaming { url } else { None };
    ctx.data().presence.set(Some(PresenceInfo {
        kind,
        text: text.clone(),
        url: url.clone(),
    }));
    info!("Status set by {}: {} {}", ctx.author().name, kind.name(), text);

    let mut embed = serenity::CreateEmbed::new()
        .title("✅ Status Updated")
        .description(format!("Bot status has been set to: **{}** {}", kind.name(), text))
        .color(COLOR_GREEN);
    if let Some(url) = url {
        embed = embed.field("Stream URL", url, false);
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Clear the bot's custom status (Owner only)
#[poise::command(slash_command, owners_only, hide_in_help)]
pub async fn clearstatus(ctx: Context<'_>) -> Result<(), Error> {
    ctx.serenity_context().set_activity(None);
    ctx.data().presence.set(None);
    info!("Status cleared by {}", ctx.author().name);

    let embed = serenity::CreateEmbed::new()
        .title("✅ Status Cleared")
        .description("Bot status has been cleared.")
        .color(COLOR_GREEN);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show current bot status (Owner only)
#[poise::command(slash_command, owners_only, hide_in_help)]
pub async fn statusinfo(ctx: Context<'_>) -> Result<(), Error> {
    let owner = ctx
        .data()
        .config
        .owner_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "Not configured".to_string());

    let embed = serenity::CreateEmbed::new()
        .title("🤖 Bot Status Information")
        .field("Current Status", ctx.data().presence.describe(), false)
        .field("Owner ID", owner, false)
        .field(
            "Available Commands",
            "• `/setstatus` - Set bot status\n• `/clearstatus` - Clear bot status\n• `/statusinfo` - Show this info",
            false,
        )
        .color(COLOR_BLUE);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text_length() {
        assert!(validate_text(&"a".repeat(128)).is_ok());
        assert!(validate_text(&"a".repeat(129)).is_err());
        // Counted in characters, not bytes
        assert!(validate_text(&"é".repeat(128)).is_ok());
    }

    #[test]
    fn test_streaming_needs_url() {
        assert!(ActivityKind::Streaming.to_activity("live", None).is_err());
        assert!(ActivityKind::Streaming
            .to_activity("live", Some("https://twitch.tv/someone"))
            .is_ok());
        assert!(ActivityKind::Playing.to_activity("chess", None).is_ok());
    }

    #[test]
    fn test_presence_description() {
        let state = PresenceState::default();
        assert_eq!(state.describe(), "None");
        state.set(Some(PresenceInfo {
            kind: ActivityKind::Streaming,
            text: "coding".into(),
            url: Some("https://twitch.tv/someone".into()),
        }));
        assert_eq!(state.describe(), "Streaming: coding\nURL: https://twitch.tv/someone");
        state.set(None);
        assert_eq!(state.describe(), "None");
    }
}
