use crate::commands::{error_embed, COLOR_BLUE, COLOR_GREEN};
use crate::db::GuildSettingsUpdate;
use crate::{Context, Error};
use poise::serenity_prelude as serenity;
use tracing::{error, info};

/// Configure Gork for this server
#[poise::command(
    slash_command,
    subcommands("random_messages", "bot_reply", "reply_all"),
    required_permissions = "ADMINISTRATOR",
    guild_only
)]
pub async fn gorksettings(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

fn status_word(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

async fn update_guild(ctx: &Context<'_>, update: GuildSettingsUpdate) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?.to_string();
    ctx.data()
        .db
        .run_blocking(move |db| db.update_guild_settings(&guild_id, &update))
        .await?;
    Ok(())
}

/// Toggle Gork's random message generation
#[poise::command(slash_command, required_permissions = "ADMINISTRATOR", guild_only)]
pub async fn random_messages(
    ctx: Context<'_>,
    #[description = "Enable (True) or disable (False) random messages"]
    enabled: bool,
) -> Result<(), Error> {
    let update = GuildSettingsUpdate {
        guild_name: ctx.guild().map(|g| g.name.clone()),
        random_messages_enabled: Some(enabled),
        ..Default::default()
    };

    let embed = match update_guild(&ctx, update).await {
        Ok(()) => {
            info!("Random messages {} in guild {:?}", status_word(enabled), ctx.guild_id());
            let chance = (ctx.data().config.random_message_chance * 100.0).round();
            let mut embed = serenity::CreateEmbed::new()
                .title("✅ Gork Settings Updated")
                .description(format!(
                    "Random messages have been **{}** for this server.\n\n\
                     When enabled, any message sent in this server has a {}% chance to make Gork \
                     chime in with the most likely next message for the channel.",
                    status_word(enabled),
                    chance
                ))
                .color(COLOR_GREEN);
            if enabled {
                embed = embed
                    .field(
                        "📝 How it works",
                        format!(
                            "• {}% chance to trigger on any message\n\
                             • Bot analyzes recent channel messages\n\
                             • Generates contextually appropriate response\n\
                             • Only works in channels where bot can see message history",
                            chance
                        ),
                        false,
                    )
                    .field(
                        "⚠️ Note",
                        "Gork only remembers channel messages it has seen since it started, \
                         so a fresh start may take a while to build up context.",
                        false,
                    );
            }
            embed
        }
        Err(e) => {
            error!("Failed to update random_messages: {}", e);
            error_embed("❌ Error", format!("An unexpected error occurred: {}", e))
        }
    };

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Toggle Gork's replies to other bots
#[poise::command(slash_command, required_permissions = "ADMINISTRATOR", guild_only)]
pub async fn bot_reply(
    ctx: Context<'_>,
    #[description = "Enable (True) or disable (False) Gork replying to other bots"]
    enabled: bool,
) -> Result<(), Error> {
    let update = GuildSettingsUpdate {
        guild_name: ctx.guild().map(|g| g.name.clone()),
        bot_reply_enabled: Some(enabled),
        ..Default::default()
    };

    let embed = match update_guild(&ctx, update).await {
        Ok(()) => serenity::CreateEmbed::new()
            .title("✅ Gork Settings Updated")
            .description(format!(
                "Gork's replies to other bots have been **{}** for this server.",
                status_word(enabled)
            ))
            .color(COLOR_GREEN),
        Err(e) => {
            error!("Failed to update bot_reply: {}", e);
            error_embed("❌ Error", format!("An unexpected error occurred: {}", e))
        }
    };

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Toggle Gork replying to all messages in the current channel
#[poise::command(slash_command, required_permissions = "ADMINISTRATOR", guild_only)]
pub async fn reply_all(
    ctx: Context<'_>,
    #[description = "Enable (True) or disable (False) Gork replying to all messages in this channel"]
    enabled: bool,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?.to_string();
    let channel_id = ctx.channel_id().to_string();

    let result = ctx
        .data()
        .db
        .run_blocking(move |db| db.set_channel_reply_all(&channel_id, &guild_id, enabled))
        .await;

    let embed = match result {
        Ok(()) => {
            let mut embed = serenity::CreateEmbed::new()
                .title("✅ Gork Settings Updated")
                .description(format!(
                    "Gork will now reply to all messages (not just mentions/DMs) in this channel: **{}**.",
                    status_word(enabled)
                ))
                .color(COLOR_GREEN);
            if enabled {
                embed = embed.field(
                    "⚠️ Warning",
                    "Enabling 'Reply All' can make Gork very chatty and may lead to high API usage. \
                     Consider using this setting carefully.",
                    false,
                );
            }
            embed
        }
        Err(e) => {
            error!("Failed to update reply_all: {}", e);
            error_embed("❌ Error", format!("An unexpected error occurred: {}", e))
        }
    };

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// View current server and channel settings
#[poise::command(slash_command, guild_only)]
pub async fn server_status(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?;
    let guild_name = ctx
        .guild()
        .map(|g| g.name.clone())
        .unwrap_or_else(|| "this server".to_string());

    let gid = guild_id.to_string();
    let cid = ctx.channel_id().to_string();
    let (guild, channel) = ctx
        .data()
        .db
        .run_blocking(move |db| Ok((db.get_guild_settings(&gid)?, db.get_channel_settings(&cid)?)))
        .await?;

    let on_off = |enabled: bool, on: &'static str| if enabled { on } else { "❌ Disabled" };
    let mut embed = serenity::CreateEmbed::new()
        .title("⚙️ Server Settings")
        .description(format!("Current settings for **{}**", guild_name))
        .field(
            "Random Messages (Server)",
            on_off(guild.random_messages_enabled, "🎲 Enabled"),
            true,
        )
        .field("Reply to Bots (Server)", on_off(guild.bot_reply_enabled, "🤖 Enabled"), true)
        .field(
            "Reply to All Messages (Current Channel)",
            on_off(channel.reply_all_enabled, "💬 Enabled"),
            true,
        )
        .color(COLOR_BLUE);

    if guild.random_messages_enabled {
        embed = embed.field(
            "📊 Random Message Info",
            format!(
                "• {}% chance per message\n• Uses channel message history\n• Generates contextual responses",
                (ctx.data().config.random_message_chance * 100.0).round()
            ),
            false,
        );
    }

    embed = embed
        .field(
            "🔧 Configuration",
            "Use `/gorksettings random_messages enabled:True/False` to toggle random messages (server-wide)\n\
             Use `/gorksettings bot_reply enabled:True/False` to toggle replying to bots (server-wide)\n\
             Use `/gorksettings reply_all enabled:True/False` to toggle replying to all messages (current channel)\n\
             (Administrator permission required)",
            false,
        )
        .footer(serenity::CreateEmbedFooter::new(format!("Guild ID: {}", guild_id)));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
