use crate::commands::{error_embed, ephemeral, COLOR_BLUE, COLOR_GREEN, COLOR_PURPLE};
use crate::db::{ConversationTurn, Role};
use crate::discord_text::{code_block_chunks, truncate_chars};
use crate::{Context, Error};
use chrono::NaiveDateTime;
use poise::serenity_prelude as serenity;
use tracing::{error, info};

const LOG_CHUNK_LIMIT: usize = 1900;
const HISTORY_EMBED_ENTRIES: usize = 10;

/// `2024-05-01 14:03:22` -> `05/01 14:03`
fn short_timestamp(ts: &str) -> String {
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S")
        .map(|t| t.format("%m/%d %H:%M").to_string())
        .unwrap_or_else(|_| ts.to_string())
}

fn response_note(count: i64) -> String {
    match count {
        0 => String::new(),
        1 => " (✅ 1 response)".to_string(),
        n => format!(" (✅ {} responses)", n),
    }
}

fn log_lines(turns: &[ConversationTurn]) -> Vec<String> {
    turns
        .iter()
        .enumerate()
        .map(|(i, turn)| match turn.role {
            Role::User => format!(
                "{}. 👤 User{} ({}):\n{}\n",
                i + 1,
                if turn.has_attachments { " 📎" } else { "" },
                turn.timestamp,
                turn.content
            ),
            Role::Assistant => format!(
                "{}. 🤖 Bot ({}) ({}):\n{}\n",
                i + 1,
                turn.model_used.as_deref().unwrap_or("unknown"),
                turn.timestamp,
                turn.content
            ),
        })
        .collect()
}

/// Get message statistics
#[poise::command(slash_command)]
pub async fn message_stats(
    ctx: Context<'_>,
    #[description = "User to show statistics for"]
    user: Option<serenity::User>,
) -> Result<(), Error> {
    ctx.defer().await?;

    // In DMs without a target the caller sees their own numbers
    let target = match &user {
        Some(u) => Some(u.id.to_string()),
        None if ctx.guild_id().is_none() => Some(ctx.author().id.to_string()),
        None => None,
    };
    let stats = match ctx
        .data()
        .db
        .run_blocking(move |db| db.get_conversation_stats(target.as_deref()))
        .await
    {
        Ok(stats) => stats,
        Err(e) => {
            ctx.say(format!("❌ Error retrieving statistics: {}", e)).await?;
            return Ok(());
        }
    };

    let mut embed = serenity::CreateEmbed::new()
        .title("📊 Message Statistics")
        .timestamp(serenity::Timestamp::now())
        .color(COLOR_BLUE);
    embed = match &user {
        Some(u) => embed
            .description(format!("Statistics for {}", u.display_name()))
            .field("Messages Sent", stats.total_messages.to_string(), true)
            .field("Bot Responses", stats.total_responses.to_string(), true),
        None => {
            let embed = embed
                .description("Overall bot statistics")
                .field("Total Messages", stats.total_messages.to_string(), true)
                .field("Total Responses", stats.total_responses.to_string(), true);
            match stats.unique_users {
                Some(n) => embed.field("Unique Users", n.to_string(), true),
                None => embed,
            }
        }
    };

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Get your recent message history
#[poise::command(slash_command)]
pub async fn message_history(
    ctx: Context<'_>,
    #[description = "How many messages to look back over (1-50, default: 10)"]
    #[min = 1]
    #[max = 50]
    limit: Option<usize>,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    let limit = limit.unwrap_or(10).clamp(1, 50);

    let uid = ctx.author().id.to_string();
    let history = match ctx
        .data()
        .db
        .run_blocking(move |db| db.get_user_message_history(&uid, limit))
        .await
    {
        Ok(history) => history,
        Err(e) => {
            ctx.send(poise::CreateReply::default()
                .content(format!("❌ Error retrieving message history: {}", e))
                .ephemeral(true))
                .await?;
            return Ok(());
        }
    };

    if history.is_empty() {
        ctx.send(poise::CreateReply::default().content("No message history found.").ephemeral(true))
            .await?;
        return Ok(());
    }

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("📝 Your Recent Messages (Last {})", history.len()))
        .timestamp(serenity::Timestamp::now())
        .color(COLOR_GREEN);
    for (i, entry) in history.iter().take(HISTORY_EMBED_ENTRIES).enumerate() {
        let content = if entry.content.trim().is_empty() {
            "*[No text content]*".to_string()
        } else {
            truncate_chars(&entry.content, 97)
        };
        embed = embed.field(
            format!(
                "{}. {}{}",
                i + 1,
                short_timestamp(&entry.timestamp),
                response_note(entry.response_count)
            ),
            content,
            false,
        );
    }

    ctx.send(ephemeral(embed)).await?;
    Ok(())
}

/// Get conversation logs for a user (Owner only)
#[poise::command(slash_command, owners_only, hide_in_help)]
pub async fn logs(
    ctx: Context<'_>,
    #[description = "The user to get logs for"]
    user: serenity::User,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let uid = user.id.to_string();
    let turns = ctx
        .data()
        .db
        .run_blocking(move |db| db.get_conversation_context(&uid, 100, None))
        .await?;

    if turns.is_empty() {
        ctx.send(poise::CreateReply::default()
            .content(format!("📭 No conversation logs found for <@{}> ({})", user.id, user.name))
            .ephemeral(true))
            .await?;
        return Ok(());
    }

    let mut lines = vec![
        format!("📋 Conversation Logs for {} ({})", user.name, user.id),
        format!("Total messages: {}", turns.len()),
        "=".repeat(50),
        String::new(),
    ];
    lines.extend(log_lines(&turns));
    let chunks = code_block_chunks(&lines, LOG_CHUNK_LIMIT);

    let owner = ctx.author();
    for (i, chunk) in chunks.iter().enumerate() {
        if let Err(e) = owner
            .direct_message(ctx.serenity_context(), serenity::CreateMessage::new().content(chunk))
            .await
        {
            error!("Failed to DM log chunk {}: {}", i + 1, e);
            ctx.send(poise::CreateReply::default()
                .content(format!("❌ Error sending DM chunk {}: {}", i + 1, e))
                .ephemeral(true))
                .await?;
            return Ok(());
        }
    }
    owner
        .direct_message(
            ctx.serenity_context(),
            serenity::CreateMessage::new().content(format!(
                "✅ **Log Export Complete**\nTotal messages: {}\nSent in {} parts",
                turns.len(),
                chunks.len()
            )),
        )
        .await?;

    info!("Exported {} log entries for {} to {}", turns.len(), user.name, owner.name);
    ctx.send(poise::CreateReply::default()
        .content(format!("✅ Conversation logs for <@{}> have been sent to your DMs!", user.id))
        .ephemeral(true))
        .await?;
    Ok(())
}

/// Delete logged messages older than a number of days (Owner only)
#[poise::command(slash_command, owners_only, hide_in_help)]
pub async fn cleanup_messages(
    ctx: Context<'_>,
    #[description = "Keep messages from the last N days (default: configured retention)"]
    #[min = 1]
    days: Option<u64>,
) -> Result<(), Error> {
    let days = days.unwrap_or(ctx.data().config.message_retention_days);
    ctx.defer().await?;

    match ctx
        .data()
        .db
        .run_blocking(move |db| db.cleanup_old_messages(days))
        .await
    {
        Ok(deleted) => {
            info!("Manual cleanup by {} removed {} rows", ctx.author().name, deleted);
            ctx.say(format!(
                "🧹 Cleaned up {} database entries older than {} days.",
                deleted, days
            ))
            .await?;
        }
        Err(e) => {
            ctx.say(format!("❌ Error during cleanup: {}", e)).await?;
        }
    }
    Ok(())
}

/// Database statistics (Owner only)
#[poise::command(slash_command, owners_only, hide_in_help)]
pub async fn db_stats(ctx: Context<'_>) -> Result<(), Error> {
    let result = ctx
        .data()
        .db
        .run_blocking(|db| Ok((db.get_conversation_stats(None)?, db.file_size_bytes())))
        .await;

    let embed = match result {
        Ok((stats, size)) => {
            let mut embed = serenity::CreateEmbed::new()
                .title("🗄️ Database Statistics")
                .field("Total Messages", stats.total_messages.to_string(), true)
                .field("Total Responses", stats.total_responses.to_string(), true)
                .field("Unique Users", stats.unique_users.unwrap_or(0).to_string(), true)
                .timestamp(serenity::Timestamp::now())
                .color(COLOR_PURPLE);
            if let Some(bytes) = size {
                embed = embed.field(
                    "Database Size",
                    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0)),
                    true,
                );
            }
            embed
        }
        Err(e) => error_embed("❌ Error", format!("Error retrieving database statistics: {}", e)),
    };

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
