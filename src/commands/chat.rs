use crate::commands::{COLOR_GREEN, COLOR_RED};
use crate::context::UserInput;
use crate::db::{NewBotResponse, NewUserMessage};
use crate::handler::{recent_channel_messages, reply_chunks};
use crate::respond::{generate_reply, ReplyRequest};
use crate::system_prompt::ChatMode;
use crate::{Context, Error};
use poise::serenity_prelude::{CreateEmbed, CreateEmbedFooter};
use tracing::{error, info, warn};

/// Chat with Gork AI
#[poise::command(slash_command)]
pub async fn gork(
    ctx: Context<'_>,
    #[description = "Your message to Gork"]
    message: String,
) -> Result<(), Error> {
    ctx.defer().await?;

    let data = ctx.data();
    let is_dm = ctx.guild_id().is_none();
    let message_id = format!("slash_{}", ctx.id());
    log_slash_message(&ctx, &message_id, &message).await;

    let channel_history = if is_dm {
        Vec::new()
    } else {
        recent_channel_messages(
            &data.db,
            &data.cache,
            ctx.channel_id().get(),
            data.config.channel_cache_messages,
            None,
        )
        .await
    };

    let request = ReplyRequest {
        user_id: ctx.author().id.get(),
        is_dm,
        mode: ChatMode::Direct,
        message_id: Some(message_id.clone()),
        channel_history,
        input: UserInput {
            text: message,
            ..Default::default()
        },
    };

    let reply = match generate_reply(data, request).await {
        Ok(r) => r,
        Err(e) => {
            error!("/gork failed for {}: {}", ctx.author().name, e);
            ctx.say(format!("❌ Sorry, I ran into an error: {}", e)).await?;
            return Ok(());
        }
    };

    info!(
        "/gork reply for {} ({} ms, model {}, tools: {:?})",
        ctx.author().name,
        reply.elapsed_ms,
        reply.model,
        reply.directives
    );
    let chunks = reply_chunks(&reply.text);
    let total = chunks.len();
    for (i, chunk) in chunks.into_iter().enumerate() {
        let handle = ctx.say(chunk.as_str()).await?;
        let sent = handle.message().await?;

        let record = NewBotResponse {
            original_message_id: message_id.clone(),
            response_message_id: sent.id.to_string(),
            content: chunk,
            response_chunks: total,
            chunk_number: i + 1,
            processing_time_ms: Some(reply.elapsed_ms),
            model_used: Some(reply.model.clone()),
            tokens_used: reply.tokens_used,
            timestamp: sent.timestamp.unix_timestamp(),
        };
        if let Err(e) = data.db.run_blocking(move |db| db.log_bot_response(&record)).await {
            warn!("Failed to log /gork response chunk: {}", e);
        }
    }
    Ok(())
}

/// Slash invocations have no message of their own; they are logged under `slash_<interaction id>`.
async fn log_slash_message(ctx: &Context<'_>, message_id: &str, content: &str) {
    let record = NewUserMessage {
        user_id: ctx.author().id.to_string(),
        username: ctx.author().name.clone(),
        user_display_name: Some(ctx.author().display_name().to_string()),
        channel_id: ctx.channel_id().to_string(),
        channel_name: ctx.cache().channel(ctx.channel_id()).map(|c| c.name.clone()),
        guild_id: ctx.guild_id().map(|g| g.to_string()),
        guild_name: ctx.guild().map(|g| g.name.clone()),
        message_id: message_id.to_string(),
        content: content.to_string(),
        attachments: Vec::new(),
        timestamp: ctx.created_at().unix_timestamp(),
    };
    if let Err(e) = ctx.data().db.run_blocking(move |db| db.log_user_message(&record)).await {
        warn!("Failed to log /gork message {}: {}", message_id, e);
    }
}

/// Check Gork AI status
#[poise::command(slash_command)]
pub async fn gork_status(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let usage = if ctx.guild_id().is_none() {
        "Send me a message in DM or mention me in a server, or use `/gork` command"
    } else {
        "Mention me in a message or use `/gork` command"
    };

    let embed = if data.llm_client.is_configured() {
        let tools: Vec<&str> = data.tools.list_tools().iter().map(|t| t.directive()).collect();
        let tools = if tools.is_empty() {
            "None".to_string()
        } else {
            tools.iter().map(|t| format!("`{}`", t)).collect::<Vec<_>>().join(", ")
        };
        let uptime = std::time::Duration::from_secs(data.started_at.elapsed().as_secs());

        CreateEmbed::new()
            .title("Gork AI Status")
            .description("✅ Gork AI is configured and ready!")
            .field("Model", data.llm_client.model(), false)
            .field("Usage", usage, false)
            .field("Tools", tools, false)
            .footer(CreateEmbedFooter::new(format!(
                "Uptime: {}",
                humantime::format_duration(uptime)
            )))
            .color(COLOR_GREEN)
    } else {
        CreateEmbed::new()
            .title("Gork AI Status")
            .description("❌ Gork AI is not configured (missing API key)")
            .color(COLOR_RED)
    };

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
