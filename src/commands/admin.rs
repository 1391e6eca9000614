use crate::{Context, Error};
use tracing::info;

/// Shut down the bot (Owner only)
#[poise::command(slash_command, owners_only, hide_in_help)]
pub async fn shutdown(ctx: Context<'_>) -> Result<(), Error> {
    info!(
        "Shutdown requested by owner {} ({} message(s) in flight)",
        ctx.author().name,
        ctx.data().in_flight.len()
    );
    ctx.say("👋 Gork is shutting down...").await?;
    ctx.framework().shard_manager().shutdown_all().await;
    Ok(())
}
