use crate::commands::{COLOR_BLURPLE, COLOR_ORANGE};
use crate::summarize::{SummaryOutcome, UserSummarizer, MIN_SUMMARY_MESSAGES};
use crate::{Context, Error};
use poise::serenity_prelude as serenity;
use tracing::error;

/// Show what Gork has picked up about a user from their messages
#[poise::command(slash_command)]
pub async fn user_summary(
    ctx: Context<'_>,
    #[description = "User to summarize (default: you)"]
    user: Option<serenity::User>,
    #[description = "Regenerate even if a recent summary exists"]
    refresh: Option<bool>,
) -> Result<(), Error> {
    ctx.defer().await?;

    let data = ctx.data();
    let target = user.as_ref().unwrap_or_else(|| ctx.author());
    let summarizer = UserSummarizer::new(
        data.db.clone(),
        data.llm_client.clone(),
        data.config.user_summary_max_age_hours,
    );

    let outcome = match summarizer
        .get_or_refresh(target.id.get(), target.display_name(), refresh.unwrap_or(false))
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Summary for {} failed: {}", target.name, e);
            ctx.say(format!("❌ Could not build a summary: {}", e)).await?;
            return Ok(());
        }
    };

    let (summary, fresh) = match outcome {
        SummaryOutcome::Cached(s) => (s, false),
        SummaryOutcome::Generated(s) => (s, true),
        SummaryOutcome::NotEnoughHistory { found } => {
            let embed = serenity::CreateEmbed::new()
                .title(format!("🧠 {}", target.display_name()))
                .description(format!(
                    "Not enough history yet: found {} message(s), need at least {}.",
                    found, MIN_SUMMARY_MESSAGES
                ))
                .color(COLOR_ORANGE);
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
            return Ok(());
        }
    };

    let embed = serenity::CreateEmbed::new()
        .title(format!("🧠 {}", target.display_name()))
        .description(summary.summary)
        .field("Messages analyzed", summary.message_count.to_string(), true)
        .field(
            "Model",
            summary.model_used.unwrap_or_else(|| "unknown".to_string()),
            true,
        )
        .footer(serenity::CreateEmbedFooter::new(format!(
            "{} {} UTC",
            if fresh { "Generated" } else { "Last updated" },
            summary.updated_at
        )))
        .color(COLOR_BLURPLE);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
