use crate::commands::{ephemeral, error_embed, COLOR_BLUE, COLOR_GREEN, COLOR_ORANGE, COLOR_PURPLE};
use crate::content_filter::{ContentSettings, FilterLevel};
use crate::db::{SteamLinkCheck, UserSettingsUpdate};
use crate::services::steam::is_valid_steam_id;
use crate::{Context, Error};
use poise::serenity_prelude as serenity;
use std::collections::BTreeMap;
use tracing::{error, info};

fn identity_update(ctx: &Context<'_>) -> UserSettingsUpdate {
    UserSettingsUpdate {
        username: Some(ctx.author().name.clone()),
        user_display_name: Some(ctx.author().display_name().to_string()),
        ..Default::default()
    }
}

/// Enable or disable NSFW content mode
#[poise::command(slash_command)]
pub async fn nsfw_mode(
    ctx: Context<'_>,
    #[description = "Enable or disable NSFW content"]
    enabled: bool,
) -> Result<(), Error> {
    let uid = ctx.author().id.to_string();
    let update = UserSettingsUpdate {
        nsfw_mode: Some(enabled),
        ..identity_update(&ctx)
    };
    if let Err(e) = ctx
        .data()
        .db
        .run_blocking(move |db| db.update_user_settings(&uid, &update))
        .await
    {
        error!("Failed to update NSFW mode for {}: {}", ctx.author().name, e);
        let embed = error_embed("❌ Error", "Failed to update NSFW mode settings. Please try again later.");
        ctx.send(ephemeral(embed)).await?;
        return Ok(());
    }
    info!("User {} set NSFW mode to {}", ctx.author().name, enabled);

    let status = if enabled { "enabled" } else { "disabled" };
    let mut embed = serenity::CreateEmbed::new()
        .title(if enabled { "🔞 NSFW Mode Updated" } else { "✅ NSFW Mode Updated" })
        .description(format!("NSFW content mode has been **{}** for your account.", status))
        .color(if enabled { COLOR_ORANGE } else { COLOR_GREEN })
        .footer(serenity::CreateEmbedFooter::new("Use /my_settings to view all your current settings"));
    embed = if enabled {
        embed.field(
            "⚠️ Important Notice",
            "• NSFW mode allows the AI to discuss mature content\n\
             • This setting is per-user and private\n\
             • You can disable this at any time\n\
             • Use responsibly and follow Discord's Terms of Service",
            false,
        )
    } else {
        embed.field(
            "ℹ️ Content Filtering",
            "• NSFW content will be filtered\n\
             • The AI will maintain appropriate responses\n\
             • You can re-enable NSFW mode anytime",
            false,
        )
    };

    ctx.send(ephemeral(embed)).await?;
    Ok(())
}

/// Set content filtering level
#[poise::command(slash_command)]
pub async fn content_filter(
    ctx: Context<'_>,
    #[description = "Content filtering level"]
    level: FilterLevel,
) -> Result<(), Error> {
    let uid = ctx.author().id.to_string();

    if level == FilterLevel::Minimal {
        let lookup = uid.clone();
        let current = ctx
            .data()
            .db
            .run_blocking(move |db| db.get_user_settings(&lookup))
            .await?;
        if !current.nsfw_mode {
            let embed = error_embed(
                "❌ NSFW Mode Required",
                "You must enable NSFW mode before setting content filter to 'minimal'.\n\n\
                 Use `/nsfw_mode enabled:True` first, then try again.",
            );
            ctx.send(ephemeral(embed)).await?;
            return Ok(());
        }
    }

    let update = UserSettingsUpdate {
        content_filter_level: Some(level),
        ..identity_update(&ctx)
    };
    if let Err(e) = ctx
        .data()
        .db
        .run_blocking(move |db| db.update_user_settings(&uid, &update))
        .await
    {
        error!("Failed to update content filter for {}: {}", ctx.author().name, e);
        let embed = error_embed("❌ Error", "Failed to update content filter settings. Please try again later.");
        ctx.send(ephemeral(embed)).await?;
        return Ok(());
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("🛡️ Content Filter Updated")
        .description(format!("Content filtering level set to **{}**", level.title()))
        .field("Filter Description", level.description(), false)
        .color(COLOR_BLUE);
    if level == FilterLevel::Minimal {
        embed = embed.field("⚠️ Reminder", "Minimal filtering is active. Please use responsibly.", false);
    }

    ctx.send(ephemeral(embed)).await?;
    Ok(())
}

/// View your current user settings
#[poise::command(slash_command)]
pub async fn my_settings(ctx: Context<'_>) -> Result<(), Error> {
    let uid = ctx.author().id.to_string();
    let settings = ctx
        .data()
        .db
        .run_blocking(move |db| db.get_user_settings(&uid))
        .await?;
    let content = ContentSettings::from(&settings);

    let nsfw_status = if settings.nsfw_mode { "🔞 Enabled" } else { "✅ Disabled" };
    let steam = match (&settings.steam_username, &settings.steam_id) {
        (Some(name), Some(id)) => format!("{} (`{}`)", name, id),
        (None, Some(id)) => format!("`{}`", id),
        _ => "Not linked".to_string(),
    };

    let mut embed = serenity::CreateEmbed::new()
        .title("⚙️ Your Settings")
        .description(format!("Current settings for {}", ctx.author().display_name()))
        .field("NSFW Mode", nsfw_status, true)
        .field("Content Filter", format!("🛡️ {}", settings.content_filter_level.title()), true)
        .field(
            "Effective Filtering",
            format!("{} {}", content.status_emoji(), content.status_text()),
            true,
        )
        .field("Steam", steam, true)
        .field(
            "Last Updated",
            settings.updated_at.clone().unwrap_or_else(|| "Never".to_string()),
            true,
        )
        .field(
            "Available Commands",
            "• `/nsfw_mode` - Toggle NSFW content\n\
             • `/content_filter` - Set filtering level\n\
             • `/link_steam` - Link your Steam account\n\
             • `/my_settings` - View current settings",
            false,
        )
        .color(COLOR_BLUE);
    if settings.nsfw_mode {
        embed = embed.field(
            "⚠️ NSFW Mode Active",
            "NSFW content is enabled for your account. Use responsibly.",
            false,
        );
    }

    ctx.send(ephemeral(embed)).await?;
    Ok(())
}

/// Link your Steam account to your Discord profile
#[poise::command(slash_command)]
pub async fn link_steam(
    ctx: Context<'_>,
    #[description = "Your Steam custom URL name (steamcommunity.com/id/<name>)"]
    customurl: Option<String>,
    #[description = "Your 64-bit Steam ID"]
    steam_id: Option<String>,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    let steam = &ctx.data().steam;

    let resolved = match (customurl.as_deref().map(str::trim), steam_id.as_deref().map(str::trim)) {
        (Some(vanity), _) if !vanity.is_empty() => {
            match steam.resolve_vanity_url(vanity).await {
                Ok(Some(id)) => id,
                Ok(None) => {
                    let embed = error_embed(
                        "❌ Steam Link Failed",
                        format!(
                            "Could not resolve custom URL `{}`. Please check the URL and try again, \
                             or use your 64-bit Steam ID directly.",
                            vanity
                        ),
                    );
                    ctx.send(ephemeral(embed)).await?;
                    return Ok(());
                }
                Err(e) => {
                    error!("Steam vanity lookup for '{}' failed: {}", vanity, e);
                    let embed = error_embed("❌ Steam Link Failed", format!("Steam lookup failed: {}", e));
                    ctx.send(ephemeral(embed)).await?;
                    return Ok(());
                }
            }
        }
        (_, Some(id)) if !id.is_empty() => {
            if !is_valid_steam_id(id) {
                let embed = error_embed(
                    "❌ Invalid Steam ID",
                    "A 64-bit Steam ID must be a 17-digit number. Please check your input.",
                );
                ctx.send(ephemeral(embed)).await?;
                return Ok(());
            }
            id.to_string()
        }
        _ => {
            let embed = serenity::CreateEmbed::new()
                .title("ℹ️ Missing Input")
                .description("Please provide either a `customURL` or a `steam_id` to link your Steam account.")
                .color(COLOR_BLUE);
            ctx.send(ephemeral(embed)).await?;
            return Ok(());
        }
    };

    let persona = if steam.has_api_key() {
        match steam.get_player_summary(&resolved).await {
            Ok(summary) => summary.map(|p| p.personaname),
            Err(e) => {
                info!("Could not fetch Steam persona for {}: {}", resolved, e);
                None
            }
        }
    } else {
        None
    };

    let uid = ctx.author().id.to_string();
    let update = UserSettingsUpdate {
        steam_id: Some(resolved.clone()),
        steam_username: persona,
        ..identity_update(&ctx)
    };
    let check_id = resolved.clone();
    let outcome = ctx
        .data()
        .db
        .run_blocking(move |db| {
            let check = db.validate_steam_id_link(&check_id, &uid)?;
            if check == SteamLinkCheck::Available {
                db.update_user_settings(&uid, &update)?;
            }
            Ok(check)
        })
        .await;

    let embed = match outcome {
        Ok(SteamLinkCheck::Available) => {
            info!("User {} linked Steam ID {}", ctx.author().name, resolved);
            serenity::CreateEmbed::new()
                .title("✅ Steam Account Linked!")
                .description(format!(
                    "Your Steam account (`{}`) has been successfully linked to your Discord profile.",
                    resolved
                ))
                .color(COLOR_GREEN)
        }
        Ok(SteamLinkCheck::LinkedToOtherUser(_)) => error_embed(
            "❌ Steam Link Failed",
            "This Steam account is already linked to another Discord user.",
        ),
        Err(e) => {
            error!("Failed to link Steam ID for {}: {}", ctx.author().name, e);
            error_embed(
                "❌ Steam Link Failed",
                "Failed to link Steam account due to a database error. Please try again later.",
            )
        }
    };

    ctx.send(ephemeral(embed)).await?;
    Ok(())
}

/// View NSFW mode statistics (Bot owner only)
#[poise::command(slash_command, owners_only, hide_in_help)]
pub async fn nsfw_stats(ctx: Context<'_>) -> Result<(), Error> {
    let users = match ctx
        .data()
        .db
        .run_blocking(|db| db.get_users_with_nsfw_enabled())
        .await
    {
        Ok(users) => users,
        Err(e) => {
            let embed = error_embed("❌ Error", format!("Failed to retrieve NSFW statistics: {}", e));
            ctx.send(ephemeral(embed)).await?;
            return Ok(());
        }
    };

    let mut embed = serenity::CreateEmbed::new()
        .title("📊 NSFW Mode Statistics")
        .description("Current NSFW mode usage statistics")
        .field("🔞 NSFW Mode Enabled", format!("**{}** users", users.len()), true)
        .color(COLOR_PURPLE);

    if !users.is_empty() {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for user in &users {
            *counts.entry(user.content_filter_level.title()).or_default() += 1;
        }
        let levels = counts
            .iter()
            .map(|(level, count)| format!("• {}: {}", level, count))
            .collect::<Vec<_>>()
            .join("\n");
        embed = embed.field("🛡️ Filter Levels", levels, true);

        let recent = users
            .iter()
            .take(5)
            .map(|u| {
                format!(
                    "• {} ({})",
                    u.username.as_deref().unwrap_or("Unknown"),
                    u.content_filter_level.as_str()
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        embed = embed.field("📋 Recent NSFW Users", recent, false);
    }

    embed = embed.field(
        "ℹ️ Note",
        "All user data is private and secure. This information is for administrative purposes only.",
        false,
    );
    ctx.send(ephemeral(embed)).await?;
    Ok(())
}
