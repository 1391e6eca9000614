use gork::commands::status::{ActivityKind, PresenceInfo};
use gork::services::RetentionSweeper;
use gork::{config::Config, db::Database, Data, Error};
use poise::serenity_prelude as serenity;
use std::collections::HashSet;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {}", ctx.command().qualified_name, error);
            if let Err(e) = ctx.say(format!("❌ Something went wrong: {}", error)).await {
                warn!("Could not report command error: {}", e);
            }
        }
        poise::FrameworkError::EventHandler { error, event, .. } => {
            error!("Error handling {} event: {}", event.snake_case_name(), error);
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gork=info,serenity=warn")),
        )
        .init();

    let config = Config::from_env()?;
    info!("Loaded configuration: {:?}", config);
    let discord_token = config.discord_token.clone();

    // Open the database up front so a bad path fails before connecting
    let db = Database::new(&config)?;
    db.execute_init()?;

    let owners: HashSet<serenity::UserId> = config
        .owner_id
        .map(serenity::UserId::new)
        .into_iter()
        .collect();
    if owners.is_empty() {
        warn!("OWNER_ID not set; owner-only commands fall back to the application owner");
    }

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: gork::commands::all(),
            owners,
            on_error: |error| Box::pin(on_error(error)),
            event_handler: |ctx, event, _framework, data| {
                Box::pin(async move {
                    if let serenity::FullEvent::Message { new_message } = event {
                        if let Err(e) = gork::handler::handle_message(ctx, new_message, data).await {
                            error!("Failed to handle message {}: {}", new_message.id, e);
                        }
                    }
                    Ok(())
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {} ({})", ready.user.name, ready.user.id);
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let data = Data::new(config, db, ready.user.id.get())?;

                ctx.set_activity(Some(serenity::ActivityData::custom(&data.config.status_message)));
                data.presence.set(Some(PresenceInfo {
                    kind: ActivityKind::Custom,
                    text: data.config.status_message.clone(),
                    url: None,
                }));

                info!("Using model {}", data.llm_client.model());

                let sweeper = RetentionSweeper::new(
                    data.db.clone(),
                    data.config.message_retention_days,
                    data.config.cleanup_interval,
                );
                tokio::spawn(sweeper.run());

                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::DIRECT_MESSAGES;

    let mut client = serenity::ClientBuilder::new(&discord_token, intents)
        .framework(framework)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    info!("Starting Gork...");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}
