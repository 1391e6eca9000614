use crate::cache::{CachedMessage, MessageCache};
use crate::context::UserInput;
use crate::db::{AttachmentInfo, ChannelMessage, Database, GuildSettings, NewBotResponse, NewUserMessage};
use crate::discord_text::{extract_message_text, split_message, strip_bot_mentions};
use crate::respond::{generate_reply, GeneratedReply, ReplyRequest};
use crate::services::transcription::is_audio;
use crate::system_prompt::ChatMode;
use crate::{Data, Error};
use poise::serenity_prelude as serenity;
use rand::Rng;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};

/// Ids of messages being handled right now. Gateway replays can deliver the
/// same message twice; the second delivery is dropped while the first runs.
#[derive(Clone, Default)]
pub struct InFlight(Arc<Mutex<HashSet<u64>>>);

pub struct InFlightGuard {
    set: Arc<Mutex<HashSet<u64>>>,
    id: u64,
}

impl InFlight {
    pub fn try_claim(&self, id: u64) -> Option<InFlightGuard> {
        let mut set = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        set.insert(id).then(|| InFlightGuard {
            set: self.0.clone(),
            id,
        })
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// Why the bot might answer a message.
#[derive(Debug, Clone, Copy, Default)]
pub struct Triggers {
    pub is_dm: bool,
    pub mentioned: bool,
    pub reply_to_bot: bool,
    pub reply_all: bool,
    pub random_enabled: bool,
    pub random_roll: bool,
}

impl Triggers {
    pub fn mode(&self) -> Option<ChatMode> {
        if self.is_dm || self.mentioned || self.reply_to_bot || self.reply_all {
            Some(ChatMode::Direct)
        } else if self.random_enabled && self.random_roll {
            Some(ChatMode::Random)
        } else {
            None
        }
    }
}

fn is_image(attachment: &AttachmentInfo) -> bool {
    attachment
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("image/"))
}

pub async fn handle_message(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
) -> Result<(), Error> {
    if msg.author.id.get() == data.bot_id {
        return Ok(());
    }

    let guild_settings = match msg.guild_id {
        Some(gid) => {
            let gid = gid.to_string();
            data.db
                .run_blocking(move |db| db.get_guild_settings(&gid))
                .await?
        }
        None => GuildSettings::default(),
    };
    if msg.author.bot && !guild_settings.bot_reply_enabled {
        return Ok(());
    }

    let Some(_guard) = data.in_flight.try_claim(msg.id.get()) else {
        debug!("Skipping duplicate delivery of message {}", msg.id);
        return Ok(());
    };

    let display_name = msg.author.display_name().to_string();
    let text = extract_message_text(msg);
    data.cache.insert(
        msg.channel_id.get(),
        CachedMessage {
            message_id: msg.id.get(),
            author_id: msg.author.id.get(),
            author_name: display_name.clone(),
            content: text.clone(),
            is_bot: msg.author.bot,
        },
    );

    let attachments: Vec<AttachmentInfo> = msg
        .attachments
        .iter()
        .map(|a| AttachmentInfo {
            filename: a.filename.clone(),
            size: a.size,
            content_type: a.content_type.clone(),
            url: a.url.clone(),
        })
        .collect();

    log_user_message(ctx, msg, data, &display_name, &text, &attachments).await;

    let reply_all = if msg.guild_id.is_some() {
        let cid = msg.channel_id.to_string();
        data.db
            .run_blocking(move |db| db.get_channel_settings(&cid))
            .await?
            .reply_all_enabled
    } else {
        false
    };
    let triggers = Triggers {
        is_dm: msg.guild_id.is_none(),
        mentioned: msg.mentions_user_id(serenity::UserId::new(data.bot_id)),
        reply_to_bot: msg
            .referenced_message
            .as_deref()
            .is_some_and(|m| m.author.id.get() == data.bot_id),
        reply_all,
        random_enabled: guild_settings.random_messages_enabled,
        random_roll: rand::rng().random_bool(data.config.random_message_chance),
    };
    let Some(mode) = triggers.mode() else {
        return Ok(());
    };

    let mut prompt = strip_bot_mentions(&text, data.bot_id);
    if triggers.is_dm && prompt.is_empty() {
        prompt = text.trim().to_string();
    }

    if let Some(transcriber) = &data.transcriber {
        for a in attachments.iter().filter(|a| is_audio(a.content_type.as_deref(), &a.filename)) {
            match transcriber.transcribe_url(&a.url, &a.filename).await {
                Ok(transcript) if !transcript.is_empty() => {
                    prompt.push_str(&format!("\n\n[Transcript of {}]: {}", a.filename, transcript));
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to transcribe {}: {}", a.filename, e),
            }
        }
    }

    let image_urls: Vec<String> = attachments.iter().filter(|a| is_image(a)).map(|a| a.url.clone()).collect();
    if prompt.trim().is_empty() && image_urls.is_empty() {
        // Only a ping, nothing to answer
        return Ok(());
    }

    info!(
        "Responding ({:?}) to {} in channel {}",
        mode, msg.author.name, msg.channel_id
    );

    let channel_history = if triggers.is_dm {
        Vec::new()
    } else {
        recent_channel_messages(
            &data.db,
            &data.cache,
            msg.channel_id.get(),
            data.config.channel_cache_messages,
            Some(msg.id.get()),
        )
        .await
    };

    let replied_to = msg.referenced_message.as_deref().map(|m| {
        (m.author.display_name().to_string(), extract_message_text(m))
    });

    let request = ReplyRequest {
        user_id: msg.author.id.get(),
        is_dm: triggers.is_dm,
        mode,
        message_id: Some(msg.id.to_string()),
        channel_history,
        input: UserInput {
            text: prompt,
            image_urls,
            replied_to,
        },
    };

    let typing = msg.channel_id.start_typing(&ctx.http);
    let result = generate_reply(data, request).await;
    drop(typing);

    match result {
        Ok(reply) => send_reply(ctx, msg, data, &reply).await?,
        Err(e) => {
            error!("Failed to generate reply for message {}: {}", msg.id, e);
            msg.reply(&ctx.http, format!("❌ Sorry, I ran into an error: {}", e)).await?;
        }
    }

    Ok(())
}

/// Recent channel messages for prompt context, oldest first. The message log
/// survives restarts while the cache also holds Gork's own replies, so both
/// are merged by message id with cached entries taking precedence.
pub(crate) async fn recent_channel_messages(
    db: &Database,
    cache: &MessageCache,
    channel_id: u64,
    limit: usize,
    exclude: Option<u64>,
) -> Vec<CachedMessage> {
    let cid = channel_id.to_string();
    let logged = match db.run_blocking(move |db| db.get_channel_history(&cid, limit)).await {
        Ok(rows) => rows,
        Err(e) => {
            warn!("Failed to load channel history for {}: {}", channel_id, e);
            Vec::new()
        }
    };
    merge_channel_history(logged, cache.get_channel_history(channel_id, limit), exclude, limit)
}

fn merge_channel_history(
    logged: Vec<ChannelMessage>,
    cached: Vec<CachedMessage>,
    exclude: Option<u64>,
    limit: usize,
) -> Vec<CachedMessage> {
    let mut merged: BTreeMap<u64, CachedMessage> = logged
        .into_iter()
        .filter_map(|m| {
            // Slash invocations are logged under non-numeric ids and have no place in the timeline
            let message_id = m.message_id.parse().ok()?;
            Some((
                message_id,
                CachedMessage {
                    message_id,
                    author_id: m.user_id.parse().unwrap_or_default(),
                    author_name: m.username,
                    content: m.content,
                    is_bot: false,
                },
            ))
        })
        .collect();
    merged.extend(cached.into_iter().map(|m| (m.message_id, m)));
    if let Some(id) = exclude {
        merged.remove(&id);
    }

    // Snowflake ids sort chronologically
    let skip = merged.len().saturating_sub(limit);
    merged.into_values().skip(skip).collect()
}

async fn log_user_message(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
    display_name: &str,
    text: &str,
    attachments: &[AttachmentInfo],
) {
    let guild_name = msg
        .guild_id
        .and_then(|gid| ctx.cache.guild(gid).map(|g| g.name.clone()));
    let channel_name = ctx.cache.channel(msg.channel_id).map(|c| c.name.clone());

    let record = NewUserMessage {
        user_id: msg.author.id.to_string(),
        username: msg.author.name.clone(),
        user_display_name: Some(display_name.to_string()),
        channel_id: msg.channel_id.to_string(),
        channel_name,
        guild_id: msg.guild_id.map(|g| g.to_string()),
        guild_name,
        message_id: msg.id.to_string(),
        content: text.to_string(),
        attachments: attachments.to_vec(),
        timestamp: msg.timestamp.unix_timestamp(),
    };
    if let Err(e) = data.db.run_blocking(move |db| db.log_user_message(&record)).await {
        warn!("Failed to log message {}: {}", msg.id, e);
    }
}

async fn send_reply(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
    reply: &GeneratedReply,
) -> Result<(), Error> {
    let chunks = reply_chunks(&reply.text);
    let total = chunks.len();

    for (i, chunk) in chunks.into_iter().enumerate() {
        let sent = msg.reply(&ctx.http, &chunk).await?;

        data.cache.insert(
            msg.channel_id.get(),
            CachedMessage {
                message_id: sent.id.get(),
                author_id: data.bot_id,
                author_name: "Gork".to_string(),
                content: chunk.clone(),
                is_bot: true,
            },
        );

        let record = NewBotResponse {
            original_message_id: msg.id.to_string(),
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
            warn!("Failed to log response chunk for {}: {}", msg.id, e);
        }
    }

    info!(
        "Replied to {} in {} chunk(s) ({} ms, model {}, tools: {:?})",
        msg.author.name, total, reply.elapsed_ms, reply.model, reply.directives
    );
    Ok(())
}

/// Discord-sized pieces of a reply, without blank ones.
pub(crate) fn reply_chunks(text: &str) -> Vec<String> {
    split_message(text)
        .into_iter()
        .filter(|c| !c.trim().is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_dedup() {
        let in_flight = InFlight::default();
        let guard = in_flight.try_claim(1).expect("first claim");
        assert!(in_flight.try_claim(1).is_none());
        assert!(in_flight.try_claim(2).is_some());
        assert_eq!(in_flight.len(), 1);
        drop(guard);
        assert!(in_flight.is_empty());
        assert!(in_flight.try_claim(1).is_some());
    }

    #[test]
    fn test_trigger_modes() {
        assert_eq!(Triggers::default().mode(), None);
        assert_eq!(Triggers { is_dm: true, ..Default::default() }.mode(), Some(ChatMode::Direct));
        assert_eq!(Triggers { mentioned: true, ..Default::default() }.mode(), Some(ChatMode::Direct));
        assert_eq!(Triggers { reply_to_bot: true, ..Default::default() }.mode(), Some(ChatMode::Direct));
        assert_eq!(Triggers { reply_all: true, random_roll: true, ..Default::default() }.mode(), Some(ChatMode::Direct));

        // A winning roll only counts when random messages are enabled
        assert_eq!(Triggers { random_roll: true, ..Default::default() }.mode(), None);
        assert_eq!(
            Triggers { random_enabled: true, random_roll: true, ..Default::default() }.mode(),
            Some(ChatMode::Random)
        );
        assert_eq!(Triggers { random_enabled: true, ..Default::default() }.mode(), None);
    }

    #[test]
    fn test_image_detection() {
        let png = AttachmentInfo {
            filename: "cat.png".into(),
            size: 10,
            content_type: Some("image/png".into()),
            url: "https://cdn.example/cat.png".into(),
        };
        let txt = AttachmentInfo { content_type: Some("text/plain".into()), ..png.clone() };
        assert!(is_image(&png));
        assert!(!is_image(&txt));
    }

    fn logged_message(id: &str, user: &str, content: &str) -> ChannelMessage {
        ChannelMessage {
            message_id: id.to_string(),
            user_id: user.to_string(),
            username: format!("name_{}", user),
            content: content.to_string(),
            timestamp: "2024-01-01 00:00:00".to_string(),
        }
    }

    #[tokio::test]
    async fn test_channel_history_from_log_when_cache_empty() {
        let db = Database::open(":memory:").unwrap();
        db.execute_init().unwrap();
        for (id, content, ts) in [("101", "first", 1_700_000_000), ("102", "second", 1_700_000_010), ("103", "current", 1_700_000_020)] {
            db.log_user_message(&NewUserMessage {
                user_id: "7".into(),
                username: "alice".into(),
                channel_id: "55".into(),
                message_id: id.into(),
                content: content.into(),
                timestamp: ts,
                ..Default::default()
            })
            .unwrap();
        }
        let cache = MessageCache::new(10, 5);

        let history = recent_channel_messages(&db, &cache, 55, 5, Some(103)).await;
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
        assert_eq!(history[0].author_id, 7);
        assert_eq!(history[0].author_name, "alice");

        assert!(recent_channel_messages(&db, &cache, 56, 5, None).await.is_empty());
    }

    #[test]
    fn test_merge_channel_history() {
        let logged = vec![logged_message("10", "1", "old one"), logged_message("slash_9", "1", "slash"), logged_message("20", "2", "logged two")];
        let cached = vec![
            CachedMessage { message_id: 20, author_id: 2, author_name: "Bob".into(), content: "cached two".into(), is_bot: false },
            CachedMessage { message_id: 25, author_id: 99, author_name: "Gork".into(), content: "bot reply".into(), is_bot: true },
            CachedMessage { message_id: 30, author_id: 1, author_name: "Ann".into(), content: "now".into(), is_bot: false },
        ];

        let merged = merge_channel_history(logged.clone(), cached.clone(), Some(30), 10);
        let contents: Vec<&str> = merged.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["old one", "cached two", "bot reply"]);

        let newest = merge_channel_history(logged, cached, None, 2);
        let ids: Vec<u64> = newest.iter().map(|m| m.message_id).collect();
        assert_eq!(ids, vec![25, 30]);
    }

    #[test]
    fn test_reply_chunks_skip_blank() {
        assert!(reply_chunks("   \n  ").is_empty());
        // A whitespace-only run lands in a chunk of its own
        let text = format!("{}\n{}\n{}", "a".repeat(1500), " ".repeat(1990), "b".repeat(10));
        assert_eq!(split_message(&text).len(), 3);
        let chunks = reply_chunks(&text);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with('a'));
        assert_eq!(chunks[1], "b".repeat(10));
    }
}
