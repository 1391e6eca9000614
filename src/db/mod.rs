use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use crate::config::Config;
use tracing::{info, debug};

mod models;
mod schema;
mod settings;

pub use models::*;

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: String,
}

impl Database {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Self::open(&config.database_url)
    }

    pub fn open(path: &str) -> anyhow::Result<Self> {
        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_string(),
        })
    }

    pub fn execute_init(&self) -> anyhow::Result<()> {
        info!("Database: Initializing schema at {}", self.path);
        let conn = self.conn()?;
        conn.execute_batch(schema::SCHEMA)?;
        debug!("Database: Schema initialized successfully");
        Ok(())
    }

    fn conn(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("Database connection mutex poisoned"))
    }

    /// Runs a synchronous database call on the blocking pool.
    pub async fn run_blocking<F, T>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| anyhow::anyhow!("Database task failed: {}", e))?
    }

    pub fn file_size_bytes(&self) -> Option<u64> {
        std::fs::metadata(&self.path).ok().map(|m| m.len())
    }

    // --- Messages ---

    pub fn log_user_message(&self, msg: &NewUserMessage) -> anyhow::Result<()> {
        debug!(
            "Database: Logging message {} from {} in channel {}",
            msg.message_id, msg.user_id, msg.channel_id
        );
        let attachment_info = if msg.attachments.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&serde_json::json!({
                "count": msg.attachments.len(),
                "files": msg.attachments,
            }))?)
        };

        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO messages
                (user_id, username, user_display_name, channel_id, channel_name,
                 guild_id, guild_name, message_id, message_content, message_type,
                 has_attachments, attachment_info, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'user', ?10, ?11, datetime(?12, 'unixepoch'))",
            rusqlite::params![
                msg.user_id,
                msg.username,
                msg.user_display_name,
                msg.channel_id,
                msg.channel_name,
                msg.guild_id,
                msg.guild_name,
                msg.message_id,
                msg.content,
                !msg.attachments.is_empty(),
                attachment_info,
                msg.timestamp,
            ],
        )?;
        Ok(())
    }

    pub fn log_bot_response(&self, resp: &NewBotResponse) -> anyhow::Result<()> {
        debug!(
            "Database: Logging response {} (chunk {}/{}) for {}",
            resp.response_message_id, resp.chunk_number, resp.response_chunks, resp.original_message_id
        );
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO responses
                (original_message_id, response_message_id, response_content,
                 response_chunks, chunk_number, processing_time_ms, model_used,
                 tokens_used, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, datetime(?9, 'unixepoch'))",
            rusqlite::params![
                resp.original_message_id,
                resp.response_message_id,
                resp.content,
                resp.response_chunks as i64,
                resp.chunk_number as i64,
                resp.processing_time_ms,
                resp.model_used,
                resp.tokens_used,
                resp.timestamp,
            ],
        )?;
        Ok(())
    }

    /// Newest first, with the number of bot responses each message received.
    pub fn get_user_message_history(&self, user_id: &str, limit: usize) -> anyhow::Result<Vec<HistoryEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT m.message_id, m.message_content, m.timestamp, COUNT(r.id)
             FROM messages m
             LEFT JOIN responses r ON m.message_id = r.original_message_id
             WHERE m.user_id = ?1
             GROUP BY m.id
             ORDER BY m.timestamp DESC, m.id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map((user_id, limit as i64), |row| {
            Ok(HistoryEntry {
                message_id: row.get(0)?,
                content: row.get(1)?,
                timestamp: row.get(2)?,
                response_count: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// The user's last `limit` messages as chronological user/assistant turns.
    /// Chunked responses are stitched back together in chunk order.
    /// `exclude_message_id` leaves out the message currently being answered.
    pub fn get_conversation_context(
        &self,
        user_id: &str,
        limit: usize,
        exclude_message_id: Option<&str>,
    ) -> anyhow::Result<Vec<ConversationTurn>> {
        let conn = self.conn()?;
        let mut msg_stmt = conn.prepare(
            "SELECT message_id, message_content, timestamp, has_attachments
             FROM messages
             WHERE user_id = ?1 AND message_type = 'user'
               AND (?3 IS NULL OR message_id != ?3)
             ORDER BY timestamp DESC, id DESC
             LIMIT ?2",
        )?;
        let messages = msg_stmt
            .query_map((user_id, limit as i64, exclude_message_id), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, bool>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut resp_stmt = conn.prepare(
            "SELECT response_content, timestamp, model_used
             FROM responses
             WHERE original_message_id = ?1
             ORDER BY chunk_number ASC, id ASC",
        )?;

        let mut conversation = Vec::with_capacity(messages.len() * 2);
        for (message_id, content, timestamp, has_attachments) in messages.into_iter().rev() {
            conversation.push(ConversationTurn {
                role: Role::User,
                content,
                timestamp,
                has_attachments,
                model_used: None,
            });

            let chunks = resp_stmt
                .query_map([&message_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            if let Some((_, first_ts, model)) = chunks.first().cloned() {
                let content: String = chunks.into_iter().map(|(c, _, _)| c).collect();
                conversation.push(ConversationTurn {
                    role: Role::Assistant,
                    content,
                    timestamp: first_ts,
                    has_attachments: false,
                    model_used: model,
                });
            }
        }
        Ok(conversation)
    }

    /// Recent logged messages in a channel, oldest first.
    pub fn get_channel_history(&self, channel_id: &str, limit: usize) -> anyhow::Result<Vec<ChannelMessage>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT message_id, user_id, COALESCE(user_display_name, username), message_content, timestamp
             FROM messages
             WHERE channel_id = ?1
             ORDER BY timestamp DESC, id DESC
             LIMIT ?2",
        )?;
        let mut rows = stmt
            .query_map((channel_id, limit as i64), |row| {
                Ok(ChannelMessage {
                    message_id: row.get(0)?,
                    user_id: row.get(1)?,
                    username: row.get(2)?,
                    content: row.get(3)?,
                    timestamp: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.reverse();
        Ok(rows)
    }

    pub fn get_conversation_stats(&self, user_id: Option<&str>) -> anyhow::Result<ConversationStats> {
        let conn = self.conn()?;
        let stats = match user_id {
            Some(uid) => ConversationStats {
                total_messages: conn.query_row(
                    "SELECT COUNT(*) FROM messages WHERE user_id = ?1",
                    [uid],
                    |row| row.get(0),
                )?,
                total_responses: conn.query_row(
                    "SELECT COUNT(*) FROM responses r
                     JOIN messages m ON r.original_message_id = m.message_id
                     WHERE m.user_id = ?1",
                    [uid],
                    |row| row.get(0),
                )?,
                unique_users: None,
            },
            None => ConversationStats {
                total_messages: conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?,
                total_responses: conn.query_row("SELECT COUNT(*) FROM responses", [], |row| row.get(0))?,
                unique_users: Some(conn.query_row(
                    "SELECT COUNT(DISTINCT user_id) FROM messages",
                    [],
                    |row| row.get(0),
                )?),
            },
        };
        Ok(stats)
    }

    /// Removes messages older than `days_to_keep` days together with their responses.
    /// Returns the total number of rows deleted.
    pub fn cleanup_old_messages(&self, days_to_keep: u64) -> anyhow::Result<usize> {
        let mut conn = self.conn()?;
        let cutoff = format!("-{} days", days_to_keep);
        let tx = conn.transaction()?;
        let responses_deleted = tx.execute(
            "DELETE FROM responses
             WHERE original_message_id IN (
                 SELECT message_id FROM messages WHERE timestamp < datetime('now', ?1)
             )",
            [&cutoff],
        )?;
        let messages_deleted = tx.execute(
            "DELETE FROM messages WHERE timestamp < datetime('now', ?1)",
            [&cutoff],
        )?;
        tx.commit()?;

        info!(
            "Database: Cleaned up {} messages and {} responses older than {} days",
            messages_deleted, responses_deleted, days_to_keep
        );
        Ok(messages_deleted + responses_deleted)
    }
}

#[cfg(test)]
impl Database {
    pub(crate) fn message_exists(&self, message_id: &str) -> anyhow::Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE message_id = ?1",
            [message_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
