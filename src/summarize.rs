use crate::db::{Database, UserSummary};
use crate::llm::LlmClient;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use tracing::info;

/// How many of the user's latest messages feed a summary.
pub const SUMMARY_SOURCE_MESSAGES: usize = 50;
/// Below this there is not enough to say anything useful.
pub const MIN_SUMMARY_MESSAGES: usize = 5;

#[derive(Debug, Clone)]
pub enum SummaryOutcome {
    Cached(UserSummary),
    Generated(UserSummary),
    NotEnoughHistory { found: usize },
}

pub struct UserSummarizer {
    db: Database,
    llm: LlmClient,
    max_age: Duration,
}

impl UserSummarizer {
    pub fn new(db: Database, llm: LlmClient, max_age_hours: i64) -> Self {
        Self {
            db,
            llm,
            max_age: Duration::hours(max_age_hours),
        }
    }

    /// Returns the stored summary unless it is missing, stale or `force` is set.
    pub async fn get_or_refresh(
        &self,
        user_id: u64,
        display_name: &str,
        force: bool,
    ) -> anyhow::Result<SummaryOutcome> {
        let uid = user_id.to_string();
        let existing = self
            .db
            .run_blocking({
                let uid = uid.clone();
                move |db| db.get_user_summary(&uid)
            })
            .await?;

        if let Some(summary) = existing {
            if !force && !is_stale(&summary.updated_at, self.max_age, Utc::now()) {
                return Ok(SummaryOutcome::Cached(summary));
            }
        }

        let history = self
            .db
            .run_blocking({
                let uid = uid.clone();
                move |db| db.get_user_message_history(&uid, SUMMARY_SOURCE_MESSAGES)
            })
            .await?;

        let messages: Vec<&str> = history
            .iter()
            .rev()
            .map(|h| h.content.trim())
            .filter(|c| !c.is_empty())
            .collect();
        if messages.len() < MIN_SUMMARY_MESSAGES {
            return Ok(SummaryOutcome::NotEnoughHistory { found: messages.len() });
        }

        info!("Generating user summary for {} from {} messages", user_id, messages.len());
        let prompt = format!(
            "Here are recent Discord messages written by {}, oldest first:\n\n{}\n\n\
             Write a short, friendly profile of this user in at most 5 sentences: their interests, \
             typical topics, tone and personality. Do not quote messages verbatim and do not \
             speculate about sensitive personal attributes.",
            display_name,
            messages
                .iter()
                .map(|m| format!("- {}", m))
                .collect::<Vec<_>>()
                .join("\n")
        );
        let summary_text = self.llm.completion(&prompt).await?;

        let model = self.llm.model().to_string();
        let count = messages.len();
        let stored = self
            .db
            .run_blocking(move |db| {
                db.save_user_summary(&uid, summary_text.trim(), &model, count)?;
                db.get_user_summary(&uid)
            })
            .await?
            .ok_or_else(|| anyhow::anyhow!("Summary was not saved"))?;

        Ok(SummaryOutcome::Generated(stored))
    }
}

fn parse_sqlite_utc(ts: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S").ok()?;
    Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

/// Unparseable timestamps count as stale.
fn is_stale(updated_at: &str, max_age: Duration, now: DateTime<Utc>) -> bool {
    match parse_sqlite_utc(updated_at) {
        Some(ts) => now - ts > max_age,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::db::NewUserMessage;

    #[test]
    fn test_staleness() {
        let now = parse_sqlite_utc("2024-06-02 12:00:00").unwrap();
        assert!(!is_stale("2024-06-02 00:00:00", Duration::hours(24), now));
        assert!(is_stale("2024-06-01 11:59:59", Duration::hours(24), now));
        assert!(is_stale("garbage", Duration::hours(24), now));
    }

    #[tokio::test]
    async fn test_not_enough_history() {
        let config = test_config();
        let db = Database::new(&config).unwrap();
        db.execute_init().unwrap();
        for i in 0..3 {
            db.log_user_message(&NewUserMessage {
                user_id: "7".into(),
                username: "u".into(),
                channel_id: "1".into(),
                message_id: format!("m{}", i),
                content: format!("message {}", i),
                timestamp: Utc::now().timestamp(),
                ..Default::default()
            })
            .unwrap();
        }

        let summarizer = UserSummarizer::new(db, LlmClient::new(&config).unwrap(), 24);
        match summarizer.get_or_refresh(7, "u", false).await.unwrap() {
            SummaryOutcome::NotEnoughHistory { found } => assert_eq!(found, 3),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fresh_summary_is_cached() {
        let config = test_config();
        let db = Database::new(&config).unwrap();
        db.execute_init().unwrap();
        db.save_user_summary("7", "Enjoys Rust.", "test-model", 12).unwrap();

        let summarizer = UserSummarizer::new(db, LlmClient::new(&config).unwrap(), 24);
        match summarizer.get_or_refresh(7, "u", false).await.unwrap() {
            SummaryOutcome::Cached(s) => assert_eq!(s.summary, "Enjoys Rust."),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
