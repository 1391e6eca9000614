use crate::db::Database;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

/// Periodically deletes logged messages older than the retention window.
pub struct RetentionSweeper {
    db: Database,
    retention_days: u64,
    period: Duration,
}

impl RetentionSweeper {
    pub fn new(db: Database, retention_days: u64, period: Duration) -> Self {
        Self {
            db,
            retention_days,
            period,
        }
    }

    pub async fn run(self) {
        info!(
            "Retention sweeper: keeping {} days, running every {}",
            self.retention_days,
            humantime::format_duration(self.period)
        );
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.sweep().await {
                error!("Retention sweep failed: {}", e);
            }
        }
    }

    pub async fn sweep(&self) -> anyhow::Result<usize> {
        let days = self.retention_days;
        let deleted = self
            .db
            .run_blocking(move |db| db.cleanup_old_messages(days))
            .await?;
        if deleted > 0 {
            info!("Retention sweep removed {} rows older than {} days", deleted, days);
        } else {
            debug!("Retention sweep: nothing to remove");
        }
        Ok(deleted)
    }
}
