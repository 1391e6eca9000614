use super::{
    ChannelSettings, Database, GuildSettings, GuildSettingsUpdate, SteamLinkCheck, UserSettings,
    UserSettingsUpdate, UserSummary,
};
use crate::content_filter::FilterLevel;
use rusqlite::OptionalExtension;

impl Database {
    // --- User settings ---

    /// Missing rows read as defaults (NSFW off, strict filtering, no Steam link).
    pub fn get_user_settings(&self, user_id: &str) -> anyhow::Result<UserSettings> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT username, nsfw_mode, content_filter_level, steam_id, steam_username, updated_at
                 FROM user_settings WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<bool>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((username, nsfw, level, steam_id, steam_username, updated_at)) = row else {
            return Ok(UserSettings {
                user_id: user_id.to_string(),
                ..Default::default()
            });
        };

        Ok(UserSettings {
            user_id: user_id.to_string(),
            username,
            nsfw_mode: nsfw.unwrap_or(false),
            content_filter_level: level
                .and_then(|l| l.parse().ok())
                .unwrap_or_default(),
            steam_id,
            steam_username,
            updated_at,
        })
    }

    pub fn update_user_settings(&self, user_id: &str, update: &UserSettingsUpdate) -> anyhow::Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO user_settings
                (user_id, username, user_display_name, nsfw_mode, content_filter_level, steam_id, steam_username)
             VALUES (?1, ?2, ?3, COALESCE(?4, FALSE), COALESCE(?5, 'strict'), ?6, ?7)
             ON CONFLICT(user_id) DO UPDATE SET
                username = COALESCE(?2, username),
                user_display_name = COALESCE(?3, user_display_name),
                nsfw_mode = COALESCE(?4, nsfw_mode),
                content_filter_level = COALESCE(?5, content_filter_level),
                steam_id = COALESCE(?6, steam_id),
                steam_username = COALESCE(?7, steam_username),
                updated_at = CURRENT_TIMESTAMP",
            rusqlite::params![
                user_id,
                update.username,
                update.user_display_name,
                update.nsfw_mode,
                update.content_filter_level.map(FilterLevel::as_str),
                update.steam_id,
                update.steam_username,
            ],
        )?;
        Ok(())
    }

    /// A Steam account may be linked to at most one Discord user.
    pub fn validate_steam_id_link(&self, steam_id: &str, user_id: &str) -> anyhow::Result<SteamLinkCheck> {
        let conn = self.conn()?;
        let owner: Option<String> = conn
            .query_row(
                "SELECT user_id FROM user_settings WHERE steam_id = ?1 AND user_id != ?2 LIMIT 1",
                (steam_id, user_id),
                |row| row.get(0),
            )
            .optional()?;
        Ok(match owner {
            Some(other) => SteamLinkCheck::LinkedToOtherUser(other),
            None => SteamLinkCheck::Available,
        })
    }

    /// Most recently updated first.
    pub fn get_users_with_nsfw_enabled(&self) -> anyhow::Result<Vec<UserSettings>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, username, content_filter_level, steam_id, steam_username, updated_at
             FROM user_settings
             WHERE nsfw_mode = 1
             ORDER BY updated_at DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(UserSettings {
                user_id: row.get(0)?,
                username: row.get(1)?,
                nsfw_mode: true,
                content_filter_level: row
                    .get::<_, Option<String>>(2)?
                    .and_then(|l| l.parse().ok())
                    .unwrap_or_default(),
                steam_id: row.get(3)?,
                steam_username: row.get(4)?,
                updated_at: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // --- Guild settings ---

    pub fn get_guild_settings(&self, guild_id: &str) -> anyhow::Result<GuildSettings> {
        let conn = self.conn()?;
        let settings = conn
            .query_row(
                "SELECT random_messages_enabled, bot_reply_enabled FROM guild_settings WHERE guild_id = ?1",
                [guild_id],
                |row| {
                    Ok(GuildSettings {
                        random_messages_enabled: row.get::<_, Option<bool>>(0)?.unwrap_or(false),
                        bot_reply_enabled: row.get::<_, Option<bool>>(1)?.unwrap_or(false),
                    })
                },
            )
            .optional()?;
        Ok(settings.unwrap_or_default())
    }

    pub fn update_guild_settings(&self, guild_id: &str, update: &GuildSettingsUpdate) -> anyhow::Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO guild_settings (guild_id, guild_name, random_messages_enabled, bot_reply_enabled)
             VALUES (?1, ?2, COALESCE(?3, FALSE), COALESCE(?4, FALSE))
             ON CONFLICT(guild_id) DO UPDATE SET
                guild_name = COALESCE(?2, guild_name),
                random_messages_enabled = COALESCE(?3, random_messages_enabled),
                bot_reply_enabled = COALESCE(?4, bot_reply_enabled),
                updated_at = CURRENT_TIMESTAMP",
            rusqlite::params![
                guild_id,
                update.guild_name,
                update.random_messages_enabled,
                update.bot_reply_enabled,
            ],
        )?;
        Ok(())
    }

    // --- Channel settings ---

    pub fn get_channel_settings(&self, channel_id: &str) -> anyhow::Result<ChannelSettings> {
        let conn = self.conn()?;
        let settings = conn
            .query_row(
                "SELECT reply_all_enabled FROM channel_settings WHERE channel_id = ?1",
                [channel_id],
                |row| {
                    Ok(ChannelSettings {
                        reply_all_enabled: row.get::<_, Option<bool>>(0)?.unwrap_or(false),
                    })
                },
            )
            .optional()?;
        Ok(settings.unwrap_or_default())
    }

    pub fn set_channel_reply_all(&self, channel_id: &str, guild_id: &str, enabled: bool) -> anyhow::Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO channel_settings (channel_id, guild_id, reply_all_enabled)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(channel_id) DO UPDATE SET
                reply_all_enabled = ?3,
                guild_id = ?2,
                updated_at = CURRENT_TIMESTAMP",
            (channel_id, guild_id, enabled),
        )?;
        Ok(())
    }

    // --- User summaries ---

    pub fn get_user_summary(&self, user_id: &str) -> anyhow::Result<Option<UserSummary>> {
        let conn = self.conn()?;
        let summary = conn
            .query_row(
                "SELECT user_id, summary, model_used, message_count, updated_at
                 FROM user_summaries WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(UserSummary {
                        user_id: row.get(0)?,
                        summary: row.get(1)?,
                        model_used: row.get(2)?,
                        message_count: row.get(3)?,
                        updated_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(summary)
    }

    pub fn save_user_summary(
        &self,
        user_id: &str,
        summary: &str,
        model_used: &str,
        message_count: usize,
    ) -> anyhow::Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO user_summaries (user_id, summary, model_used, message_count, updated_at)
             VALUES (?1, ?2, ?3, ?4, CURRENT_TIMESTAMP)
             ON CONFLICT(user_id) DO UPDATE SET
                summary = ?2, model_used = ?3, message_count = ?4, updated_at = CURRENT_TIMESTAMP",
            (user_id, summary, model_used, message_count as i64),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        let db = Database::open(":memory:").unwrap();
        db.execute_init().unwrap();
        db
    }

    #[test]
    fn test_user_settings_defaults_and_partial_update() {
        let db = test_db();

        let settings = db.get_user_settings("u1").unwrap();
        assert!(!settings.nsfw_mode);
        assert_eq!(settings.content_filter_level, FilterLevel::Strict);
        assert!(settings.steam_id.is_none());

        db.update_user_settings(
            "u1",
            &UserSettingsUpdate {
                username: Some("alice".to_string()),
                nsfw_mode: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
        db.update_user_settings(
            "u1",
            &UserSettingsUpdate {
                content_filter_level: Some(FilterLevel::Minimal),
                ..Default::default()
            },
        )
        .unwrap();

        let settings = db.get_user_settings("u1").unwrap();
        assert!(settings.nsfw_mode, "nsfw flag must survive a partial update");
        assert_eq!(settings.content_filter_level, FilterLevel::Minimal);
        assert_eq!(settings.username.as_deref(), Some("alice"));
    }

    #[test]
    fn test_steam_link_uniqueness() {
        let db = test_db();
        let steam_id = "76561198000000000";

        assert_eq!(db.validate_steam_id_link(steam_id, "u1").unwrap(), SteamLinkCheck::Available);
        db.update_user_settings(
            "u1",
            &UserSettingsUpdate {
                steam_id: Some(steam_id.to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        // Re-linking your own account is fine
        assert_eq!(db.validate_steam_id_link(steam_id, "u1").unwrap(), SteamLinkCheck::Available);
        assert_eq!(
            db.validate_steam_id_link(steam_id, "u2").unwrap(),
            SteamLinkCheck::LinkedToOtherUser("u1".to_string())
        );
    }

    #[test]
    fn test_nsfw_users_listing() {
        let db = test_db();
        db.update_user_settings("u1", &UserSettingsUpdate { nsfw_mode: Some(true), ..Default::default() }).unwrap();
        db.update_user_settings("u2", &UserSettingsUpdate { nsfw_mode: Some(false), ..Default::default() }).unwrap();
        let users = db.get_users_with_nsfw_enabled().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].user_id, "u1");
    }

    #[test]
    fn test_guild_and_channel_settings() {
        let db = test_db();
        assert_eq!(db.get_guild_settings("g1").unwrap(), GuildSettings::default());

        db.update_guild_settings(
            "g1",
            &GuildSettingsUpdate {
                guild_name: Some("Test".to_string()),
                random_messages_enabled: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
        db.update_guild_settings(
            "g1",
            &GuildSettingsUpdate {
                bot_reply_enabled: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
        let guild = db.get_guild_settings("g1").unwrap();
        assert!(guild.random_messages_enabled);
        assert!(guild.bot_reply_enabled);

        assert!(!db.get_channel_settings("c1").unwrap().reply_all_enabled);
        db.set_channel_reply_all("c1", "g1", true).unwrap();
        assert!(db.get_channel_settings("c1").unwrap().reply_all_enabled);
        db.set_channel_reply_all("c1", "g1", false).unwrap();
        assert!(!db.get_channel_settings("c1").unwrap().reply_all_enabled);
    }

    #[test]
    fn test_user_summary_upsert() {
        let db = test_db();
        assert!(db.get_user_summary("u1").unwrap().is_none());
        db.save_user_summary("u1", "Likes cats.", "m", 10).unwrap();
        db.save_user_summary("u1", "Likes cats and Rust.", "m", 20).unwrap();
        let summary = db.get_user_summary("u1").unwrap().unwrap();
        assert_eq!(summary.summary, "Likes cats and Rust.");
        assert_eq!(summary.message_count, 20);
    }
}
