/// Idempotent schema shared with the web admin panel, which reads the same file.
pub const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        username TEXT NOT NULL,
        user_display_name TEXT,
        channel_id TEXT NOT NULL,
        channel_name TEXT,
        guild_id TEXT,
        guild_name TEXT,
        message_id TEXT NOT NULL UNIQUE,
        message_content TEXT NOT NULL,
        message_type TEXT DEFAULT 'user',
        has_attachments BOOLEAN DEFAULT FALSE,
        attachment_info TEXT,
        timestamp DATETIME NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );
    CREATE INDEX IF NOT EXISTS idx_messages_user_id ON messages (user_id);
    CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages (timestamp);
    CREATE INDEX IF NOT EXISTS idx_messages_channel ON messages (channel_id, timestamp);

    CREATE TABLE IF NOT EXISTS responses (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        original_message_id TEXT NOT NULL,
        response_message_id TEXT NOT NULL UNIQUE,
        response_content TEXT NOT NULL,
        response_chunks INTEGER DEFAULT 1,
        chunk_number INTEGER DEFAULT 1,
        processing_time_ms INTEGER,
        model_used TEXT,
        tokens_used INTEGER,
        timestamp DATETIME NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (original_message_id) REFERENCES messages (message_id)
    );
    CREATE INDEX IF NOT EXISTS idx_responses_original_message ON responses (original_message_id);
    CREATE INDEX IF NOT EXISTS idx_responses_timestamp ON responses (timestamp);

    CREATE TABLE IF NOT EXISTS user_settings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL UNIQUE,
        username TEXT,
        user_display_name TEXT,
        nsfw_mode BOOLEAN DEFAULT FALSE,
        content_filter_level TEXT DEFAULT 'strict',
        steam_id TEXT,
        steam_username TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );
    CREATE INDEX IF NOT EXISTS idx_user_settings_steam_id ON user_settings (steam_id);

    CREATE TABLE IF NOT EXISTS guild_settings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        guild_id TEXT NOT NULL UNIQUE,
        guild_name TEXT,
        random_messages_enabled BOOLEAN DEFAULT FALSE,
        bot_reply_enabled BOOLEAN DEFAULT FALSE,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS channel_settings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        channel_id TEXT NOT NULL UNIQUE,
        guild_id TEXT,
        reply_all_enabled BOOLEAN DEFAULT FALSE,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );
    CREATE INDEX IF NOT EXISTS idx_channel_settings_guild ON channel_settings (guild_id);

    CREATE TABLE IF NOT EXISTS user_summaries (
        user_id TEXT PRIMARY KEY,
        summary TEXT NOT NULL,
        model_used TEXT,
        message_count INTEGER DEFAULT 0,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );
";
