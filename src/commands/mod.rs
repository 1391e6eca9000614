pub mod admin;
pub mod chat;
pub mod logs;
pub mod server;
pub mod settings;
pub mod status;
pub mod summary;
pub mod weather;

use crate::{Data, Error};
use poise::serenity_prelude as serenity;

pub const COLOR_BLURPLE: u32 = 0x5865F2;
pub const COLOR_GREEN: u32 = 0x57F287;
pub const COLOR_RED: u32 = 0xED4245;
pub const COLOR_BLUE: u32 = 0x3498DB;
pub const COLOR_PURPLE: u32 = 0x9B59B6;
pub const COLOR_ORANGE: u32 = 0xE67E22;

/// Every slash command the bot registers.
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        chat::gork(),
        chat::gork_status(),
        weather::weather(),
        weather::forecast(),
        settings::nsfw_mode(),
        settings::content_filter(),
        settings::my_settings(),
        settings::link_steam(),
        settings::nsfw_stats(),
        server::gorksettings(),
        server::server_status(),
        logs::message_stats(),
        logs::message_history(),
        logs::logs(),
        logs::cleanup_messages(),
        logs::db_stats(),
        status::setstatus(),
        status::clearstatus(),
        status::statusinfo(),
        summary::user_summary(),
        admin::shutdown(),
    ]
}

pub(crate) fn error_embed(title: &str, description: impl Into<String>) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title)
        .description(description)
        .color(COLOR_RED)
}

pub(crate) fn ephemeral(embed: serenity::CreateEmbed) -> poise::CreateReply {
    poise::CreateReply::default().embed(embed).ephemeral(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_command_names_are_unique() {
        let commands = all();
        let names: HashSet<_> = commands.iter().map(|c| c.name.clone()).collect();
        assert_eq!(names.len(), commands.len());
        assert!(names.contains("gork"));
        assert!(names.contains("gorksettings"));
    }

    #[test]
    fn test_owner_only_commands() {
        let owner_only: HashSet<_> = all()
            .into_iter()
            .filter(|c| c.owners_only)
            .map(|c| c.name)
            .collect();
        for name in [
            "nsfw_stats",
            "logs",
            "cleanup_messages",
            "db_stats",
            "setstatus",
            "clearstatus",
            "statusinfo",
            "shutdown",
        ] {
            assert!(owner_only.contains(name), "{} should be owner only", name);
        }
        assert!(!owner_only.contains("gork"));
    }

    #[test]
    fn test_gorksettings_subcommands() {
        let cmd = server::gorksettings();
        let subs: Vec<_> = cmd.subcommands.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(subs, vec!["random_messages", "bot_reply", "reply_all"]);
        assert!(cmd.guild_only);
    }
}
