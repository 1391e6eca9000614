//! System prompt construction.
//!
//! The prompt is rebuilt for every request: persona, where the conversation
//! happens, the current time, the user's content-filter guidelines, the tool
//! directives that are available and, when cached, a short profile of the user.

use crate::content_filter::ContentSettings;
use chrono::{Local, Utc};

/// Format current date and time for inclusion in system prompts
///
/// ```text
/// Current date/time: Wednesday, February 05, 2025, 14:30:15 UTC (2025-02-05T14:30:15+00:00)
/// Local time: Wednesday, February 05, 2025, 09:30:15 -05:00 (2025-02-05T09:30:15-05:00)
/// ```
pub fn get_datetime_context() -> String {
    let utc_now = Utc::now();
    let local_now = Local::now();

    format!(
        "Current date/time: {}, {} UTC ({})\nLocal time: {}, {} ({})",
        utc_now.format("%A, %B %d, %Y"),
        utc_now.format("%H:%M:%S"),
        utc_now.to_rfc3339(),
        local_now.format("%A, %B %d, %Y"),
        local_now.format("%H:%M:%S %Z"),
        local_now.to_rfc3339()
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    /// Someone talked to the bot.
    Direct,
    /// Unprompted message in a channel with random messages enabled.
    Random,
}

pub struct PromptOptions<'a> {
    pub is_dm: bool,
    pub mode: ChatMode,
    pub content: ContentSettings,
    /// Output of `ToolRegistry::prompt_instructions`.
    pub tool_instructions: &'a str,
    pub user_summary: Option<&'a str>,
}

pub fn build_system_prompt(opts: &PromptOptions<'_>) -> String {
    let place = if opts.is_dm { "DM" } else { "Discord server" };
    let mut prompt = format!(
        "You are Gork, a helpful AI assistant on Discord. You are currently chatting in a {}. \
         You are friendly, knowledgeable, and concise in your responses. \
         Keep responses under 2000 characters to fit Discord's message limit.\n\n{}",
        place,
        get_datetime_context()
    );

    if opts.mode == ChatMode::Random {
        prompt.push_str(
            "\n\nNobody addressed you directly. Based on the recent channel history, write the \
             single most likely next message in the conversation, in the same tone as the channel. \
             Reply with the message text only.",
        );
    }

    prompt.push_str(opts.content.system_prompt_addition());
    prompt.push_str(&format!(
        "\n- When declining a request, answer along the lines of: \"{}\"",
        opts.content.decline_message()
    ));
    prompt.push_str(opts.tool_instructions);

    if let Some(summary) = opts.user_summary.filter(|s| !s.trim().is_empty()) {
        prompt.push_str("\n\nWhat you know about the user you are talking to:\n");
        prompt.push_str(summary.trim());
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_filter::FilterLevel;

    fn options<'a>(is_dm: bool) -> PromptOptions<'a> {
        PromptOptions {
            is_dm,
            mode: ChatMode::Direct,
            content: ContentSettings::default(),
            tool_instructions: "",
            user_summary: None,
        }
    }

    #[test]
    fn test_datetime_context_format() {
        let context = get_datetime_context();
        assert!(context.contains("Current date/time:"));
        assert!(context.contains("UTC"));
        assert!(context.contains("Local time:"));
    }

    #[test]
    fn test_dm_vs_server() {
        assert!(build_system_prompt(&options(true)).contains("chatting in a DM."));
        assert!(build_system_prompt(&options(false)).contains("chatting in a Discord server."));
    }

    #[test]
    fn test_sections_included() {
        let opts = PromptOptions {
            mode: ChatMode::Random,
            content: ContentSettings { nsfw_mode: true, level: FilterLevel::Moderate },
            tool_instructions: "\n\nTOOLS:\n- **WEB_SEARCH:** <query>",
            user_summary: Some("Likes Rust and cats."),
            ..options(false)
        };
        let prompt = build_system_prompt(&opts);
        assert!(prompt.contains("most likely next message"));
        assert!(prompt.contains("CONTENT GUIDELINES:"));
        assert!(prompt.contains("I can discuss mature topics in an educational context"));
        assert!(prompt.contains("**WEB_SEARCH:**"));
        assert!(prompt.ends_with("Likes Rust and cats."));
    }
}
