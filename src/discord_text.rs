use poise::serenity_prelude as serenity;
use crate::config::DISCORD_MESSAGE_LIMIT;

pub fn strip_bot_mentions(input: &str, bot_id: u64) -> String {
    let mention = format!("<@{}>", bot_id);
    let mention_nick = format!("<@!{}>", bot_id);

    input
        .replace(&mention, "")
        .replace(&mention_nick, "")
        .trim()
        .to_string()
}

/// Message content plus any embed text, one part per line.
pub fn extract_message_text(message: &serenity::Message) -> String {
    let mut parts = Vec::new();

    let content = message.content.trim();
    if !content.is_empty() {
        parts.push(content.to_string());
    }

    for embed in &message.embeds {
        if let Some(title) = embed.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            parts.push(title.to_string());
        }
        if let Some(desc) = embed.description.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            parts.push(desc.to_string());
        }
        for field in &embed.fields {
            let name = field.name.trim();
            let value = field.value.trim();
            match (name.is_empty(), value.is_empty()) {
                (true, true) => {}
                (true, false) => parts.push(value.to_string()),
                (false, true) => parts.push(name.to_string()),
                (false, false) => parts.push(format!("{}: {}", name, value)),
            }
        }
    }

    parts.join("\n")
}

/// Split into chunks Discord will accept. Concatenating the chunks gives back
/// the input; cuts prefer the last newline, then the last space, and never
/// land inside a UTF-8 character.
pub fn split_message(text: &str) -> Vec<String> {
    split_with_limit(text, DISCORD_MESSAGE_LIMIT)
}

pub fn split_with_limit(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(4);
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.len() > limit {
        let mut hard = limit;
        while !rest.is_char_boundary(hard) {
            hard -= 1;
        }
        let window = &rest[..hard];
        // Don't produce tiny leading chunks just to honor a newline
        let min_cut = hard / 2;
        let cut = window
            .rfind('\n')
            .map(|i| i + 1)
            .filter(|&i| i > min_cut)
            .or_else(|| window.rfind(' ').map(|i| i + 1).filter(|&i| i > min_cut))
            .unwrap_or(hard);

        chunks.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }

    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

/// Truncate to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Wraps lines into code-block messages no longer than `limit` bytes each.
pub fn code_block_chunks(lines: &[String], limit: usize) -> Vec<String> {
    const FENCE: usize = "```\n".len() + "\n```".len();
    let body_limit = limit.saturating_sub(FENCE).max(16);

    let mut chunks = Vec::new();
    let mut current = String::new();
    for line in lines {
        for piece in split_with_limit(line, body_limit) {
            if !current.is_empty() && current.len() + piece.len() + 1 > body_limit {
                chunks.push(format!("```\n{}\n```", current));
                current.clear();
            }
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(&piece.replace("```", "'''"));
        }
    }
    if !current.is_empty() {
        chunks.push(format!("```\n{}\n```", current));
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_both_mention_forms() {
        assert_eq!(strip_bot_mentions("<@42> hi <@!42>", 42), "hi");
        assert_eq!(strip_bot_mentions("<@43> hi", 42), "<@43> hi");
    }

    #[test]
    fn short_text_is_single_chunk() {
        assert_eq!(split_message("hello"), vec!["hello".to_string()]);
        assert_eq!(split_message(""), vec![String::new()]);
    }

    #[test]
    fn chunks_respect_limit_and_reassemble() {
        let text = "line of text\n".repeat(400);
        let chunks = split_message(&text);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() <= DISCORD_MESSAGE_LIMIT));
        assert_eq!(chunks.concat(), text);
        // Cuts happen after newlines
        assert!(chunks[..chunks.len() - 1].iter().all(|c| c.ends_with('\n')));
    }

    #[test]
    fn never_splits_multibyte_chars() {
        let text = "é".repeat(3000);
        let chunks = split_message(&text);
        assert!(chunks.iter().all(|c| c.len() <= DISCORD_MESSAGE_LIMIT));
        assert_eq!(chunks.concat(), text);

        let emoji = "🦀".repeat(1001);
        let chunks = split_with_limit(&emoji, 10);
        assert!(chunks.iter().all(|c| c.len() <= 10));
        assert_eq!(chunks.concat(), emoji);
    }

    #[test]
    fn truncates_by_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("ééé", 2), "éé...");
    }

    #[test]
    fn code_block_chunks_fit_limit() {
        let lines: Vec<String> = (0..200).map(|i| format!("[2024-01-01] User: message {}", i)).collect();
        let chunks = code_block_chunks(&lines, 1900);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 1900);
            assert!(chunk.starts_with("```\n") && chunk.ends_with("\n```"));
        }
        assert!(chunks.concat().contains("message 199"));
    }
}
