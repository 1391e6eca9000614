//! Builds the message list sent to the model.
//!
//! Order: system prompt, recent channel chatter (servers only), the user's
//! own logged conversation, then the new user message. A replied-to message
//! is folded into the user message as quoted context.

use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestMessageContentPartImageArgs, ChatCompletionRequestMessageContentPartTextArgs,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart, ImageDetail,
    ImageUrlArgs,
};

use crate::cache::CachedMessage;
use crate::db::{ConversationTurn, Role};

/// The message being answered.
#[derive(Debug, Clone, Default)]
pub struct UserInput {
    pub text: String,
    pub image_urls: Vec<String>,
    /// `(author display name, content)` of the message being replied to
    pub replied_to: Option<(String, String)>,
}

impl UserInput {
    pub fn full_text(&self) -> String {
        let mut text = self.text.clone();
        if let Some((author, content)) = &self.replied_to {
            if !content.trim().is_empty() {
                text.push_str(&format!(
                    "\n\nContext (message being replied to):\nFrom {}: {}",
                    author, content
                ));
            }
        }
        text
    }
}

pub struct ConversationContext;

impl ConversationContext {
    pub fn build(
        system_prompt: String,
        channel_history: &[CachedMessage],
        history: &[ConversationTurn],
        input: &UserInput,
    ) -> anyhow::Result<Vec<ChatCompletionRequestMessage>> {
        let mut messages: Vec<ChatCompletionRequestMessage> = vec![ChatCompletionRequestSystemMessageArgs::default()
            .content(system_prompt)
            .build()?
            .into()];

        if let Some(recent) = Self::format_channel_history(channel_history) {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(recent)
                    .build()?
                    .into(),
            );
        }

        for turn in history.iter().filter(|t| !t.content.trim().is_empty()) {
            let msg: ChatCompletionRequestMessage = match turn.role {
                Role::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(turn.content.clone())
                    .build()?
                    .into(),
                Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(turn.content.clone())
                    .build()?
                    .into(),
            };
            messages.push(msg);
        }

        messages.push(Self::user_message(input)?);
        Ok(messages)
    }

    fn format_channel_history(channel_history: &[CachedMessage]) -> Option<String> {
        let lines: Vec<String> = channel_history
            .iter()
            .filter(|m| !m.content.trim().is_empty())
            .map(|m| format!("[{}]: {}", m.author_name, m.content))
            .collect();

        if lines.is_empty() {
            None
        } else {
            Some(format!("Recent messages in this channel (oldest first):\n{}", lines.join("\n")))
        }
    }

    /// Plain text, or text plus image parts when images are attached.
    fn user_message(input: &UserInput) -> anyhow::Result<ChatCompletionRequestMessage> {
        let text = input.full_text();
        if input.image_urls.is_empty() {
            return Ok(ChatCompletionRequestUserMessageArgs::default()
                .content(text)
                .build()?
                .into());
        }

        let text = if text.trim().is_empty() {
            "What is in this image?".to_string()
        } else {
            text
        };
        let mut parts = vec![ChatCompletionRequestUserMessageContentPart::Text(
            ChatCompletionRequestMessageContentPartTextArgs::default()
                .text(text)
                .build()?,
        )];
        for url in &input.image_urls {
            parts.push(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImageArgs::default()
                    .image_url(ImageUrlArgs::default().url(url.as_str()).detail(ImageDetail::Auto).build()?)
                    .build()?,
            ));
        }

        Ok(ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Array(parts))
            .build()?
            .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: Role, content: &str) -> ConversationTurn {
        ConversationTurn {
            role,
            content: content.to_string(),
            timestamp: "2024-01-01 00:00:00".to_string(),
            has_attachments: false,
            model_used: None,
        }
    }

    fn cached(id: u64, name: &str, content: &str) -> CachedMessage {
        CachedMessage {
            message_id: id,
            author_id: id,
            author_name: name.to_string(),
            content: content.to_string(),
            is_bot: false,
        }
    }

    #[test]
    fn test_message_order() {
        let history = vec![turn(Role::User, "hi"), turn(Role::Assistant, "hello!"), turn(Role::User, "")];
        let channel = vec![cached(1, "Alice", "anyone here?"), cached(2, "Bob", "")];
        let input = UserInput { text: "what's up".into(), ..Default::default() };

        let messages = ConversationContext::build("sys".into(), &channel, &history, &input).unwrap();
        assert_eq!(messages.len(), 5);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(messages[2], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(messages[3], ChatCompletionRequestMessage::Assistant(_)));
        assert!(matches!(messages[4], ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_no_channel_history() {
        let input = UserInput { text: "hey".into(), ..Default::default() };
        let messages = ConversationContext::build("sys".into(), &[], &[], &input).unwrap();
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn test_reply_context_folded_in() {
        let input = UserInput {
            text: "is this right?".into(),
            image_urls: vec![],
            replied_to: Some(("Alice".into(), "2 + 2 = 5".into())),
        };
        assert_eq!(
            input.full_text(),
            "is this right?\n\nContext (message being replied to):\nFrom Alice: 2 + 2 = 5"
        );
    }

    #[test]
    fn test_images_become_parts() {
        let input = UserInput {
            text: String::new(),
            image_urls: vec!["https://cdn.example/cat.png".into()],
            replied_to: None,
        };
        let messages = ConversationContext::build("sys".into(), &[], &[], &input).unwrap();
        let ChatCompletionRequestMessage::User(user) = &messages[1] else {
            panic!("expected user message");
        };
        let ChatCompletionRequestUserMessageContent::Array(parts) = &user.content else {
            panic!("expected multimodal content");
        };
        assert_eq!(parts.len(), 2);
        assert!(matches!(parts[1], ChatCompletionRequestUserMessageContentPart::ImageUrl(_)));
    }
}
