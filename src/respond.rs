//! The shared reply pipeline used by both mentions and `/gork`.

use crate::cache::CachedMessage;
use crate::content_filter::ContentSettings;
use crate::context::{ConversationContext, UserInput};
use crate::system_prompt::{build_system_prompt, ChatMode, PromptOptions};
use crate::tools::process_directives;
use crate::Data;
use std::time::Instant;
use tracing::{debug, info};

pub struct ReplyRequest {
    pub user_id: u64,
    pub is_dm: bool,
    pub mode: ChatMode,
    /// Excluded from the user's stored conversation context
    pub message_id: Option<String>,
    pub channel_history: Vec<CachedMessage>,
    pub input: UserInput,
}

#[derive(Debug, Clone)]
pub struct GeneratedReply {
    pub text: String,
    pub model: String,
    pub tokens_used: Option<u32>,
    pub elapsed_ms: i64,
    pub directives: Vec<&'static str>,
}

pub async fn generate_reply(data: &Data, request: ReplyRequest) -> anyhow::Result<GeneratedReply> {
    let started = Instant::now();

    let uid = request.user_id.to_string();
    let exclude = request.message_id.clone();
    let limit = data.config.context_message_limit;
    let (settings, summary, history) = data
        .db
        .run_blocking(move |db| {
            let settings = db.get_user_settings(&uid)?;
            let summary = db.get_user_summary(&uid)?;
            let history = db.get_conversation_context(&uid, limit, exclude.as_deref())?;
            Ok((settings, summary, history))
        })
        .await?;

    let content = ContentSettings::from(&settings);
    let tool_instructions = data.tools.prompt_instructions();
    let system_prompt = build_system_prompt(&PromptOptions {
        is_dm: request.is_dm,
        mode: request.mode,
        content,
        tool_instructions: &tool_instructions,
        user_summary: summary.as_ref().map(|s| s.summary.as_str()),
    });

    // Random chatter is about the channel, not the user's own thread
    let history = match request.mode {
        ChatMode::Direct => history,
        ChatMode::Random => Vec::new(),
    };
    let messages =
        ConversationContext::build(system_prompt, &request.channel_history, &history, &request.input)?;
    debug!(
        "Reply for user {}: {} messages ({} from history)",
        request.user_id,
        messages.len(),
        history.len()
    );

    let reply = data.llm_client.chat(messages).await?;
    let outcome = process_directives(&data.tools, &reply.content).await;
    if !outcome.executed.is_empty() {
        info!("Executed directives for user {}: {:?}", request.user_id, outcome.executed);
    }

    Ok(GeneratedReply {
        text: format!("{}{}", content.warning_prefix(), outcome.text),
        model: reply.model,
        tokens_used: reply.tokens_used,
        elapsed_ms: started.elapsed().as_millis() as i64,
        directives: outcome.executed,
    })
}
