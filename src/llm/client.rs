use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use std::time::Duration;
use tracing::{debug, warn};
use crate::config::Config;

/// A completed chat turn.
#[derive(Debug, Clone)]
pub struct LlmReply {
    pub content: String,
    pub model: String,
    pub tokens_used: Option<u32>,
}

/// OpenRouter speaks the OpenAI chat-completions protocol, so the OpenAI
/// client is pointed at its base URL.
#[derive(Clone)]
pub struct LlmClient {
    chat_client: Client<OpenAIConfig>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    configured: bool,
}

impl LlmClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        if config.openrouter_api_key.is_none() {
            warn!("OPENROUTER_API_KEY not set; chat requests will fail");
        }

        let chat_config = OpenAIConfig::new()
            .with_api_base(&config.openrouter_url)
            .with_api_key(config.openrouter_api_key.clone().unwrap_or_default());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()?;

        Ok(Self {
            chat_client: Client::with_config(chat_config).with_http_client(http),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            configured: config.openrouter_api_key.is_some(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    #[allow(deprecated)]
    pub async fn chat(&self, messages: Vec<ChatCompletionRequestMessage>) -> anyhow::Result<LlmReply> {
        if !self.configured {
            return Err(anyhow::anyhow!("OpenRouter API key not configured"));
        }

        debug!("LLM: Sending {} messages to {}", messages.len(), self.model);
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .build()?;

        let response = self.chat_client.chat().create(request).await?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("No response from LLM"))?;

        Ok(LlmReply {
            content,
            model: response.model,
            tokens_used: response.usage.map(|u| u.total_tokens),
        })
    }

    /// Single-prompt convenience wrapper.
    pub async fn completion(&self, prompt: &str) -> anyhow::Result<String> {
        let messages = vec![ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()?
            .into()];
        Ok(self.chat(messages).await?.content)
    }
}
