use std::sync::Arc;
use async_trait::async_trait;
use regex::Regex;

pub mod builtin;
pub mod directive;

pub use directive::{process_directives, DirectiveOutcome};

/// Directive keywords in the order they are processed.
pub const DIRECTIVE_PRIORITY: [&str; 7] = [
    "EXECUTE_COMMAND",
    "WEB_SEARCH",
    "VISIT_WEBSITE",
    "GET_WEATHER",
    "STEAM_SEARCH",
    "STEAM_USER",
    "SPOTIFY_SEARCH",
];

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("No argument given for {0}")]
    MissingArgument(&'static str),
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("Command not allowed: {0}")]
    DisallowedCommand(String),
    #[error("Timed out after {0}s")]
    Timeout(u64),
    #[error("{message} (HTTP {status})")]
    HttpStatus { status: u16, message: String },
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Could not parse response: {0}")]
    Parse(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// A capability the model can invoke by writing `**DIRECTIVE:** argument`
/// on its own line.
#[async_trait]
pub trait Tool: Send + Sync {
    fn directive(&self) -> &'static str;
    fn description(&self) -> &str;
    fn usage(&self) -> &str;
    async fn execute(&self, argument: &str) -> Result<String, ToolError>;
}

pub(crate) struct RegisteredTool {
    pub tool: Arc<dyn Tool>,
    pub pattern: Regex,
}

/// Tools kept sorted by `DIRECTIVE_PRIORITY`; unknown directives sort last.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> anyhow::Result<()> {
        let directive = tool.directive();
        let pattern = Regex::new(&format!(
            r"(?m)^[ \t]*(?:\*\*)?{}:(?:\*\*)?[ \t]*(.*)$",
            regex::escape(directive)
        ))?;

        self.tools.retain(|t| t.tool.directive() != directive);
        self.tools.push(RegisteredTool { tool, pattern });
        self.tools.sort_by_key(|t| priority_of(t.tool.directive()));
        Ok(())
    }

    pub fn get(&self, directive: &str) -> Option<Arc<dyn Tool>> {
        self.tools
            .iter()
            .find(|t| t.tool.directive() == directive)
            .map(|t| t.tool.clone())
    }

    pub fn list_tools(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.iter().map(|t| t.tool.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub(crate) fn entries(&self) -> &[RegisteredTool] {
        &self.tools
    }

    /// Tool instructions for the system prompt. Empty when nothing is registered.
    pub fn prompt_instructions(&self) -> String {
        if self.tools.is_empty() {
            return String::new();
        }

        let mut out = String::from(
            "\n\nTOOLS:\nYou can fetch live data by writing a directive on its own line. \
             The line is replaced with the tool's result before your message is sent. \
             Use at most one directive of each kind per reply.\n",
        );
        for entry in &self.tools {
            out.push_str(&format!(
                "- **{}:** {} ({})\n",
                entry.tool.directive(),
                entry.tool.usage(),
                entry.tool.description()
            ));
        }
        out
    }
}

fn priority_of(directive: &str) -> usize {
    DIRECTIVE_PRIORITY
        .iter()
        .position(|d| *d == directive)
        .unwrap_or(DIRECTIVE_PRIORITY.len())
}


#[cfg(test)]
mod tests {
    use super::test_support::EchoTool;
    use super::*;

    #[test]
    fn test_registry_orders_by_priority() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool("SPOTIFY_SEARCH"))).unwrap();
        registry.register(Arc::new(EchoTool("CUSTOM"))).unwrap();
        registry.register(Arc::new(EchoTool("WEB_SEARCH"))).unwrap();
        registry.register(Arc::new(EchoTool("EXECUTE_COMMAND"))).unwrap();

        let order: Vec<&str> = registry.list_tools().iter().map(|t| t.directive()).collect();
        assert_eq!(order, vec!["EXECUTE_COMMAND", "WEB_SEARCH", "SPOTIFY_SEARCH", "CUSTOM"]);
    }

    #[test]
    fn test_reregister_replaces() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool("WEB_SEARCH"))).unwrap();
        registry.register(Arc::new(EchoTool("WEB_SEARCH"))).unwrap();
        assert_eq!(registry.list_tools().len(), 1);
        assert!(registry.get("WEB_SEARCH").is_some());
        assert!(registry.get("GET_WEATHER").is_none());
    }

    #[test]
    fn test_prompt_instructions() {
        let empty = ToolRegistry::new();
        assert!(empty.prompt_instructions().is_empty());

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool("GET_WEATHER"))).unwrap();
        let text = registry.prompt_instructions();
        assert!(text.contains("**GET_WEATHER:** <text>"));
    }
}
