//! Replaces tool directives in model output with the tool's result.
//!
//! Each registered directive is handled at most once per reply: the first
//! matching line is executed and substituted, later duplicates are left as
//! written. Only the model output is scanned, never the tool results. Tool
//! failures never escape; they become inline `❌` text.

use super::{ToolError, ToolRegistry};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveOutcome {
    pub text: String,
    /// Directives that ran, in execution order.
    pub executed: Vec<&'static str>,
}

pub async fn process_directives(registry: &ToolRegistry, input: &str) -> DirectiveOutcome {
    // Matches are taken from the model output only, so directive-looking
    // lines inside tool results are never executed.
    let mut found = Vec::new();
    for entry in registry.entries() {
        let Some(caps) = entry.pattern.captures(input) else {
            continue;
        };
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let argument = caps
            .get(1)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        found.push((whole.range(), entry, argument));
    }

    let mut executed = Vec::new();
    let mut replacements = Vec::with_capacity(found.len());
    for (range, entry, argument) in found {
        let directive = entry.tool.directive();
        let result = if argument.is_empty() {
            Err(ToolError::MissingArgument(directive))
        } else {
            debug!("Running {} with argument: {}", directive, argument);
            entry.tool.execute(&argument).await
        };

        let replacement = match result {
            Ok(output) => output,
            Err(e) => {
                warn!("{} failed: {}", directive, e);
                format!("❌ {} failed: {}", directive, e)
            }
        };
        executed.push(directive);
        replacements.push((range, replacement));
    }

    // Splice back to front so earlier ranges stay valid
    replacements.sort_by_key(|(range, _)| std::cmp::Reverse(range.start));
    let mut text = input.to_string();
    for (range, replacement) in replacements {
        text.replace_range(range, &replacement);
    }

    DirectiveOutcome { text, executed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{CannedTool, EchoTool};
    use std::sync::Arc;

    fn registry(directives: &[&'static str]) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        for d in directives {
            registry.register(Arc::new(EchoTool(d))).unwrap();
        }
        registry
    }

    #[tokio::test]
    async fn test_plain_text_unchanged() {
        let reg = registry(&["WEB_SEARCH"]);
        let input = "Just a normal reply.\nNothing to see.";
        let out = process_directives(&reg, input).await;
        assert_eq!(out.text, input);
        assert!(out.executed.is_empty());
    }

    #[tokio::test]
    async fn test_substitutes_in_place() {
        let reg = registry(&["WEB_SEARCH"]);
        let out = process_directives(&reg, "Let me check.\n**WEB_SEARCH:** rust news\nDone.").await;
        assert_eq!(out.text, "Let me check.\n[WEB_SEARCH:rust news]\nDone.");
        assert_eq!(out.executed, vec!["WEB_SEARCH"]);
    }

    #[tokio::test]
    async fn test_bold_markers_optional() {
        let reg = registry(&["GET_WEATHER"]);
        let out = process_directives(&reg, "  GET_WEATHER: Paris").await;
        assert_eq!(out.text, "[GET_WEATHER:Paris]");
    }

    #[tokio::test]
    async fn test_only_first_occurrence() {
        let reg = registry(&["WEB_SEARCH"]);
        let out = process_directives(&reg, "**WEB_SEARCH:** one\n**WEB_SEARCH:** two").await;
        assert_eq!(out.text, "[WEB_SEARCH:one]\n**WEB_SEARCH:** two");
        assert_eq!(out.executed.len(), 1);
    }

    #[tokio::test]
    async fn test_priority_order() {
        let reg = registry(&["STEAM_SEARCH", "EXECUTE_COMMAND", "WEB_SEARCH"]);
        let input = "**STEAM_SEARCH:** portal\n**WEB_SEARCH:** news\n**EXECUTE_COMMAND:** uptime";
        let out = process_directives(&reg, input).await;
        assert_eq!(out.executed, vec!["EXECUTE_COMMAND", "WEB_SEARCH", "STEAM_SEARCH"]);
        assert_eq!(
            out.text,
            "[STEAM_SEARCH:portal]\n[WEB_SEARCH:news]\n[EXECUTE_COMMAND:uptime]"
        );
    }

    #[tokio::test]
    async fn test_errors_inline() {
        let reg = registry(&["VISIT_WEBSITE", "WEB_SEARCH"]);
        let out = process_directives(&reg, "**VISIT_WEBSITE:** fail\n**WEB_SEARCH:**   ").await;
        let lines: Vec<&str> = out.text.lines().collect();
        assert_eq!(lines[0], "❌ VISIT_WEBSITE failed: Could not parse response: bad input");
        assert_eq!(lines[1], "❌ WEB_SEARCH failed: No argument given for WEB_SEARCH");
    }

    #[tokio::test]
    async fn test_unregistered_directive_untouched() {
        let reg = registry(&["WEB_SEARCH"]);
        let input = "**SPOTIFY_SEARCH:** daft punk";
        let out = process_directives(&reg, input).await;
        assert_eq!(out.text, input);
    }

    #[tokio::test]
    async fn test_mid_line_mention_ignored() {
        let reg = registry(&["WEB_SEARCH"]);
        let input = "You could write WEB_SEARCH: something yourself.";
        let out = process_directives(&reg, input).await;
        assert_eq!(out.text, input);
    }

    #[tokio::test]
    async fn test_directives_in_tool_output_not_executed() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(CannedTool("VISIT_WEBSITE", "page\nSTEAM_USER: 999")))
            .unwrap();
        reg.register(Arc::new(EchoTool("STEAM_USER"))).unwrap();

        let out = process_directives(&reg, "**VISIT_WEBSITE:** x\n**STEAM_USER:** 42").await;
        assert_eq!(out.text, "page\nSTEAM_USER: 999\n[STEAM_USER:42]");
        assert_eq!(out.executed, vec!["VISIT_WEBSITE", "STEAM_USER"]);
    }
}
