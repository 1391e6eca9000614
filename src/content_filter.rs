//! Per-user content filtering.
//!
//! Filtering is enforced through the system prompt: each level contributes a
//! block of guidelines, and NSFW content is only unlocked when the user has
//! both enabled NSFW mode and chosen the `minimal` level.

use crate::db::UserSettings;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, poise::ChoiceParameter)]
pub enum FilterLevel {
    #[default]
    #[name = "Strict (Default)"]
    Strict,
    #[name = "Moderate"]
    Moderate,
    #[name = "Minimal (NSFW Mode Required)"]
    Minimal,
}

impl FilterLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterLevel::Strict => "strict",
            FilterLevel::Moderate => "moderate",
            FilterLevel::Minimal => "minimal",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            FilterLevel::Strict => "Strict",
            FilterLevel::Moderate => "Moderate",
            FilterLevel::Minimal => "Minimal",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            FilterLevel::Strict => "Maximum content filtering - blocks all potentially inappropriate content",
            FilterLevel::Moderate => "Balanced filtering - allows some mature topics with appropriate context",
            FilterLevel::Minimal => "Minimal filtering - allows NSFW content (requires NSFW mode)",
        }
    }

    fn system_addition(self) -> &'static str {
        match self {
            FilterLevel::Strict => {
                "\n\nIMPORTANT CONTENT GUIDELINES:\n\
                 - You must maintain strict content filtering\n\
                 - Avoid any sexual, violent, or inappropriate content\n\
                 - Decline requests for NSFW content politely\n\
                 - Keep all responses family-friendly and appropriate\n\
                 - If asked about mature topics, provide educational information only\n\
                 - Do not generate, describe, or discuss explicit content"
            }
            FilterLevel::Moderate => {
                "\n\nCONTENT GUIDELINES:\n\
                 - You can discuss mature topics in an educational or informational context\n\
                 - Avoid explicit sexual content or graphic violence\n\
                 - You may discuss relationships, health topics, and social issues appropriately\n\
                 - Keep responses tasteful and informative\n\
                 - Decline requests for explicit content politely"
            }
            FilterLevel::Minimal => {
                "\n\nCONTENT GUIDELINES (NSFW MODE ACTIVE):\n\
                 - NSFW mode is enabled for this user\n\
                 - You may discuss mature and adult content when requested\n\
                 - Still maintain respect and avoid harmful content\n\
                 - You can provide information on adult topics, relationships, and sexuality\n\
                 - Always prioritize user safety and well-being\n\
                 - Follow Discord's Terms of Service and community guidelines\n\
                 - Be helpful while remaining responsible"
            }
        }
    }

    fn decline_message(self) -> &'static str {
        match self {
            FilterLevel::Strict => "I'm configured to maintain family-friendly content. I can't assist with that request, but I'd be happy to help with something else!",
            FilterLevel::Moderate => "I can discuss mature topics in an educational context, but I can't provide explicit content. Let me know if you'd like information on this topic in an appropriate way.",
            FilterLevel::Minimal => "While NSFW mode is enabled, I still need to prioritize safety and follow platform guidelines. Let me know if you'd like to discuss this topic in a different way.",
        }
    }
}

impl fmt::Display for FilterLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(FilterLevel::Strict),
            "moderate" => Ok(FilterLevel::Moderate),
            "minimal" => Ok(FilterLevel::Minimal),
            other => Err(anyhow::anyhow!("Unknown content filter level: {}", other)),
        }
    }
}

/// The subset of user settings that drives filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentSettings {
    pub nsfw_mode: bool,
    pub level: FilterLevel,
}

impl From<&UserSettings> for ContentSettings {
    fn from(settings: &UserSettings) -> Self {
        Self {
            nsfw_mode: settings.nsfw_mode,
            level: settings.content_filter_level,
        }
    }
}

impl ContentSettings {
    /// Without NSFW mode everything collapses to strict.
    pub fn effective_level(&self) -> FilterLevel {
        if self.nsfw_mode {
            self.level
        } else {
            FilterLevel::Strict
        }
    }

    pub fn system_prompt_addition(&self) -> &'static str {
        self.effective_level().system_addition()
    }

    pub fn decline_message(&self) -> &'static str {
        self.effective_level().decline_message()
    }

    pub fn allows_nsfw(&self) -> bool {
        self.nsfw_mode && self.level == FilterLevel::Minimal
    }

    pub fn warning_prefix(&self) -> &'static str {
        if self.allows_nsfw() {
            "⚠️ **NSFW Mode Active** - Content filtering is minimal. Please use responsibly.\n\n"
        } else {
            ""
        }
    }

    pub fn status_emoji(&self) -> &'static str {
        if self.allows_nsfw() {
            "🔞"
        } else if self.level == FilterLevel::Moderate {
            "🛡️"
        } else {
            "✅"
        }
    }

    pub fn status_text(&self) -> &'static str {
        match (self.nsfw_mode, self.level) {
            (true, FilterLevel::Minimal) => "NSFW Mode (Minimal Filtering)",
            (true, FilterLevel::Moderate) => "NSFW Mode (Moderate Filtering)",
            (true, FilterLevel::Strict) => "NSFW Mode (Strict Filtering)",
            (false, FilterLevel::Moderate) => "Moderate Filtering",
            (false, _) => "Strict Filtering",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_nsfw_everything_is_strict() {
        for level in [FilterLevel::Strict, FilterLevel::Moderate, FilterLevel::Minimal] {
            let settings = ContentSettings { nsfw_mode: false, level };
            assert_eq!(settings.effective_level(), FilterLevel::Strict);
            assert!(!settings.allows_nsfw());
            assert!(settings.system_prompt_addition().contains("strict content filtering"));
            assert_eq!(settings.warning_prefix(), "");
            assert!(settings.decline_message().contains("family-friendly"));
        }
    }

    #[test]
    fn test_nsfw_respects_chosen_level() {
        let moderate = ContentSettings { nsfw_mode: true, level: FilterLevel::Moderate };
        assert_eq!(moderate.effective_level(), FilterLevel::Moderate);
        assert!(!moderate.allows_nsfw());
        assert_eq!(moderate.status_text(), "NSFW Mode (Moderate Filtering)");

        let minimal = ContentSettings { nsfw_mode: true, level: FilterLevel::Minimal };
        assert!(minimal.allows_nsfw());
        assert_eq!(minimal.status_emoji(), "🔞");
        assert!(minimal.warning_prefix().starts_with("⚠️ **NSFW Mode Active**"));
        assert!(minimal.system_prompt_addition().contains("NSFW MODE ACTIVE"));
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("Moderate".parse::<FilterLevel>().unwrap(), FilterLevel::Moderate);
        assert_eq!(" minimal ".parse::<FilterLevel>().unwrap(), FilterLevel::Minimal);
        assert!("lenient".parse::<FilterLevel>().is_err());
        assert_eq!(FilterLevel::default().as_str(), "strict");
    }
}
