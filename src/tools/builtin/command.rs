use crate::discord_text::truncate_chars;
use crate::tools::{Tool, ToolError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

const MAX_OUTPUT_CHARS: usize = 1500;
const SHELL_METACHARACTERS: &[char] = &[
    ';', '&', '|', '$', '`', '>', '<', '(', ')', '{', '}', '[', ']', '\\', '\'', '"', '*', '?',
    '!', '~', '#', '\n', '\r',
];

/// Flags each known program may take. Anything not listed here, including
/// positional operands, is refused; programs missing from the table take no
/// arguments at all.
const ALLOWED_ARGS: &[(&str, &[&str])] = &[
    ("uptime", &["-p", "-s"]),
    ("date", &["-u", "-R", "-I", "--utc"]),
    ("whoami", &[]),
    ("uname", &["-a", "-s", "-n", "-r", "-v", "-m", "-o"]),
    ("df", &["-h", "-H", "-T", "-i", "-l"]),
    ("free", &["-h", "-m", "-g", "-k", "-b", "-t", "-w"]),
    ("hostname", &["-s", "-f", "-d"]),
    ("ps", &["aux", "ax", "-e", "-A", "-f", "-ef"]),
];

fn allowed_args(program: &str) -> &'static [&'static str] {
    ALLOWED_ARGS
        .iter()
        .find(|(name, _)| *name == program)
        .map(|(_, args)| *args)
        .unwrap_or(&[])
}

/// Runs read-only diagnostics from an allowlist. No shell is involved: the
/// program is spawned directly with whitespace-split arguments.
pub struct SafeCommandTool {
    allowed: Vec<String>,
    timeout: Duration,
}

impl SafeCommandTool {
    pub fn new(allowed: Vec<String>, timeout: Duration) -> Self {
        Self { allowed, timeout }
    }

    pub fn validate<'a>(&self, command_line: &'a str) -> Result<(&'a str, Vec<&'a str>), ToolError> {
        if let Some(c) = command_line.chars().find(|c| SHELL_METACHARACTERS.contains(c)) {
            return Err(ToolError::DisallowedCommand(format!(
                "shell metacharacter '{}' is not permitted",
                c.escape_debug()
            )));
        }

        let mut parts = command_line.split_whitespace();
        let program = parts
            .next()
            .ok_or(ToolError::MissingArgument("EXECUTE_COMMAND"))?;

        if program.contains('/') || !self.allowed.iter().any(|a| a == program) {
            return Err(ToolError::DisallowedCommand(format!(
                "'{}' is not in the allowed list ({})",
                program,
                self.allowed.join(", ")
            )));
        }

        let args: Vec<&str> = parts.collect();
        let permitted = allowed_args(program);
        if let Some(bad) = args.iter().find(|a| !permitted.contains(a)) {
            return Err(ToolError::DisallowedCommand(format!(
                "argument '{}' is not permitted for '{}'",
                bad, program
            )));
        }

        Ok((program, args))
    }
}

#[async_trait]
impl Tool for SafeCommandTool {
    fn directive(&self) -> &'static str {
        "EXECUTE_COMMAND"
    }

    fn description(&self) -> &str {
        "Run a safe read-only system command such as uptime, df or free"
    }

    fn usage(&self) -> &str {
        "<command> [args]"
    }

    async fn execute(&self, argument: &str) -> Result<String, ToolError> {
        let (program, args) = self.validate(argument)?;
        info!("Executing safe command: {} {:?}", program, args);

        let output = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new(program)
                .args(&args)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| ToolError::Timeout(self.timeout.as_secs()))?
        .map_err(|e| ToolError::Internal(anyhow::anyhow!("Failed to start '{}': {}", program, e)))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stderr);
        }
        let text = truncate_chars(text.trim_end(), MAX_OUTPUT_CHARS).replace("```", "'''");
        let status = output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "killed".to_string());

        Ok(format!(
            "💻 **Command:** `{}`\n```\n{}\n```\n*Exit status: {}*",
            argument.trim(),
            if text.is_empty() { "(no output)" } else { text.as_str() },
            status
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolsConfig;

    fn tool() -> SafeCommandTool {
        let cfg = ToolsConfig::default();
        SafeCommandTool::new(cfg.safe_commands, Duration::from_secs(cfg.command_timeout_secs))
    }

    #[test]
    fn test_allowlist() {
        let tool = tool();
        let (program, args) = tool.validate("df -h").unwrap();
        assert_eq!(program, "df");
        assert_eq!(args, vec!["-h"]);

        assert!(matches!(tool.validate("rm -rf x"), Err(ToolError::DisallowedCommand(_))));
        assert!(matches!(tool.validate("/bin/date"), Err(ToolError::DisallowedCommand(_))));
        assert!(matches!(tool.validate("   "), Err(ToolError::MissingArgument(_))));
    }

    #[test]
    fn test_metacharacters_rejected() {
        let tool = tool();
        for input in ["date; rm -rf /", "uptime && whoami", "ps | grep x", "echo $(id)", "date > /tmp/x", "uname `id`"] {
            assert!(
                matches!(tool.validate(input), Err(ToolError::DisallowedCommand(_))),
                "accepted {}",
                input
            );
        }
    }

    #[test]
    fn test_arguments_restricted_per_program() {
        let tool = tool();
        for input in ["date -f /etc/hostname", "date -s 2020-01-01", "ps e", "ps eww", "hostname foo", "whoami --help", "df /etc"] {
            assert!(
                matches!(tool.validate(input), Err(ToolError::DisallowedCommand(_))),
                "accepted {}",
                input
            );
        }

        assert!(tool.validate("ps aux").is_ok());
        assert!(tool.validate("uname -a").is_ok());
        assert!(tool.validate("free -h").is_ok());
        assert!(tool.validate("hostname").is_ok());

        // Extra programs from gork.toml run bare
        let custom = SafeCommandTool::new(vec!["lsb_release".to_string()], Duration::from_secs(5));
        assert!(custom.validate("lsb_release").is_ok());
        assert!(matches!(custom.validate("lsb_release -a"), Err(ToolError::DisallowedCommand(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_allowed_command() {
        let tool = SafeCommandTool::new(vec!["uname".to_string()], Duration::from_secs(10));
        let out = tool.execute("uname").await.unwrap();
        assert!(out.starts_with("💻 **Command:** `uname`"));
        assert!(out.contains("*Exit status: 0*"));
    }
}
