use crate::discord_text::truncate_chars;
use crate::tools::{Tool, ToolError};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{header, Client, StatusCode, Url};
use std::time::Duration;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_TEXT_CHARS: usize = 4000;
const MAX_JSON_CHARS: usize = 3000;

static RE_STRIPPED_BLOCKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style|nav|header|footer|noscript)\b[^>]*>.*?</(script|style|nav|header|footer|noscript)>")
        .expect("valid regex")
});
static RE_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid regex"));
static RE_HEAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<head\b[^>]*>.*?</head>").expect("valid regex"));
static RE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</?(p|div|br|h[1-6]|li|tr|td|section|article|main)\b[^>]*>").expect("valid regex"));
static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static RE_MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").expect("valid regex"));

pub struct VisitWebsiteTool {
    http: Client,
}

impl VisitWebsiteTool {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

/// Adds `https://` when no scheme is given and rejects URLs without a host.
pub fn normalize_url(raw: &str) -> Result<Url, ToolError> {
    let trimmed = raw.trim().trim_start_matches('<').trim_end_matches('>');
    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&candidate).map_err(|_| ToolError::Parse(format!("Invalid URL format: {}", trimmed)))?;
    match url.host_str() {
        Some(host) if host.contains('.') || host == "localhost" => Ok(url),
        _ => Err(ToolError::Parse(format!("Invalid URL format: {}", trimmed))),
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

pub fn extract_title(html: &str) -> Option<String> {
    RE_TITLE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| decode_entities(m.as_str()).split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
}

/// Visible page text, one block per line. Lines of three characters or
/// fewer are dropped.
pub fn html_to_text(html: &str) -> String {
    let text = RE_STRIPPED_BLOCKS.replace_all(html, "");
    let text = RE_HEAD.replace_all(&text, "");
    let text = RE_BLOCK.replace_all(&text, "\n");
    let text = RE_TAG.replace_all(&text, "");
    let text = decode_entities(&text);
    let text = RE_MULTI_SPACE.replace_all(&text, " ");

    text.lines()
        .map(str::trim)
        .filter(|line| line.chars().count() > 3)
        .collect::<Vec<_>>()
        .join("\n")
}

fn status_error(status: StatusCode) -> ToolError {
    let message = match status.as_u16() {
        403 => "Access forbidden. The website blocks automated access".to_string(),
        404 => "Page not found".to_string(),
        429 => "Too many requests. The website is rate limiting".to_string(),
        _ => format!("HTTP error: {}", status.canonical_reason().unwrap_or("unknown")),
    };
    ToolError::HttpStatus { status: status.as_u16(), message }
}

#[async_trait]
impl Tool for VisitWebsiteTool {
    fn directive(&self) -> &'static str {
        "VISIT_WEBSITE"
    }

    fn description(&self) -> &str {
        "Read the text content of a web page"
    }

    fn usage(&self) -> &str {
        "<url>"
    }

    async fn execute(&self, argument: &str) -> Result<String, ToolError> {
        let url = normalize_url(argument)?;

        let response = self
            .http
            .get(url.clone())
            .header(header::USER_AGENT, BROWSER_USER_AGENT)
            .header(header::ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ToolError::Timeout(FETCH_TIMEOUT.as_secs())
                } else {
                    ToolError::Request(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.contains("text/html") || content_type.contains("xhtml") {
            let body = response.text().await?;
            let title = extract_title(&body).unwrap_or_else(|| "No title".to_string());
            let text = truncate_chars(&html_to_text(&body), MAX_TEXT_CHARS);
            Ok(format!(
                "🌐 **Website Content from:** {}\n📄 **Title:** {}\n\n**Content:**\n{}",
                url, title, text
            ))
        } else if content_type.contains("json") {
            let value: serde_json::Value = response
                .json()
                .await
                .map_err(|e| ToolError::Parse(e.to_string()))?;
            let pretty = serde_json::to_string_pretty(&value).map_err(|e| ToolError::Parse(e.to_string()))?;
            Ok(format!(
                "🌐 **JSON Content from:** {}\n```json\n{}\n```",
                url,
                truncate_chars(&pretty, MAX_JSON_CHARS)
            ))
        } else if content_type.contains("text/plain") {
            let body = response.text().await?;
            Ok(format!(
                "🌐 **Text Content from:** {}\n```\n{}\n```",
                url,
                truncate_chars(&body, MAX_TEXT_CHARS)
            ))
        } else {
            Err(ToolError::Parse(format!(
                "Unsupported content type: {}",
                if content_type.is_empty() { "unknown" } else { content_type.as_str() }
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("example.com").unwrap().as_str(), "https://example.com/");
        assert_eq!(
            normalize_url(" <http://example.com/a?b=1> ").unwrap().as_str(),
            "http://example.com/a?b=1"
        );
        assert!(normalize_url("invalid-url").is_err());
        assert!(normalize_url("https://").is_err());
    }

    #[test]
    fn test_html_to_text() {
        let html = r#"
            <html>
            <head><title> Example
              Domain </title><script>var x = 1;</script></head>
            <body>
                <nav>Home | About | Contact</nav>
                <h1>Example Domain</h1>
                <p>This domain is for <b>illustrative</b> examples &amp; docs.</p>
                <p>ok</p>
                <footer>Copyright notice here</footer>
            </body>
            </html>
        "#;

        assert_eq!(extract_title(html).as_deref(), Some("Example Domain"));
        let text = html_to_text(html);
        assert_eq!(
            text,
            "Example Domain\nThis domain is for illustrative examples & docs."
        );
    }

    #[test]
    fn test_status_messages() {
        let err = status_error(StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Page not found (HTTP 404)");
        let err = status_error(StatusCode::TOO_MANY_REQUESTS);
        assert!(err.to_string().contains("rate limiting"));
    }
}
