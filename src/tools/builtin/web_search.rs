use crate::tools::{Tool, ToolError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

const SEARCH_API_URL: &str = "https://www.searchapi.io/api/v1/search";
const MAX_RESULTS: usize = 5;

/// Google results through SearchAPI.io.
pub struct WebSearchTool {
    http: Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    title: String,
    link: String,
    #[serde(default)]
    snippet: Option<String>,
}

impl WebSearchTool {
    pub fn new(http: Client, api_key: String) -> Self {
        Self { http, api_key }
    }
}

fn format_results(query: &str, results: &[OrganicResult]) -> String {
    if results.is_empty() {
        return format!("🔍 No search results found for \"{}\".", query);
    }

    let mut out = format!("🔍 **Search results for \"{}\":**\n", query);
    for (i, r) in results.iter().take(MAX_RESULTS).enumerate() {
        out.push_str(&format!("{}. **{}**\n   <{}>\n", i + 1, r.title, r.link));
        if let Some(snippet) = r.snippet.as_deref().filter(|s| !s.is_empty()) {
            out.push_str(&format!("   {}\n", snippet));
        }
    }
    out
}

#[async_trait]
impl Tool for WebSearchTool {
    fn directive(&self) -> &'static str {
        "WEB_SEARCH"
    }

    fn description(&self) -> &str {
        "Search the web for current information"
    }

    fn usage(&self) -> &str {
        "<search query>"
    }

    async fn execute(&self, argument: &str) -> Result<String, ToolError> {
        let response = self
            .http
            .get(SEARCH_API_URL)
            .query(&[("engine", "google"), ("q", argument), ("api_key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::HttpStatus {
                status: status.as_u16(),
                message: "Search API error".to_string(),
            });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Parse(e.to_string()))?;
        Ok(format_results(argument, &body.organic_results))
    }
}
