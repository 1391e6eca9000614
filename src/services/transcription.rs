use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Client for an OpenAI-compatible `/audio/transcriptions` endpoint.
#[derive(Clone)]
pub struct Transcriber {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl Transcriber {
    pub fn new(http: Client, base_url: &str, model: String, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        if self.base_url.ends_with("/audio/transcriptions") {
            self.base_url.clone()
        } else {
            format!("{}/audio/transcriptions", self.base_url)
        }
    }

    /// Downloads an attachment and transcribes it.
    pub async fn transcribe_url(&self, url: &str, filename: &str) -> anyhow::Result<String> {
        let audio = self.http.get(url).send().await?.error_for_status()?.bytes().await?;
        self.transcribe(audio.to_vec(), filename).await
    }

    pub async fn transcribe(&self, audio: Vec<u8>, filename: &str) -> anyhow::Result<String> {
        debug!("Transcribing {} ({} bytes)", filename, audio.len());
        let form = Form::new()
            .text("model", self.model.clone())
            .part("file", Part::bytes(audio).file_name(filename.to_string()));

        let mut request = self.http.post(self.endpoint()).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("Transcription failed with HTTP {}", status.as_u16()));
        }

        let body: TranscriptionResponse = response.json().await?;
        Ok(body.text.trim().to_string())
    }
}

/// Whether an attachment looks like audio, by content type or extension.
pub fn is_audio(content_type: Option<&str>, filename: &str) -> bool {
    if content_type.is_some_and(|ct| ct.starts_with("audio/")) {
        return true;
    }
    let lower = filename.to_ascii_lowercase();
    [".mp3", ".wav", ".ogg", ".m4a", ".flac", ".webm", ".opus"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_building() {
        let t = Transcriber::new(Client::new(), "https://api.example.com/v1/", "whisper-1".into(), None);
        assert_eq!(t.endpoint(), "https://api.example.com/v1/audio/transcriptions");

        let full = Transcriber::new(
            Client::new(),
            "http://localhost:9000/v1/audio/transcriptions",
            "whisper-1".into(),
            None,
        );
        assert_eq!(full.endpoint(), "http://localhost:9000/v1/audio/transcriptions");
    }

    #[test]
    fn test_is_audio() {
        assert!(is_audio(Some("audio/ogg"), "voice-message.ogg"));
        assert!(is_audio(None, "Clip.MP3"));
        assert!(!is_audio(Some("image/png"), "cat.png"));
    }
}
