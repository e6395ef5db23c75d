use crate::logw;
use crate::metadata::TextGenerator;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(
        client: Client,
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

fn gemini_extract_output_text(resp_json: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(resp_json).ok()?;

    if let Some(err) = root.get("error") {
        if let Some(msg) = err.get("message").and_then(|v| v.as_str()) {
            logw(format!("Gemini error message: {}", msg));
        }
        if let Some(status) = err.get("status").and_then(|v| v.as_str()) {
            logw(format!("Gemini error status: {}", status));
        }
        return None;
    }

    let candidates = root.get("candidates")?.as_array()?;
    let mut out = String::new();
    for candidate in candidates {
        let parts = candidate
            .get("content")
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array());
        if let Some(parts) = parts {
            for part in parts {
                if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
                    out.push_str(text);
                }
            }
        }
        if !out.is_empty() {
            return Some(out);
        }
    }

    None
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn generate_text(&self, instruction: &str) -> Result<String> {
        let body = json!({
            "contents": [
                {"role": "user", "parts": [{"text": instruction}]},
            ],
            "generationConfig": {"responseMimeType": "application/json"},
        });

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            if !raw.is_empty() {
                let snippet = raw.chars().take(800).collect::<String>();
                logw(format!("Gemini raw body: {}", snippet));
            }
            bail!("Gemini HTTP {}", status.as_u16());
        }

        match gemini_extract_output_text(&raw) {
            Some(text) => Ok(text),
            None => {
                let snippet = raw.chars().take(800).collect::<String>();
                bail!("Gemini response parse failed: {}", snippet)
            }
        }
    }
}
