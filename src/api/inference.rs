use crate::{logi, logw};
use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;

/// Anything smaller is an error page or a truncated blob, never real media.
pub const MIN_MEDIA_BYTES: usize = 1000;

pub fn video_payload(prompt: &str) -> Value {
    json!({
        "inputs": prompt,
        "parameters": {
            "num_frames": 24 * 8,
            "guidance_scale": 9.0,
            "height": 768,
            "width": 512,
            "video_length": 8,
        },
    })
}

pub fn image_payload(prompt: &str) -> Value {
    json!({
        "inputs": prompt,
        "parameters": {
            "guidance_scale": 7.5,
            "height": 768,
            "width": 512,
        },
    })
}

pub fn payload_is_plausible(bytes: &[u8]) -> bool {
    bytes.len() >= MIN_MEDIA_BYTES
}

/// Calls a Hugging Face style inference endpoint and returns the raw media
/// bytes. `Ok(None)` covers HTTP failures and undersized payloads.
pub async fn inference_generate_bytes(
    client: &Client,
    url: &str,
    token: &str,
    payload: &Value,
    timeout: Duration,
) -> Result<Option<Vec<u8>>> {
    logi(format!("Sending prompt to inference API: {}", url));

    let resp = client
        .post(url)
        .bearer_auth(token)
        .json(payload)
        .timeout(timeout)
        .send()
        .await
        .context("Inference request failed")?;

    let status = resp.status();
    let bytes = resp.bytes().await.context("Inference response read failed")?;

    if !status.is_success() {
        let snippet = String::from_utf8_lossy(&bytes).chars().take(200).collect::<String>();
        logw(format!("Inference API HTTP {}: {}", status.as_u16(), snippet));
        return Ok(None);
    }

    if !payload_is_plausible(&bytes) {
        let snippet = String::from_utf8_lossy(&bytes).chars().take(200).collect::<String>();
        logw(format!(
            "Inference API returned an empty or corrupt file ({} bytes). Raw response start: {}...",
            bytes.len(),
            snippet
        ));
        return Ok(None);
    }

    Ok(Some(bytes.to_vec()))
}
