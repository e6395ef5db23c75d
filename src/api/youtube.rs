use crate::content::ContentRecord;
use crate::error::UploadError;
use crate::pipeline::VideoHost;
use crate::{logi, logok};
use async_trait::async_trait;
use reqwest::header::{CONTENT_RANGE, LOCATION, RANGE};
use reqwest::{Client, StatusCode, Url, redirect};
use serde_json::{Value, json};
use std::io::SeekFrom;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Resumable uploads require chunk sizes in multiples of 256 KiB.
pub const CHUNK_GRANULARITY: u64 = 256 * 1024;

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub upload_url: String,
    pub category_id: String,
    pub privacy_status: String,
    pub chunk_bytes: u64,
}

impl UploadSettings {
    fn effective_chunk(&self) -> u64 {
        (self.chunk_bytes / CHUNK_GRANULARITY).max(1) * CHUNK_GRANULARITY
    }
}

/// Authenticated handle for the YouTube Data API upload endpoint.
pub struct YouTubeClient {
    client: Client,
    access_token: String,
    settings: UploadSettings,
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        _ => "application/octet-stream",
    }
}

/// Next byte offset from a `308 Resume Incomplete` range header (`bytes=0-N`).
fn next_offset_from_range(range: Option<&str>) -> u64 {
    range
        .and_then(|r| r.rsplit('-').next())
        .and_then(|end| end.trim().parse::<u64>().ok())
        .map(|end| end + 1)
        .unwrap_or(0)
}

impl YouTubeClient {
    pub fn new(access_token: impl Into<String>, settings: UploadSettings) -> reqwest::Result<Self> {
        // 308 is the resumable protocol's "continue" signal, not a redirect.
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            access_token: access_token.into(),
            settings,
        })
    }

    pub fn video_body(&self, record: &ContentRecord) -> Value {
        json!({
            "snippet": {
                "title": record.title,
                "description": record.description,
                "tags": record.tags,
                "categoryId": self.settings.category_id,
            },
            "status": {
                "privacyStatus": self.settings.privacy_status,
            },
        })
    }

    async fn start_session(
        &self,
        record: &ContentRecord,
        len: u64,
        mime: &str,
    ) -> Result<Url, UploadError> {
        let url = format!(
            "{}/youtube/v3/videos?uploadType=resumable&part=snippet,status",
            self.settings.upload_url.trim_end_matches('/')
        );

        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .header("X-Upload-Content-Length", len.to_string())
            .header("X-Upload-Content-Type", mime)
            .json(&self.video_body(record))
            .timeout(Duration::from_secs(60))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(UploadError::SessionRejected {
                status: status.as_u16(),
                body: body.chars().take(800).collect(),
            });
        }

        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(UploadError::NoSessionUri)?;
        resp.url().join(location).map_err(|_| UploadError::NoSessionUri)
    }

    /// Uploads `path` with `record` as metadata and returns the new video id.
    pub async fn upload_video(
        &self,
        path: &Path,
        record: &ContentRecord,
    ) -> Result<String, UploadError> {
        let len = match fs::metadata(path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => meta.len(),
            _ => return Err(UploadError::EmptyMedia(path.display().to_string())),
        };
        let mime = mime_for(path);

        logi(format!("Attempting to upload video: {}", record.title));
        let session = self.start_session(record, len, mime).await?;

        let chunk = self.settings.effective_chunk();
        let mut file = fs::File::open(path).await?;
        let mut offset = 0u64;

        loop {
            let end = (offset + chunk).min(len);
            let mut buf = vec![0u8; (end - offset) as usize];
            file.seek(SeekFrom::Start(offset)).await?;
            file.read_exact(&mut buf).await?;

            let resp = self
                .client
                .put(session.clone())
                .bearer_auth(&self.access_token)
                .header("Content-Type", mime)
                .header(CONTENT_RANGE, format!("bytes {}-{}/{}", offset, end - 1, len))
                .body(buf)
                .timeout(Duration::from_secs(1800))
                .send()
                .await?;

            let status = resp.status();
            if status == StatusCode::PERMANENT_REDIRECT {
                let range = resp.headers().get(RANGE).and_then(|v| v.to_str().ok());
                let next = next_offset_from_range(range);
                if next <= offset || next >= len {
                    return Err(UploadError::Stalled(next));
                }
                offset = next;
                logi(format!("Uploaded {}%", offset * 100 / len));
                continue;
            }

            if status.is_success() {
                let video: Value = resp.json().await?;
                let id = video
                    .get("id")
                    .and_then(|v| v.as_str())
                    .ok_or(UploadError::NoVideoId)?
                    .to_string();
                logi("Uploaded 100%");
                logok(format!("Upload Complete! Video ID: {}", id));
                return Ok(id);
            }

            let body = resp.text().await.unwrap_or_default();
            return Err(UploadError::ChunkRejected {
                status: status.as_u16(),
                body: body.chars().take(800).collect(),
            });
        }
    }
}

#[async_trait]
impl VideoHost for YouTubeClient {
    async fn upload(&self, path: &Path, record: &ContentRecord) -> Result<String, UploadError> {
        self.upload_video(path, record).await
    }
}
