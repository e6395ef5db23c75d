use crate::api::inference;
use crate::content::ContentRecord;
use crate::ffmpeg;
use crate::{logi, logok, logw};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use walkdir::WalkDir;

pub const QUEUE_EXTENSIONS: &[&str] = &["mp4", "mov"];

/// What happens to the media file once the upload went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposal {
    /// Generated scratch output; remove it.
    Delete,
    /// Queued source file; move it into this directory.
    MoveTo(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub disposal: Disposal,
}

/// Interchangeable way of getting a video to upload.
#[async_trait]
pub trait MediaProducer: Send + Sync {
    fn name(&self) -> &str;

    /// Whether `produce` reads `ContentRecord::prompt`.
    fn needs_prompt(&self) -> bool {
        true
    }

    /// `false` means there is nothing to do this run.
    async fn pending(&self) -> Result<bool> {
        Ok(true)
    }

    /// `None` on any failure; the caller skips the upload.
    async fn produce(&self, record: &ContentRecord) -> Option<MediaFile>;
}

fn prompt_of(record: &ContentRecord) -> &str {
    record.prompt.as_deref().unwrap_or(&record.title)
}

fn image_extension(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG") {
        "png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "jpg"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "webp"
    } else {
        "img"
    }
}

/// Writes `bytes` to a fresh, uniquely named file in `dir`.
pub async fn write_media(dir: &Path, stem: &str, ext: &str, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create dir {}", dir.display()))?;
    let (_file, path) = tempfile::Builder::new()
        .prefix(&format!("{}_{}_", stem, Utc::now().timestamp_millis()))
        .suffix(&format!(".{}", ext))
        .tempfile_in(dir)
        .context("Failed to create media file")?
        .keep()
        .context("Failed to persist media file")?;
    fs::write(&path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Text-to-video inference endpoint.
pub struct InferenceVideo {
    client: Client,
    url: String,
    token: Option<String>,
    timeout: Duration,
    out_dir: PathBuf,
}

impl InferenceVideo {
    pub fn new(
        client: Client,
        url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            token,
            timeout,
            out_dir: out_dir.into(),
        }
    }
}

#[async_trait]
impl MediaProducer for InferenceVideo {
    fn name(&self) -> &str {
        "inference-video"
    }

    async fn produce(&self, record: &ContentRecord) -> Option<MediaFile> {
        let Some(token) = self.token.as_deref() else {
            logw("HF_TOKEN secret is missing.");
            return None;
        };

        let payload = inference::video_payload(prompt_of(record));
        let bytes = match inference::inference_generate_bytes(
            &self.client,
            &self.url,
            token,
            &payload,
            self.timeout,
        )
        .await
        {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(err) => {
                logw(format!("AI Video API Request Failed (Check API_URL & Token): {:#}", err));
                return None;
            }
        };

        match write_media(&self.out_dir, "ai_video", "mp4", &bytes).await {
            Ok(path) => {
                logok(format!("Video downloaded successfully to: {}", path.display()));
                Some(MediaFile {
                    path,
                    disposal: Disposal::Delete,
                })
            }
            Err(err) => {
                logw(format!("Video Generation/Download Failed: {:#}", err));
                None
            }
        }
    }
}

/// Text-to-image inference, rendered into a short still video.
pub struct StillImage {
    client: Client,
    url: String,
    token: Option<String>,
    timeout: Duration,
    seconds: u32,
    out_dir: PathBuf,
}

impl StillImage {
    pub fn new(
        client: Client,
        url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
        seconds: u32,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            token,
            timeout,
            seconds,
            out_dir: out_dir.into(),
        }
    }

    async fn fetch_image(&self, record: &ContentRecord) -> Option<PathBuf> {
        let Some(token) = self.token.as_deref() else {
            logw("HF_TOKEN secret is missing.");
            return None;
        };

        let payload = inference::image_payload(prompt_of(record));
        let bytes = match inference::inference_generate_bytes(
            &self.client,
            &self.url,
            token,
            &payload,
            self.timeout,
        )
        .await
        {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(err) => {
                logw(format!("AI Image API Request Failed: {:#}", err));
                return None;
            }
        };

        match write_media(&self.out_dir, "ai_image", image_extension(&bytes), &bytes).await {
            Ok(path) => Some(path),
            Err(err) => {
                logw(format!("Image download failed: {:#}", err));
                None
            }
        }
    }
}

#[async_trait]
impl MediaProducer for StillImage {
    fn name(&self) -> &str {
        "still-image"
    }

    async fn produce(&self, record: &ContentRecord) -> Option<MediaFile> {
        let image = self.fetch_image(record).await?;
        let out_mp4 = image.with_extension("mp4");

        logi(format!("Rendering still image -> {}", out_mp4.display()));
        let rendered = ffmpeg::ffmpeg_still_to_video(&image, self.seconds, &out_mp4).await;
        remove_scratch(&image).await;

        if let Err(err) = rendered {
            logw(format!("Still image render failed: {:#}", err));
            remove_scratch(&out_mp4).await;
            return None;
        }
        logok(format!("Still video ready: {}", out_mp4.display()));
        Some(MediaFile {
            path: out_mp4,
            disposal: Disposal::Delete,
        })
    }
}

/// Removes an intermediate file. A file that was never created is fine.
async fn remove_scratch(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => logw(format!("Failed to remove {}: {}", path.display(), err)),
    }
}

fn has_queue_extension(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| QUEUE_EXTENSIONS.iter().any(|q| ext.eq_ignore_ascii_case(q)))
        .unwrap_or(false)
}

/// Lexicographically first video file directly inside `dir`.
pub fn next_queued_file(dir: &Path) -> Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let mut candidates = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file() && has_queue_extension(entry.path()) {
            candidates.push(entry.into_path());
        }
    }
    candidates.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(candidates.into_iter().next())
}

/// Pre-made videos waiting in a queue directory.
pub struct QueueProducer {
    queue_dir: PathBuf,
    processed_dir: PathBuf,
}

impl QueueProducer {
    pub fn new(queue_dir: impl Into<PathBuf>, processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            queue_dir: queue_dir.into(),
            processed_dir: processed_dir.into(),
        }
    }
}

#[async_trait]
impl MediaProducer for QueueProducer {
    fn name(&self) -> &str {
        "queue"
    }

    fn needs_prompt(&self) -> bool {
        false
    }

    async fn pending(&self) -> Result<bool> {
        Ok(next_queued_file(&self.queue_dir)?.is_some())
    }

    async fn produce(&self, _record: &ContentRecord) -> Option<MediaFile> {
        match next_queued_file(&self.queue_dir) {
            Ok(Some(path)) => {
                logi(format!("Next queued video: {}", path.display()));
                Some(MediaFile {
                    path,
                    disposal: Disposal::MoveTo(self.processed_dir.clone()),
                })
            }
            Ok(None) => {
                logw(format!("No videos left in {}", self.queue_dir.display()));
                None
            }
            Err(err) => {
                logw(format!("Failed to scan {}: {:#}", self.queue_dir.display(), err));
                None
            }
        }
    }
}

async fn move_into(path: &Path, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create dir {}", dir.display()))?;
    let name = path
        .file_name()
        .with_context(|| format!("No file name in {}", path.display()))?;
    let target = dir.join(name);

    if fs::rename(path, &target).await.is_err() {
        // rename fails across filesystems
        fs::copy(path, &target)
            .await
            .with_context(|| format!("Failed to copy {} -> {}", path.display(), target.display()))?;
        fs::remove_file(path)
            .await
            .with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(target)
}

/// Applies the file's disposal. Failures are logged and reported as `false`.
pub async fn dispose(media: &MediaFile) -> bool {
    match &media.disposal {
        Disposal::Delete => match fs::remove_file(&media.path).await {
            Ok(()) => {
                logok(format!("Removed temporary file: {}", media.path.display()));
                true
            }
            Err(err) => {
                logw(format!("Failed to remove {}: {}", media.path.display(), err));
                false
            }
        },
        Disposal::MoveTo(dir) => match move_into(&media.path, dir).await {
            Ok(target) => {
                logok(format!("Moved {} -> {}", media.path.display(), target.display()));
                true
            }
            Err(err) => {
                logw(format!("Failed to move {}: {:#}", media.path.display(), err));
                false
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::inference::MIN_MEDIA_BYTES;
    use crate::testutil::{Reply, ScriptedServer};

    fn record() -> ContentRecord {
        ContentRecord::hardcoded_fallback()
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"video bytes").unwrap();
        path
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn queue_picks_first_video_lexicographically() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.mov");
        touch(dir.path(), "a.mp4");
        touch(dir.path(), "c.txt");
        let next = next_queued_file(dir.path()).unwrap().unwrap();
        assert_eq!(next.file_name().unwrap(), "a.mp4");
    }

    #[test]
    fn queue_ignores_subdirectories_and_other_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("0.mp4")).unwrap();
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "Z.MOV");
        let next = next_queued_file(dir.path()).unwrap().unwrap();
        assert_eq!(next.file_name().unwrap(), "Z.MOV");
    }

    #[test]
    fn empty_or_missing_queue_has_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(next_queued_file(dir.path()).unwrap().is_none());
        assert!(next_queued_file(&dir.path().join("missing")).unwrap().is_none());
    }

    #[test]
    fn sniffs_image_formats() {
        assert_eq!(image_extension(b"\x89PNG\r\n\x1a\n...."), "png");
        assert_eq!(image_extension(&[0xFF, 0xD8, 0xFF, 0xE0]), "jpg");
        assert_eq!(image_extension(b"RIFF\0\0\0\0WEBPVP8 "), "webp");
        assert_eq!(image_extension(b"???"), "img");
    }

    #[tokio::test]
    async fn queue_producer_moves_file_on_dispose() {
        let root = tempfile::tempdir().unwrap();
        let queue = root.path().join("upload_queue");
        let processed = root.path().join("processed");
        std::fs::create_dir(&queue).unwrap();
        touch(&queue, "a.mp4");

        let producer = QueueProducer::new(&queue, &processed);
        assert!(producer.pending().await.unwrap());
        assert!(!producer.needs_prompt());

        let media = producer.produce(&record()).await.unwrap();
        assert_eq!(media.disposal, Disposal::MoveTo(processed.clone()));
        assert!(dispose(&media).await);

        assert!(!queue.join("a.mp4").exists());
        assert!(processed.join("a.mp4").exists());
        assert!(!producer.pending().await.unwrap());
    }

    #[tokio::test]
    async fn delete_disposal_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = touch(dir.path(), "ai_video.mp4");
        let media = MediaFile {
            path: path.clone(),
            disposal: Disposal::Delete,
        };
        assert!(dispose(&media).await);
        assert!(!path.exists());
        // second attempt fails but does not panic
        assert!(!dispose(&media).await);
    }

    #[tokio::test]
    async fn video_without_token_makes_no_request() {
        let server = ScriptedServer::start(vec![]).await;
        let dir = tempfile::tempdir().unwrap();
        let producer = InferenceVideo::new(
            Client::new(),
            server.url("/m"),
            None,
            Duration::from_secs(5),
            dir.path(),
        );
        assert!(producer.produce(&record()).await.is_none());
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn video_bytes_are_written_to_mp4() {
        let server = ScriptedServer::start(vec![Reply::new(200).body(vec![9u8; 5000])]).await;
        let dir = tempfile::tempdir().unwrap();
        let producer = InferenceVideo::new(
            Client::new(),
            server.url("/m"),
            Some("hf".to_string()),
            Duration::from_secs(5),
            dir.path(),
        );
        let media = producer.produce(&record()).await.unwrap();
        assert_eq!(media.disposal, Disposal::Delete);
        assert_eq!(media.path.extension().unwrap(), "mp4");
        assert_eq!(std::fs::read(&media.path).unwrap().len(), 5000);
        assert!(server.requests()[0].body_text().contains("diamond dissolving"));
    }

    #[tokio::test]
    async fn undersized_video_writes_nothing() {
        let server =
            ScriptedServer::start(vec![Reply::new(200).body(vec![9u8; MIN_MEDIA_BYTES - 1])]).await;
        let dir = tempfile::tempdir().unwrap();
        let producer = InferenceVideo::new(
            Client::new(),
            server.url("/m"),
            Some("hf".to_string()),
            Duration::from_secs(5),
            dir.path(),
        );
        assert!(producer.produce(&record()).await.is_none());
        assert_eq!(file_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn undersized_image_writes_nothing() {
        let server = ScriptedServer::start(vec![Reply::new(200).body(b"\x89PNG".to_vec())]).await;
        let dir = tempfile::tempdir().unwrap();
        let producer = StillImage::new(
            Client::new(),
            server.url("/m"),
            Some("hf".to_string()),
            Duration::from_secs(5),
            8,
            dir.path(),
        );
        assert!(producer.produce(&record()).await.is_none());
        assert_eq!(file_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn unrenderable_image_leaves_nothing_behind() {
        let mut junk = b"\x89PNG".to_vec();
        junk.resize(4096, 0);
        let server = ScriptedServer::start(vec![Reply::new(200).body(junk)]).await;
        let dir = tempfile::tempdir().unwrap();
        let producer = StillImage::new(
            Client::new(),
            server.url("/m"),
            Some("hf".to_string()),
            Duration::from_secs(5),
            2,
            dir.path(),
        );
        assert!(producer.produce(&record()).await.is_none());
        assert_eq!(server.requests().len(), 1);
        assert_eq!(file_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn scratch_removal_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = touch(dir.path(), "ai_image.png");
        remove_scratch(&path).await;
        assert!(!path.exists());
        remove_scratch(&path).await;
    }

    #[tokio::test]
    async fn write_media_uses_stem_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_media(dir.path(), "ai_image", "png", b"data").await.unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("ai_image_"));
        assert!(name.ends_with(".png"));
    }
}
