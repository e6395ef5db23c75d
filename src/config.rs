use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TRENDS_URL: &str = "https://trends.google.com/trending/rss";
pub const DEFAULT_VIDEO_API_URL: &str =
    "https://api-inference.huggingface.co/models/ali-vilab/text-to-video-ms-1.7b";
pub const DEFAULT_IMAGE_API_URL: &str =
    "https://api-inference.huggingface.co/models/runwayml/stable-diffusion-v1-5";
pub const DEFAULT_YOUTUBE_UPLOAD_URL: &str = "https://www.googleapis.com/upload";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const MAX_UPLOAD_CHUNK_MB: u64 = 1024;

/// Which media strategy produces the file that gets uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MediaMode {
    /// Text-to-video inference endpoint.
    Video,
    /// Text-to-image inference endpoint, rendered to a still video with ffmpeg.
    Image,
    /// Pre-made videos waiting in the queue directory.
    Queue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TopicMode {
    Trends,
    Static,
}

/// What the metadata generator does when GEMINI_API_KEY is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MissingKeyPolicy {
    /// Substitute a fallback record and keep going.
    Fallback,
    /// Produce no record; the run stops with exit code 1.
    Abort,
}

/// Every option can come from the command line or the matching env var.
#[derive(Clone, Parser)]
#[command(
    name = "trend-shorts",
    version,
    about = "Generate a short from a trending topic and upload it to YouTube"
)]
pub struct Config {
    #[arg(long, env = "MEDIA_MODE", value_enum, default_value_t = MediaMode::Video)]
    pub media: MediaMode,

    #[arg(long, env = "TOPIC_MODE", value_enum, default_value_t = TopicMode::Trends)]
    pub topic: TopicMode,

    #[arg(long, env = "TRENDS_URL", default_value = DEFAULT_TRENDS_URL)]
    pub trends_url: String,

    #[arg(long, env = "TRENDS_GEO", default_value = "US")]
    pub trends_geo: String,

    /// Comma separated topics used when the trend lookup fails.
    #[arg(long = "fallback-topic", env = "FALLBACK_TOPICS", value_delimiter = ',')]
    pub fallback_topics: Vec<String>,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-2.5-flash")]
    pub gemini_model: String,

    #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_GEMINI_BASE_URL)]
    pub gemini_base_url: String,

    #[arg(long, env = "GEMINI_TIMEOUT_SECS", default_value_t = 120)]
    pub gemini_timeout_secs: u64,

    #[arg(
        long,
        env = "MISSING_KEY_POLICY",
        value_enum,
        default_value_t = MissingKeyPolicy::Fallback
    )]
    pub missing_key_policy: MissingKeyPolicy,

    #[arg(long, env = "FALLBACK_FILE", default_value = "fallback_prompts.json")]
    pub fallback_file: PathBuf,

    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    pub hf_token: Option<String>,

    #[arg(long, env = "AI_VIDEO_API_URL", default_value = DEFAULT_VIDEO_API_URL)]
    pub video_api_url: String,

    #[arg(long, env = "AI_IMAGE_API_URL", default_value = DEFAULT_IMAGE_API_URL)]
    pub image_api_url: String,

    #[arg(long, env = "VIDEO_TIMEOUT_SECS", default_value_t = 400)]
    pub video_timeout_secs: u64,

    #[arg(long, env = "IMAGE_TIMEOUT_SECS", default_value_t = 120)]
    pub image_timeout_secs: u64,

    /// Length of the video rendered from a still image.
    #[arg(long, env = "STILL_VIDEO_SECS", default_value_t = 8)]
    pub still_video_secs: u32,

    #[arg(long, env = "QUEUE_DIR", default_value = "upload_queue")]
    pub queue_dir: PathBuf,

    #[arg(long, env = "PROCESSED_DIR", default_value = "processed")]
    pub processed_dir: PathBuf,

    #[arg(long, env = "YOUTUBE_TOKEN_PATH")]
    pub youtube_token_path: Option<PathBuf>,

    #[arg(long, env = "YOUTUBE_TOKEN_JSON", hide_env_values = true)]
    pub youtube_token_json: Option<String>,

    #[arg(long, env = "YOUTUBE_REFRESH_TOKEN", hide_env_values = true)]
    pub youtube_refresh_token: Option<String>,

    #[arg(long, env = "YOUTUBE_CLIENT_ID")]
    pub youtube_client_id: Option<String>,

    #[arg(long, env = "YOUTUBE_CLIENT_SECRET", hide_env_values = true)]
    pub youtube_client_secret: Option<String>,

    #[arg(long, env = "YOUTUBE_UPLOAD_URL", default_value = DEFAULT_YOUTUBE_UPLOAD_URL)]
    pub youtube_upload_url: String,

    #[arg(long, env = "YOUTUBE_CATEGORY_ID", default_value = "22")]
    pub youtube_category_id: String,

    #[arg(long, env = "YOUTUBE_PRIVACY", default_value = "unlisted")]
    pub youtube_privacy: String,

    /// Upload chunk size in MiB, 1 to 1024.
    #[arg(
        long,
        env = "UPLOAD_CHUNK_MB",
        default_value_t = 8,
        value_parser = clap::value_parser!(u64).range(1..=MAX_UPLOAD_CHUNK_MB)
    )]
    pub upload_chunk_mb: u64,
}

/// CI runners export unset secrets as empty strings; treat those as absent.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Config {
    pub fn gemini_key(&self) -> Option<&str> {
        non_empty(&self.gemini_api_key)
    }

    pub fn hf_token(&self) -> Option<&str> {
        non_empty(&self.hf_token)
    }

    pub fn gemini_timeout(&self) -> Duration {
        Duration::from_secs(self.gemini_timeout_secs)
    }

    pub fn upload_chunk_bytes(&self) -> u64 {
        self.upload_chunk_mb
            .clamp(1, MAX_UPLOAD_CHUNK_MB)
            .saturating_mul(1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse_into_modes() {
        let cfg = Config::try_parse_from([
            "trend-shorts",
            "--media",
            "queue",
            "--topic",
            "static",
            "--missing-key-policy",
            "abort",
            "--fallback-topic",
            "a,b",
        ])
        .unwrap();
        assert_eq!(cfg.media, MediaMode::Queue);
        assert_eq!(cfg.topic, TopicMode::Static);
        assert_eq!(cfg.missing_key_policy, MissingKeyPolicy::Abort);
        assert_eq!(cfg.fallback_topics, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn upload_chunk_size_is_bounded() {
        let cfg = Config::try_parse_from(["trend-shorts"]).unwrap();
        assert_eq!(cfg.upload_chunk_bytes(), 8 * 1024 * 1024);

        let cfg = Config::try_parse_from(["trend-shorts", "--upload-chunk-mb", "1024"]).unwrap();
        assert_eq!(cfg.upload_chunk_bytes(), 1024 * 1024 * 1024);

        for bad in ["0", "1025", "17592186044416"] {
            assert!(Config::try_parse_from(["trend-shorts", "--upload-chunk-mb", bad]).is_err());
        }

        let mut cfg = Config::try_parse_from(["trend-shorts"]).unwrap();
        cfg.upload_chunk_mb = u64::MAX;
        assert_eq!(cfg.upload_chunk_bytes(), MAX_UPLOAD_CHUNK_MB * 1024 * 1024);
    }

    #[test]
    fn blank_secrets_count_as_missing() {
        assert_eq!(non_empty(&Some("   ".to_string())), None);
        assert_eq!(non_empty(&Some(" k ".to_string())), Some("k"));
        assert_eq!(non_empty(&None), None);
    }
}
