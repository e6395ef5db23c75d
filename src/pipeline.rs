use crate::api::gemini::GeminiClient;
use crate::auth;
use crate::config::{Config, MediaMode, TopicMode};
use crate::content::ContentRecord;
use crate::error::UploadError;
use crate::init;
use crate::media::{self, InferenceVideo, MediaProducer, QueueProducer, StillImage};
use crate::metadata::{MetadataGenerator, TextGenerator};
use crate::topic::{FallbackTopics, StaticTopicSource, TopicSource, TrendsTopicSource};
use crate::{loge, logi, logok, logw};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::fs;

/// Destination for finished media.
#[async_trait]
pub trait VideoHost: Send + Sync {
    async fn upload(&self, path: &Path, record: &ContentRecord) -> Result<String, UploadError>;
}

/// How a single run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Uploaded(String),
    NothingToDo,
    NoContent,
    MediaFailed,
    UploadFailed,
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Uploaded(_) | RunOutcome::NothingToDo => 0,
            RunOutcome::NoContent | RunOutcome::MediaFailed | RunOutcome::UploadFailed => 1,
        }
    }
}

/// The stages after authentication, wired to concrete strategies.
pub struct Pipeline<'a> {
    pub topics: &'a dyn TopicSource,
    pub metadata: &'a MetadataGenerator,
    pub producer: &'a dyn MediaProducer,
    pub host: &'a dyn VideoHost,
}

async fn is_uploadable(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

impl Pipeline<'_> {
    pub async fn run(&self) -> RunOutcome {
        match self.producer.pending().await {
            Ok(true) => {}
            Ok(false) => {
                logi(format!("Nothing to do for {} media.", self.producer.name()));
                return RunOutcome::NothingToDo;
            }
            Err(err) => {
                logw(format!("Could not check {} media: {:#}", self.producer.name(), err));
                return RunOutcome::MediaFailed;
            }
        }

        let topic = self.topics.topic().await;

        let Some(record) = self.metadata.generate(&topic).await else {
            loge("Failed to generate valid content data. Stopping.");
            return RunOutcome::NoContent;
        };

        let Some(media) = self.producer.produce(&record).await else {
            loge("Final video creation failed. Upload skipped.");
            return RunOutcome::MediaFailed;
        };

        if !is_uploadable(&media.path).await {
            loge(format!(
                "Media file {} is missing or empty. Upload skipped.",
                media.path.display()
            ));
            return RunOutcome::MediaFailed;
        }

        let id = match self.host.upload(&media.path, &record).await {
            Ok(id) => id,
            Err(err) => {
                loge(format!("Upload failed: {}", err));
                return RunOutcome::UploadFailed;
            }
        };

        media::dispose(&media).await;
        RunOutcome::Uploaded(id)
    }
}

fn build_producer(cfg: &Config, client: &reqwest::Client) -> Box<dyn MediaProducer> {
    let token = cfg.hf_token().map(str::to_string);
    match cfg.media {
        MediaMode::Video => Box::new(InferenceVideo::new(
            client.clone(),
            cfg.video_api_url.clone(),
            token,
            Duration::from_secs(cfg.video_timeout_secs),
            std::env::temp_dir(),
        )),
        MediaMode::Image => Box::new(StillImage::new(
            client.clone(),
            cfg.image_api_url.clone(),
            token,
            Duration::from_secs(cfg.image_timeout_secs),
            cfg.still_video_secs,
            std::env::temp_dir(),
        )),
        MediaMode::Queue => Box::new(QueueProducer::new(
            cfg.queue_dir.clone(),
            cfg.processed_dir.clone(),
        )),
    }
}

fn build_topic_source(cfg: &Config, client: &reqwest::Client) -> Box<dyn TopicSource> {
    let fallback = FallbackTopics::new(&cfg.fallback_topics);
    match cfg.topic {
        TopicMode::Trends => Box::new(TrendsTopicSource::new(
            client.clone(),
            cfg.trends_url.clone(),
            cfg.trends_geo.clone(),
            fallback,
        )),
        TopicMode::Static => Box::new(StaticTopicSource::new(fallback)),
    }
}

fn build_text_generator(cfg: &Config, client: &reqwest::Client) -> Option<Box<dyn TextGenerator>> {
    let key = cfg.gemini_key()?;
    Some(Box::new(GeminiClient::new(
        client.clone(),
        key,
        cfg.gemini_model.clone(),
        cfg.gemini_base_url.clone(),
        cfg.gemini_timeout(),
    )))
}

/// One full run. Returns the process exit code.
pub async fn run_pipeline(cfg: &Config) -> Result<i32> {
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")?;

    let youtube = match auth::authenticate(cfg, &client).await {
        Ok(youtube) => youtube,
        Err(err) => {
            loge(format!("Authentication failed: {}", err));
            return Ok(1);
        }
    };
    logok("Authenticated with YouTube.");

    match cfg.media {
        MediaMode::Queue => {
            let dirs = [cfg.queue_dir.as_path(), cfg.processed_dir.as_path()];
            init::ensure_directories(&dirs).await?;
        }
        MediaMode::Image => {
            if !init::check_ffmpeg().await {
                logw("FFmpeg not found in PATH. Still image rendering will fail.");
            }
        }
        MediaMode::Video => {}
    }

    let producer = build_producer(cfg, &client);
    let topics = build_topic_source(cfg, &client);
    let metadata = MetadataGenerator::new(
        build_text_generator(cfg, &client),
        cfg.fallback_file.clone(),
        cfg.missing_key_policy,
        producer.needs_prompt(),
    );

    let pipeline = Pipeline {
        topics: topics.as_ref(),
        metadata: &metadata,
        producer: producer.as_ref(),
        host: &youtube,
    };

    let outcome = pipeline.run().await;
    if let RunOutcome::Uploaded(id) = &outcome {
        logok(format!("DONE: https://youtu.be/{}", id));
    }
    Ok(outcome.exit_code())
}
