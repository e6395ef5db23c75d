use crate::config::MissingKeyPolicy;
use crate::content::{ContentRecord, parse_fallback_list};
use crate::{logi, logok, logw};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};
use tokio::fs;

/// A generative-text backend that answers one instruction with raw text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;
    async fn generate_text(&self, instruction: &str) -> Result<String>;
}

pub fn build_instruction(topic: &str) -> String {
    format!(
        "You are a prompt engineer for a fast AI video generator.\n\
Your task is to take the concept: '{}' and convert it into the required JSON output.\n\n\
CRITICAL: Keep the resulting prompt short and visually direct (MAX 15 words).\n\
DO NOT reason or add unnecessary text to the prompt or JSON.\n\n\
Format the output as a clean JSON object with the following keys:\n\
- \"prompt\": The single, high-impact visual prompt.\n\
- \"title\": A viral YouTube Shorts title (MAX 60 characters).\n\
- \"description\": A short, viral-style description with a call-to-action (max 3 lines).\n\
- \"tags\": A list of 5 relevant viral hashtags.\n",
        topic
    )
}

async fn read_fallback_file(path: &Path, needs_prompt: bool) -> Result<ContentRecord> {
    let text = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read fallback file: {}", path.display()))?;
    let list = parse_fallback_list(&text, needs_prompt)?;
    list.choose(&mut rand::thread_rng())
        .cloned()
        .with_context(|| format!("No usable entries in {}", path.display()))
}

/// Random usable entry from the fallback file, else the hardcoded record.
pub async fn fallback_record(path: &Path, needs_prompt: bool) -> ContentRecord {
    match read_fallback_file(path, needs_prompt).await {
        Ok(record) => {
            logi(format!("Using fallback record from {}: {}", path.display(), record.title));
            record
        }
        Err(err) => {
            logw(format!("Could not read fallback file. {:#}. Using hardcoded safe prompt.", err));
            ContentRecord::hardcoded_fallback()
        }
    }
}

/// Turns a topic into upload metadata, substituting fallback data on failure.
pub struct MetadataGenerator {
    generator: Option<Box<dyn TextGenerator>>,
    fallback_file: PathBuf,
    missing_key_policy: MissingKeyPolicy,
    needs_prompt: bool,
}

impl MetadataGenerator {
    pub fn new(
        generator: Option<Box<dyn TextGenerator>>,
        fallback_file: impl Into<PathBuf>,
        missing_key_policy: MissingKeyPolicy,
        needs_prompt: bool,
    ) -> Self {
        Self {
            generator,
            fallback_file: fallback_file.into(),
            missing_key_policy,
            needs_prompt,
        }
    }

    /// `None` only when no generator is configured and the policy is `Abort`.
    pub async fn generate(&self, topic: &str) -> Option<ContentRecord> {
        let generator = match &self.generator {
            Some(generator) => generator,
            None => {
                logw("Error: GEMINI_API_KEY is not set.");
                return match self.missing_key_policy {
                    MissingKeyPolicy::Fallback => {
                        Some(fallback_record(&self.fallback_file, self.needs_prompt).await)
                    }
                    MissingKeyPolicy::Abort => None,
                };
            }
        };

        logi(format!("Generating metadata for topic: {}", topic));
        let live = generator
            .generate_text(&build_instruction(topic))
            .await
            .and_then(|text| ContentRecord::from_json(&text));

        match live {
            Ok(record) if record.is_usable(self.needs_prompt) => {
                logok(format!("{} metadata received: {}", generator.name(), record.title));
                Some(record)
            }
            Ok(_) => {
                logw(format!(
                    "{} returned incomplete metadata. Falling back to local prompt.",
                    generator.name()
                ));
                Some(fallback_record(&self.fallback_file, self.needs_prompt).await)
            }
            Err(err) => {
                logw(format!(
                    "{} API FAILED: {:#}. Falling back to local prompt.",
                    generator.name(),
                    err
                ));
                Some(fallback_record(&self.fallback_file, self.needs_prompt).await)
            }
        }
    }
}
