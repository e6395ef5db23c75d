use crate::api::trends;
use crate::{logi, logw};
use async_trait::async_trait;
use rand::Rng;
use rand::seq::SliceRandom;
use reqwest::Client;

pub const DEFAULT_FALLBACK_TOPICS: &[&str] = &[
    "Unrealistic ASMR slicing",
    "Hydraulic press versus rainbow jelly",
    "Kinetic sand cutting",
    "Glass fruit slicing",
    "Soap carving in slow motion",
];

/// Produces creative seed text. Never fails.
#[async_trait]
pub trait TopicSource: Send + Sync {
    async fn topic(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct FallbackTopics {
    topics: Vec<String>,
}

impl FallbackTopics {
    /// Blank entries are ignored; an empty list means the built-in one.
    pub fn new(topics: &[String]) -> Self {
        let mut topics: Vec<String> = topics
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if topics.is_empty() {
            topics = DEFAULT_FALLBACK_TOPICS.iter().map(|t| t.to_string()).collect();
        }
        Self { topics }
    }

    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        self.topics
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| DEFAULT_FALLBACK_TOPICS[0].to_string())
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics.iter().any(|t| t == topic)
    }
}

pub struct StaticTopicSource {
    topics: FallbackTopics,
}

impl StaticTopicSource {
    pub fn new(topics: FallbackTopics) -> Self {
        Self { topics }
    }
}

#[async_trait]
impl TopicSource for StaticTopicSource {
    async fn topic(&self) -> String {
        self.topics.pick(&mut rand::thread_rng())
    }
}

/// Google Trends top search, with a random fallback topic on any failure.
pub struct TrendsTopicSource {
    client: Client,
    feed_url: String,
    geo: String,
    fallback: FallbackTopics,
}

impl TrendsTopicSource {
    pub fn new(
        client: Client,
        feed_url: impl Into<String>,
        geo: impl Into<String>,
        fallback: FallbackTopics,
    ) -> Self {
        Self {
            client,
            feed_url: feed_url.into(),
            geo: geo.into(),
            fallback,
        }
    }
}

#[async_trait]
impl TopicSource for TrendsTopicSource {
    async fn topic(&self) -> String {
        match trends::fetch_top_trend(&self.client, &self.feed_url, &self.geo).await {
            Ok(topic) => {
                logi(format!("Trending topic: {}", topic));
                topic
            }
            Err(err) => {
                let topic = self.fallback.pick(&mut rand::thread_rng());
                logw(format!("Trend lookup failed ({:#}); using fallback topic: {}", err, topic));
                topic
            }
        }
    }
}
