use anyhow::{Context, Result, bail};
use once_cell::sync::OnceCell;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;

fn item_title_regex() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<item>.*?<title>\s*(?:<!\[CDATA\[)?(.*?)(?:\]\]>)?\s*</title>")
            .expect("trends item regex")
    })
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// First `<item><title>` of a Trends RSS document.
pub fn parse_top_trend(rss: &str) -> Option<String> {
    let cap = item_title_regex().captures(rss)?;
    let title = decode_entities(cap.get(1)?.as_str().trim());
    if title.is_empty() { None } else { Some(title) }
}

/// Fetches today's top trending search for `geo`.
pub async fn fetch_top_trend(client: &Client, feed_url: &str, geo: &str) -> Result<String> {
    let resp = client
        .get(feed_url)
        .query(&[("geo", geo), ("hl", "en-US")])
        .timeout(Duration::from_secs(30))
        .send()
        .await
        .context("Trends request failed")?;

    let status = resp.status();
    if !status.is_success() {
        bail!("Trends HTTP {}", status.as_u16());
    }

    let body = resp.text().await.context("Trends response read failed")?;
    parse_top_trend(&body).context("Trends feed had no items")
}
