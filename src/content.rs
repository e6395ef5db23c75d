use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Metadata for one upload. Lives only for a single pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn fence_regex() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"```(?:json|JSON)?").expect("fence regex"))
}

/// Removes markdown code fences the model likes to wrap JSON in.
pub fn strip_code_fences(text: &str) -> String {
    fence_regex().replace_all(text.trim(), "").trim().to_string()
}

impl ContentRecord {
    pub fn from_json(text: &str) -> Result<Self> {
        let cleaned = strip_code_fences(text);
        let record: ContentRecord =
            serde_json::from_str(&cleaned).with_context(|| "Failed to parse content JSON")?;
        Ok(record.normalized())
    }

    /// Trims every field and drops blank tags.
    pub fn normalized(mut self) -> Self {
        self.prompt = self
            .prompt
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
        self.tags = self
            .tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    /// A record is usable when everything the uploader sends is non-empty,
    /// plus the prompt when a media generator will consume it.
    pub fn is_usable(&self, needs_prompt: bool) -> bool {
        if self.title.is_empty() || self.description.is_empty() || self.tags.is_empty() {
            return false;
        }
        !needs_prompt || self.prompt.is_some()
    }

    pub fn hardcoded_fallback() -> Self {
        Self {
            prompt: Some(
                "Cinematic macro shot of a diamond dissolving into pure light. Slow-motion, 8K."
                    .to_string(),
            ),
            title: "Diamond Dissolve ✨ (Fallback)".to_string(),
            description: "This is a safe fallback prompt used when the Gemini API times out."
                .to_string(),
            tags: ["#fallback", "#AIArt", "#shorts", "#asmr", "#satisfying"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

/// Parses a fallback prompts file: a JSON array of records. Entries that are
/// not usable are dropped.
pub fn parse_fallback_list(text: &str, needs_prompt: bool) -> Result<Vec<ContentRecord>> {
    let list: Vec<ContentRecord> =
        serde_json::from_str(text).with_context(|| "Failed to parse fallback prompts JSON")?;
    Ok(list
        .into_iter()
        .map(ContentRecord::normalized)
        .filter(|r| r.is_usable(needs_prompt))
        .collect())
}
