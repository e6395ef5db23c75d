use crate::api::youtube::{UploadSettings, YouTubeClient};
use crate::config::{Config, DEFAULT_TOKEN_URI, non_empty};
use crate::error::AuthError;
use crate::{logi, logok};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

pub const YOUTUBE_UPLOAD_SCOPE: &str = "https://www.googleapis.com/auth/youtube.upload";

/// Tokens this close to expiry are refreshed up front.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Where the credential material comes from, in priority order.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    TokenFile(PathBuf),
    InlineJson(String),
    RefreshFields {
        refresh_token: String,
        client_id: String,
        client_secret: String,
    },
}

/// Authorized-user token file as written by Google's OAuth tooling.
#[derive(Debug, Deserialize)]
struct AuthorizedUser {
    #[serde(default, alias = "access_token")]
    token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    expiry: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// OAuth credential held in memory for one run. Refreshes are never persisted.
#[derive(Debug, Clone)]
pub struct Credential {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token_uri: String,
    pub expiry: Option<DateTime<Utc>>,
}

fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Credential {
    pub fn from_json(text: &str) -> Result<Self, AuthError> {
        let info: AuthorizedUser = serde_json::from_str(text)?;
        Ok(Self {
            access_token: blank_to_none(info.token),
            refresh_token: blank_to_none(info.refresh_token),
            client_id: blank_to_none(info.client_id),
            client_secret: blank_to_none(info.client_secret),
            token_uri: blank_to_none(info.token_uri)
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            expiry: info.expiry.as_deref().and_then(parse_expiry),
        })
    }

    /// No access token at all, or one that expires within the skew window.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        if self.access_token.is_none() {
            return true;
        }
        match self.expiry {
            Some(expiry) => expiry - ChronoDuration::seconds(EXPIRY_SKEW_SECS) <= now,
            None => false,
        }
    }

    pub async fn refresh(&mut self, client: &Client) -> Result<(), AuthError> {
        let refresh_token = self.refresh_token.as_deref().ok_or(AuthError::NoRefreshToken)?;
        let client_id = self.client_id.as_deref().ok_or(AuthError::Incomplete("client_id"))?;
        let client_secret = self
            .client_secret
            .as_deref()
            .ok_or(AuthError::Incomplete("client_secret"))?;

        let resp = client
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .timeout(Duration::from_secs(30))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::RefreshRejected {
                status: status.as_u16(),
                body: body.chars().take(400).collect(),
            });
        }

        let token: TokenResponse = resp.json().await?;
        self.expiry = token
            .expires_in
            .map(|secs| Utc::now() + ChronoDuration::seconds(secs));
        self.access_token = Some(token.access_token);
        Ok(())
    }
}

pub fn credential_source(cfg: &Config) -> Result<CredentialSource, AuthError> {
    if let Some(path) = &cfg.youtube_token_path {
        if !path.as_os_str().is_empty() {
            return Ok(CredentialSource::TokenFile(path.clone()));
        }
    }
    if let Some(json) = non_empty(&cfg.youtube_token_json) {
        return Ok(CredentialSource::InlineJson(json.to_string()));
    }
    match (
        non_empty(&cfg.youtube_refresh_token),
        non_empty(&cfg.youtube_client_id),
        non_empty(&cfg.youtube_client_secret),
    ) {
        (Some(refresh_token), Some(client_id), Some(client_secret)) => {
            Ok(CredentialSource::RefreshFields {
                refresh_token: refresh_token.to_string(),
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
            })
        }
        _ => Err(AuthError::Missing),
    }
}

pub async fn load_credential(source: &CredentialSource) -> Result<Credential, AuthError> {
    match source {
        CredentialSource::TokenFile(path) => {
            if fs::metadata(path).await.map(|m| !m.is_file()).unwrap_or(true) {
                return Err(AuthError::TokenFileMissing(path.display().to_string()));
            }
            let text = fs::read_to_string(path)
                .await
                .map_err(|source| AuthError::TokenFileRead {
                    path: path.display().to_string(),
                    source,
                })?;
            Credential::from_json(&text)
        }
        CredentialSource::InlineJson(text) => Credential::from_json(text),
        CredentialSource::RefreshFields {
            refresh_token,
            client_id,
            client_secret,
        } => Ok(Credential {
            access_token: None,
            refresh_token: Some(refresh_token.clone()),
            client_id: Some(client_id.clone()),
            client_secret: Some(client_secret.clone()),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            expiry: None,
        }),
    }
}

/// Loads the configured credential, refreshes it when needed and returns an
/// upload-capable client.
pub async fn authenticate(cfg: &Config, client: &Client) -> Result<YouTubeClient, AuthError> {
    let source = credential_source(cfg)?;
    let mut credential = load_credential(&source).await?;

    if credential.is_expired(Utc::now()) {
        logi("Access token expired. Refreshing token...");
        credential.refresh(client).await?;
        logok("Access token refreshed.");
    }

    let access_token = credential.access_token.ok_or(AuthError::NoRefreshToken)?;
    let settings = UploadSettings {
        upload_url: cfg.youtube_upload_url.clone(),
        category_id: cfg.youtube_category_id.clone(),
        privacy_status: cfg.youtube_privacy.clone(),
        chunk_bytes: cfg.upload_chunk_bytes(),
    };
    Ok(YouTubeClient::new(access_token, settings)?)
}
