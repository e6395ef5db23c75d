use thiserror::Error;

/// Fatal credential problems. Any of these ends the run with exit code 1.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no YouTube credential configured (token file, token JSON or refresh token)")]
    Missing,

    #[error("authentication file ({0}) is missing")]
    TokenFileMissing(String),

    #[error("failed to read token file {path}: {source}")]
    TokenFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed token JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("access token expired and no refresh token is available")]
    NoRefreshToken,

    #[error("token refresh requires {0}")]
    Incomplete(&'static str),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token refresh rejected with HTTP {status}: {body}")]
    RefreshRejected { status: u16, body: String },
}

/// Failures during the resumable transfer. Not retried.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("media file {0} is missing or empty")]
    EmptyMedia(String),

    #[error("upload request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upload I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("upload session rejected with HTTP {status}: {body}")]
    SessionRejected { status: u16, body: String },

    #[error("upload session response had no usable Location header")]
    NoSessionUri,

    #[error("chunk upload rejected with HTTP {status}: {body}")]
    ChunkRejected { status: u16, body: String },

    #[error("upload stalled at byte {0}")]
    Stalled(u64),

    #[error("upload response did not contain a video id")]
    NoVideoId,
}
