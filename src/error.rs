use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipegrabError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no mirror served usable data for video '{video_id}'")]
    AllMirrorsExhausted { video_id: String },

    #[error("mirror answered for video '{video_id}' but offered no usable stream")]
    NoStreamsAvailable { video_id: String },

    #[error("stream download failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("retrieval cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PipegrabError>;
