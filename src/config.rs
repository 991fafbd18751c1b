use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PipegrabError, Result};

fn default_chunk_size() -> usize {
    1024 * 1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub mirrors: MirrorConfig,
    pub resolver: ResolverConfig,
    pub fetcher: FetcherConfig,
    pub muxer: MuxerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Ordered list of equivalent Piped API base URLs, tried first to last
    pub endpoints: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Per-mirror metadata request timeout in seconds
    pub request_timeout_secs: u64,
    /// Preferred container mime prefix; falls back to all streams when no match
    pub preferred_mime_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Overall timeout for a single stream download in seconds
    pub download_timeout_secs: u64,
    /// Fixed chunk size in bytes for file writes and progress reporting
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuxerConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Target audio codec when merging a separate audio stream
    pub audio_codec: String,
    /// Timeout for the muxing subprocess in seconds
    pub mux_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mirrors: MirrorConfig {
                endpoints: vec![
                    "https://pipedapi.kavin.rocks".to_string(),
                    "https://pipedapi.adminforge.de".to_string(),
                    "https://api.piped.privacydev.net".to_string(),
                    "https://pipedapi.r4fo.com".to_string(),
                    "https://pipedapi.moomoo.me".to_string(),
                    "https://pipedapi.syncpundit.io".to_string(),
                    "https://api-piped.mha.fi".to_string(),
                ],
            },
            resolver: ResolverConfig {
                request_timeout_secs: 30,
                preferred_mime_prefix: "video/mp4".to_string(),
            },
            fetcher: FetcherConfig {
                download_timeout_secs: 600,
                chunk_size: default_chunk_size(),
            },
            muxer: MuxerConfig {
                binary_path: "ffmpeg".to_string(),
                audio_codec: "aac".to_string(),
                mux_timeout_secs: 300,
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipegrabError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| PipegrabError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| PipegrabError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| PipegrabError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}
