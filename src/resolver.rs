use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::error::{PipegrabError, Result};
use crate::mirrors::{MirrorEndpoint, MirrorRegistry};

/// One encoded rendition of a video with its own fetchable URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamCandidate {
    pub url: String,
    pub mime_type: String,
    pub height: u32,
    pub bitrate: u64,
    /// False means the stream is self-contained (carries audio and video)
    pub video_only: bool,
    pub quality: String,
}

/// Descriptive fields copied from the mirror response, with defaults filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub duration_seconds: u64,
    pub thumbnail_url: String,
    pub uploader: String,
    pub views: u64,
    pub quality_label: String,
}

/// Outcome of stream resolution: the chosen video rendition, an audio
/// rendition when the video is not self-contained, and the video metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedMedia {
    pub video: StreamCandidate,
    pub audio: Option<StreamCandidate>,
    pub metadata: VideoMetadata,
}

impl ResolvedMedia {
    /// True when a separate audio stream must be fetched and merged.
    pub fn needs_audio_merge(&self) -> bool {
        self.video.video_only && self.audio.is_some()
    }
}

/// Raw shape of the Piped `/streams/{videoId}` payload. Heights and bitrates
/// come back as -1 for fields that do not apply, so they are parsed signed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamsResponse {
    error: Option<String>,
    title: Option<String>,
    description: Option<String>,
    duration: Option<i64>,
    thumbnail_url: Option<String>,
    uploader: Option<String>,
    views: Option<i64>,
    #[serde(default)]
    video_streams: Vec<RawStream>,
    #[serde(default)]
    audio_streams: Vec<RawStream>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStream {
    url: Option<String>,
    mime_type: Option<String>,
    height: Option<i64>,
    bitrate: Option<i64>,
    #[serde(default)]
    video_only: bool,
    quality: Option<String>,
}

impl RawStream {
    fn into_candidate(self) -> Option<StreamCandidate> {
        Some(StreamCandidate {
            url: self.url?,
            mime_type: self.mime_type.unwrap_or_default(),
            height: self.height.unwrap_or(0).max(0) as u32,
            bitrate: self.bitrate.unwrap_or(0).max(0) as u64,
            video_only: self.video_only,
            quality: self.quality.unwrap_or_else(|| "Unknown".to_string()),
        })
    }
}

/// Why a single mirror attempt did not produce a usable response. Absorbed by
/// the failover loop, never surfaced to the caller.
#[derive(Debug)]
enum MirrorFailure {
    Network(reqwest::Error),
    Status(reqwest::StatusCode),
    Malformed(reqwest::Error),
    ApiError(String),
    NoVideoStreams,
}

impl std::fmt::Display for MirrorFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(e) => write!(f, "network error: {}", e),
            Self::Status(code) => write!(f, "HTTP {}", code),
            Self::Malformed(e) => write!(f, "malformed payload: {}", e),
            Self::ApiError(msg) => write!(f, "API error: {}", msg),
            Self::NoVideoStreams => f.write_str("no video streams listed"),
        }
    }
}

/// Queries mirrors for a video's stream listing and normalizes the response
/// into a single ranked choice.
pub struct StreamResolver {
    client: Client,
    registry: MirrorRegistry,
    config: ResolverConfig,
}

impl StreamResolver {
    pub fn new(registry: MirrorRegistry, config: ResolverConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("pipegrab/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(PipegrabError::Http)?;

        Ok(Self {
            client,
            registry,
            config,
        })
    }

    /// Resolve a video identifier into a ranked stream choice, trying mirrors
    /// in registry order. When `mirror` is given, only that mirror is tried.
    pub async fn resolve(
        &self,
        video_id: &str,
        mirror: Option<&MirrorEndpoint>,
    ) -> Result<ResolvedMedia> {
        let pool;
        let mirrors: &[MirrorEndpoint] = match mirror {
            Some(single) => {
                pool = [single.clone()];
                &pool
            }
            None => self.registry.endpoints(),
        };

        for mirror in mirrors {
            info!("Trying mirror: {}", mirror);
            match self.try_mirror(mirror, video_id).await {
                Ok(resolved) => {
                    info!(
                        "Resolved '{}' via {}: {} ({})",
                        video_id, mirror, resolved.metadata.title, resolved.metadata.quality_label
                    );
                    return Ok(resolved);
                }
                Err(TryMirrorError::Retry(failure)) => {
                    warn!("Mirror {} failed: {}", mirror, failure);
                }
                Err(TryMirrorError::Fatal(err)) => return Err(err),
            }
        }

        Err(PipegrabError::AllMirrorsExhausted {
            video_id: video_id.to_string(),
        })
    }

    async fn try_mirror(
        &self,
        mirror: &MirrorEndpoint,
        video_id: &str,
    ) -> std::result::Result<ResolvedMedia, TryMirrorError> {
        let url = mirror.streams_url(video_id);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(self.config.request_timeout_secs))
            .send()
            .await
            .map_err(MirrorFailure::Network)?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(MirrorFailure::Status(status).into());
        }

        let payload: StreamsResponse = response.json().await.map_err(MirrorFailure::Malformed)?;

        if let Some(message) = payload.error {
            return Err(MirrorFailure::ApiError(message).into());
        }

        let metadata_source = MetadataFields {
            title: payload.title,
            description: payload.description,
            duration: payload.duration,
            thumbnail_url: payload.thumbnail_url,
            uploader: payload.uploader,
            views: payload.views,
        };

        if payload.video_streams.is_empty() {
            return Err(MirrorFailure::NoVideoStreams.into());
        }

        let video_candidates: Vec<StreamCandidate> = payload
            .video_streams
            .into_iter()
            .filter_map(RawStream::into_candidate)
            .collect();
        let audio_candidates: Vec<StreamCandidate> = payload
            .audio_streams
            .into_iter()
            .filter_map(RawStream::into_candidate)
            .collect();

        // The mirror listed streams but none carries a fetchable URL; a
        // different mirror would serve the same listing, so stop here.
        if video_candidates.is_empty() {
            return Err(TryMirrorError::Fatal(PipegrabError::NoStreamsAvailable {
                video_id: video_id.to_string(),
            }));
        }

        let video = choose_video_stream(&video_candidates, &self.config.preferred_mime_prefix)
            .ok_or_else(|| {
                TryMirrorError::Fatal(PipegrabError::NoStreamsAvailable {
                    video_id: video_id.to_string(),
                })
            })?
            .clone();

        let audio = if video.video_only {
            choose_audio_stream(&audio_candidates).cloned()
        } else {
            None
        };

        Ok(ResolvedMedia {
            metadata: metadata_source.into_metadata(&video),
            video,
            audio,
        })
    }
}

enum TryMirrorError {
    /// This mirror failed; continue with the next one.
    Retry(MirrorFailure),
    /// Stop the failover loop and surface this error.
    Fatal(PipegrabError),
}

impl From<MirrorFailure> for TryMirrorError {
    fn from(failure: MirrorFailure) -> Self {
        Self::Retry(failure)
    }
}

struct MetadataFields {
    title: Option<String>,
    description: Option<String>,
    duration: Option<i64>,
    thumbnail_url: Option<String>,
    uploader: Option<String>,
    views: Option<i64>,
}

impl MetadataFields {
    fn into_metadata(self, video: &StreamCandidate) -> VideoMetadata {
        VideoMetadata {
            title: self.title.unwrap_or_else(|| "Unknown Title".to_string()),
            description: self.description.unwrap_or_default(),
            duration_seconds: self.duration.unwrap_or(0).max(0) as u64,
            thumbnail_url: self.thumbnail_url.unwrap_or_default(),
            uploader: self.uploader.unwrap_or_else(|| "Unknown".to_string()),
            views: self.views.unwrap_or(0).max(0) as u64,
            quality_label: video.quality.clone(),
        }
    }
}

/// Score used to rank video renditions. Self-contained streams win over any
/// video-only stream regardless of resolution; 720p is the sweet spot between
/// quality and file size, so it outranks 1080p.
pub fn video_stream_score(candidate: &StreamCandidate) -> i64 {
    let mut score = if candidate.video_only { 0 } else { 1000 };

    score += match candidate.height {
        720 => 100,
        1080 => 90,
        480 => 80,
        360 => 70,
        other => (other / 10) as i64,
    };

    score
}

/// Pick the highest-scoring video rendition, preferring the configured
/// container family and falling back to the unfiltered list when that family
/// is absent. Ties resolve to the first-seen candidate.
pub fn choose_video_stream<'a>(
    candidates: &'a [StreamCandidate],
    preferred_mime_prefix: &str,
) -> Option<&'a StreamCandidate> {
    let preferred: Vec<&StreamCandidate> = candidates
        .iter()
        .filter(|c| c.mime_type.starts_with(preferred_mime_prefix))
        .collect();

    let pool: Vec<&StreamCandidate> = if preferred.is_empty() {
        candidates.iter().collect()
    } else {
        preferred
    };

    pool.into_iter().fold(None, |best, candidate| match best {
        Some(current) if video_stream_score(candidate) <= video_stream_score(current) => Some(current),
        _ => Some(candidate),
    })
}

/// Pick an audio rendition to pair with a video-only stream: highest bitrate
/// first, preferring the m4a/mp4 container family among the ranked list.
pub fn choose_audio_stream(candidates: &[StreamCandidate]) -> Option<&StreamCandidate> {
    let mut ranked: Vec<&StreamCandidate> = candidates.iter().collect();
    ranked.sort_by(|a, b| b.bitrate.cmp(&a.bitrate));

    ranked
        .iter()
        .find(|c| {
            let mime = c.mime_type.to_lowercase();
            mime.contains("m4a") || mime.contains("mp4")
        })
        .or_else(|| ranked.first())
        .copied()
}
