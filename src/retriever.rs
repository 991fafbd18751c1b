use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::assembler::Assembler;
use crate::config::Config;
use crate::error::{PipegrabError, Result};
use crate::fetcher::{ProgressSink, StreamFetcher};
use crate::mirrors::MirrorRegistry;
use crate::mux::{Muxer, MuxerFactory};
use crate::resolver::{StreamResolver, VideoMetadata};

/// Final product of a retrieval: a playable local file plus the metadata
/// gathered during resolution. `degrade_detail` is set when the merge step
/// failed and the file is video-only.
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub path: PathBuf,
    pub metadata: VideoMetadata,
    pub degrade_detail: Option<String>,
}

/// Drives resolve -> fetch (x1 or x2) -> assemble for one video identifier.
pub struct Retriever {
    resolver: StreamResolver,
    fetcher: StreamFetcher,
    assembler: Assembler,
}

impl Retriever {
    pub fn new(config: Config) -> Result<Self> {
        let muxer = MuxerFactory::create_muxer(config.muxer.clone());
        Self::with_muxer(config, muxer)
    }

    /// Build a retriever around a specific muxer implementation. A missing
    /// muxing tool is logged, not fatal: assembly degrades to video-only.
    pub fn with_muxer(config: Config, muxer: Box<dyn Muxer>) -> Result<Self> {
        if let Err(e) = muxer.check_availability() {
            warn!("Muxing tool unavailable, merges will degrade to video-only: {}", e);
        }

        let registry = MirrorRegistry::from_config(&config.mirrors);
        let resolver = StreamResolver::new(registry, config.resolver.clone())?;
        let fetcher = StreamFetcher::new(config.fetcher.clone())?;

        Ok(Self {
            resolver,
            fetcher,
            assembler: Assembler::new(muxer),
        })
    }

    /// Retrieve a video into `output_dir` as `{video_id}.mp4`.
    pub async fn retrieve(
        &self,
        video_id: &str,
        output_dir: &Path,
        progress: Option<&ProgressSink>,
    ) -> Result<Retrieval> {
        self.retrieve_cancellable(video_id, output_dir, progress, CancellationToken::new())
            .await
    }

    /// Like [`retrieve`](Self::retrieve), aborting at the next suspension
    /// point once `cancel` fires. Temp files are left in place on
    /// cancellation for caller-directed cleanup.
    pub async fn retrieve_cancellable(
        &self,
        video_id: &str,
        output_dir: &Path,
        progress: Option<&ProgressSink>,
        cancel: CancellationToken,
    ) -> Result<Retrieval> {
        fs::create_dir_all(output_dir).await?;

        let resolved = race(&cancel, self.resolver.resolve(video_id, None)).await?;
        info!(
            "Downloading video: {} ({})",
            resolved.metadata.title, resolved.metadata.quality_label
        );

        let video_temp = output_dir.join(format!("{}_video.mp4", video_id));
        if let Err(err) = race(
            &cancel,
            self.fetcher.fetch(&resolved.video.url, &video_temp, progress),
        )
        .await
        {
            if !matches!(err, PipegrabError::Cancelled) {
                remove_quietly(&video_temp).await;
            }
            return Err(err);
        }

        // A failed audio fetch never fails the retrieval: the video-only
        // file is still deliverable.
        let mut audio_temp = None;
        if resolved.needs_audio_merge() {
            if let Some(audio) = &resolved.audio {
                info!("Downloading audio stream (video was video-only)");
                let temp = output_dir.join(format!("{}_audio.m4a", video_id));
                match race(&cancel, self.fetcher.fetch(&audio.url, &temp, None)).await {
                    Ok(_) => audio_temp = Some(temp),
                    Err(PipegrabError::Cancelled) => return Err(PipegrabError::Cancelled),
                    Err(err) => {
                        warn!("Audio fetch failed, continuing video-only: {}", err);
                        remove_quietly(&temp).await;
                    }
                }
            }
        }

        let output_path = output_dir.join(format!("{}.mp4", video_id));
        let outcome = race(
            &cancel,
            self.assembler
                .assemble(&video_temp, audio_temp.as_deref(), &output_path),
        )
        .await?;

        Ok(Retrieval {
            path: outcome.path().to_path_buf(),
            degrade_detail: outcome.degrade_detail().map(str::to_string),
            metadata: resolved.metadata,
        })
    }
}

/// Race a retrieval step against the cancellation token.
async fn race<T>(
    cancel: &CancellationToken,
    step: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        _ = cancel.cancelled() => Err(PipegrabError::Cancelled),
        result = step => result,
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        warn!("Failed to remove {}: {}", path.display(), e);
    }
}
