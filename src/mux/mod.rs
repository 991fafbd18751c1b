// Muxing subprocess seam
//
// The concrete tool sits behind a narrow trait so the assembler can be
// tested without invoking a real binary:
// - Command: argument-vector builder for the external tool
// - Ffmpeg: the default implementation

pub mod command;
pub mod ffmpeg;

use async_trait::async_trait;
use std::path::Path;

pub use command::{MuxCommand, MuxCommandBuilder};
pub use ffmpeg::FfmpegMuxer;

use crate::config::MuxerConfig;
use crate::error::Result;

/// How a mux attempt ended. A failed attempt is not an error: it carries the
/// tool diagnostic and the assembler degrades to the video-only file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MuxOutcome {
    Completed,
    Failed(String),
}

/// Combines a video-only stream and a separate audio stream into one file.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Muxer: Send + Sync {
    async fn mux(&self, video_path: &Path, audio_path: &Path, output_path: &Path) -> MuxOutcome;

    /// Check if the muxing tool is available
    fn check_availability(&self) -> Result<()>;
}

/// Factory for creating muxer instances
pub struct MuxerFactory;

impl MuxerFactory {
    /// Create the default muxer implementation (ffmpeg-based)
    pub fn create_muxer(config: MuxerConfig) -> Box<dyn Muxer> {
        Box::new(FfmpegMuxer::new(config))
    }
}
