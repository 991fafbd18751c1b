use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::error::Result;
use crate::mux::{MuxOutcome, Muxer};

/// How the final file was produced. A failed merge is reported here, not as
/// an error: the downloaded video is always delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyOutcome {
    /// Separate video and audio streams merged into one container
    Merged { path: PathBuf },
    /// Video-only file moved into place. `degraded` carries the mux
    /// diagnostic when a merge was attempted and failed; it is `None` when
    /// the source stream was self-contained or had no separate audio.
    VideoOnly {
        path: PathBuf,
        degraded: Option<String>,
    },
}

impl AssemblyOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Merged { path } => path,
            Self::VideoOnly { path, .. } => path,
        }
    }

    pub fn degrade_detail(&self) -> Option<&str> {
        match self {
            Self::Merged { .. } => None,
            Self::VideoOnly { degraded, .. } => degraded.as_deref(),
        }
    }
}

/// Produces the final single-file output from fetched streams, degrading to
/// the video-only file whenever the merge step cannot complete.
pub struct Assembler {
    muxer: Box<dyn Muxer>,
}

impl Assembler {
    pub fn new(muxer: Box<dyn Muxer>) -> Self {
        Self { muxer }
    }

    pub async fn assemble(
        &self,
        video_path: &Path,
        audio_path: Option<&Path>,
        output_path: &Path,
    ) -> Result<AssemblyOutcome> {
        let Some(audio_path) = audio_path else {
            // Nothing to merge: the fetched file becomes the output as-is
            fs::rename(video_path, output_path).await?;
            return Ok(AssemblyOutcome::VideoOnly {
                path: output_path.to_path_buf(),
                degraded: None,
            });
        };

        match self.muxer.mux(video_path, audio_path, output_path).await {
            MuxOutcome::Completed => {
                info!("Merged video and audio into {}", output_path.display());
                remove_quietly(video_path).await;
                remove_quietly(audio_path).await;
                Ok(AssemblyOutcome::Merged {
                    path: output_path.to_path_buf(),
                })
            }
            MuxOutcome::Failed(detail) => {
                warn!("Merge failed, keeping video-only file: {}", detail);
                fs::rename(video_path, output_path).await?;
                remove_quietly(audio_path).await;
                Ok(AssemblyOutcome::VideoOnly {
                    path: output_path.to_path_buf(),
                    degraded: Some(detail),
                })
            }
        }
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        warn!("Failed to remove {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mux::MockMuxer;
    use tempfile::tempdir;

    async fn write_fixture(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).await.unwrap();
        path
    }

    #[tokio::test]
    async fn no_audio_is_a_pure_move() {
        let dir = tempdir().unwrap();
        let video = write_fixture(dir.path(), "v.mp4", b"video bytes").await;
        let output = dir.path().join("out.mp4");

        // The muxer must not be consulted at all
        let assembler = Assembler::new(Box::new(MockMuxer::new()));
        let outcome = assembler.assemble(&video, None, &output).await.unwrap();

        assert_eq!(
            outcome,
            AssemblyOutcome::VideoOnly {
                path: output.clone(),
                degraded: None
            }
        );
        assert!(!video.exists());
        assert_eq!(fs::read(&output).await.unwrap(), b"video bytes");
    }

    #[tokio::test]
    async fn successful_merge_deletes_both_sources() {
        let dir = tempdir().unwrap();
        let video = write_fixture(dir.path(), "v.mp4", b"video bytes").await;
        let audio = write_fixture(dir.path(), "a.m4a", b"audio bytes").await;
        let output = dir.path().join("out.mp4");

        let mut muxer = MockMuxer::new();
        muxer.expect_mux().times(1).returning(|_, _, output| {
            std::fs::write(output, b"merged bytes").unwrap();
            MuxOutcome::Completed
        });

        let assembler = Assembler::new(Box::new(muxer));
        let outcome = assembler
            .assemble(&video, Some(&audio), &output)
            .await
            .unwrap();

        assert_eq!(outcome, AssemblyOutcome::Merged { path: output.clone() });
        assert!(!video.exists());
        assert!(!audio.exists());
        assert_eq!(fs::read(&output).await.unwrap(), b"merged bytes");
    }

    #[tokio::test]
    async fn failed_merge_keeps_video_and_discards_audio() {
        let dir = tempdir().unwrap();
        let video = write_fixture(dir.path(), "v.mp4", b"video bytes").await;
        let audio = write_fixture(dir.path(), "a.m4a", b"audio bytes").await;
        let output = dir.path().join("out.mp4");

        let mut muxer = MockMuxer::new();
        muxer
            .expect_mux()
            .times(1)
            .returning(|_, _, _| MuxOutcome::Failed("exit status 1".to_string()));

        let assembler = Assembler::new(Box::new(muxer));
        let outcome = assembler
            .assemble(&video, Some(&audio), &output)
            .await
            .unwrap();

        assert_eq!(outcome.path(), output.as_path());
        assert_eq!(outcome.degrade_detail(), Some("exit status 1"));
        assert!(!video.exists());
        assert!(!audio.exists());
        assert_eq!(fs::read(&output).await.unwrap(), b"video bytes");
    }
}
