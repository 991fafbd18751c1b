use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, info};

use super::{MuxCommand, MuxCommandBuilder, MuxOutcome, Muxer};
use crate::config::MuxerConfig;
use crate::error::{PipegrabError, Result};

/// FFmpeg-based muxer implementation
pub struct FfmpegMuxer {
    config: MuxerConfig,
    command_builder: MuxCommandBuilder,
}

impl FfmpegMuxer {
    pub fn new(config: MuxerConfig) -> Self {
        let command_builder = MuxCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
        }
    }

    async fn run(&self, command: MuxCommand) -> MuxOutcome {
        debug!(
            "Executing muxing command: {} {:?}",
            command.binary_path, command.args
        );

        let mut cmd = tokio::process::Command::new(&command.binary_path);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let deadline = Duration::from_secs(self.config.mux_timeout_secs);
        match tokio::time::timeout(deadline, cmd.output()).await {
            Ok(Ok(output)) if output.status.success() => MuxOutcome::Completed,
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                MuxOutcome::Failed(format!(
                    "{} exited with {}: {}",
                    command.description,
                    output.status,
                    stderr.trim()
                ))
            }
            Ok(Err(e)) => MuxOutcome::Failed(format!(
                "failed to launch {}: {}",
                command.binary_path, e
            )),
            Err(_) => MuxOutcome::Failed(format!(
                "{} timed out after {}s",
                command.description, self.config.mux_timeout_secs
            )),
        }
    }
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    async fn mux(&self, video_path: &Path, audio_path: &Path, output_path: &Path) -> MuxOutcome {
        info!(
            "Merging {} + {} -> {}",
            video_path.display(),
            audio_path.display(),
            output_path.display()
        );

        let command = self.command_builder.merge(
            video_path,
            audio_path,
            output_path,
            &self.config.audio_codec,
        );

        self.run(command).await
    }

    fn check_availability(&self) -> Result<()> {
        let command = self.command_builder.version_check();
        let output = std::process::Command::new(&command.binary_path)
            .args(&command.args)
            .output()
            .map_err(|e| {
                PipegrabError::Config(format!("Muxing tool not found: {}", e))
            })?;

        if output.status.success() {
            info!("Muxing tool is available");
            Ok(())
        } else {
            Err(PipegrabError::Config(
                "Muxing tool version check failed".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn muxer_with_binary(binary: &str, timeout_secs: u64) -> FfmpegMuxer {
        FfmpegMuxer::new(MuxerConfig {
            binary_path: binary.to_string(),
            audio_codec: "aac".to_string(),
            mux_timeout_secs: timeout_secs,
        })
    }

    #[tokio::test]
    async fn missing_binary_fails_without_error() {
        let dir = tempdir().unwrap();
        let muxer = muxer_with_binary("/nonexistent/ffmpeg-binary", 5);

        let outcome = muxer
            .mux(
                &dir.path().join("v.mp4"),
                &dir.path().join("a.m4a"),
                &dir.path().join("out.mp4"),
            )
            .await;

        assert!(matches!(outcome, MuxOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn nonzero_exit_carries_diagnostic() {
        let dir = tempdir().unwrap();
        // `false` ignores its arguments and exits 1
        let muxer = muxer_with_binary("false", 5);

        let outcome = muxer
            .mux(
                &dir.path().join("v.mp4"),
                &dir.path().join("a.m4a"),
                &dir.path().join("out.mp4"),
            )
            .await;

        match outcome {
            MuxOutcome::Failed(detail) => assert!(detail.contains("exited with")),
            MuxOutcome::Completed => panic!("expected failure"),
        }
    }

    #[test]
    fn availability_check_reports_missing_tool() {
        let muxer = muxer_with_binary("/nonexistent/ffmpeg-binary", 5);
        assert!(muxer.check_availability().is_err());
    }
}
