use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::FetcherConfig;
use crate::error::{PipegrabError, Result};

/// Callback receiving (bytes written so far, total advertised bytes). Only
/// invoked when the response advertises a content length; the last call may
/// overshoot the total when the upstream lies about it.
pub type ProgressSink = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Streams a remote binary resource to a local file in fixed-size chunks.
pub struct StreamFetcher {
    client: Client,
    config: FetcherConfig,
}

impl StreamFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("pipegrab/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(PipegrabError::Http)?;

        Ok(Self { client, config })
    }

    /// Download `url` into `destination`, reporting progress per written
    /// chunk. The whole transfer runs under one overall deadline; on failure
    /// the partial file is left in place for the caller to clean up.
    pub async fn fetch(
        &self,
        url: &str,
        destination: &Path,
        progress: Option<&ProgressSink>,
    ) -> Result<u64> {
        let deadline = Duration::from_secs(self.config.download_timeout_secs);

        match tokio::time::timeout(deadline, self.fetch_inner(url, destination, progress)).await {
            Ok(result) => result,
            Err(_) => Err(PipegrabError::FetchFailed {
                url: url.to_string(),
                reason: format!("timed out after {}s", self.config.download_timeout_secs),
            }),
        }
    }

    async fn fetch_inner(
        &self,
        url: &str,
        destination: &Path,
        progress: Option<&ProgressSink>,
    ) -> Result<u64> {
        let fetch_failed = |reason: String| PipegrabError::FetchFailed {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_failed(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(fetch_failed(format!("HTTP {}", status)));
        }

        let total = response.content_length();
        debug!(
            "Downloading {} -> {} ({} bytes advertised)",
            url,
            destination.display(),
            total.map(|t| t.to_string()).unwrap_or_else(|| "?".to_string())
        );

        // The file handle lives only inside this scope; any early return
        // drops and closes it with the partial content intact.
        let mut file = File::create(destination).await?;
        let mut stream = response.bytes_stream();
        let chunk_size = self.config.chunk_size;
        let mut pending: Vec<u8> = Vec::with_capacity(chunk_size);
        let mut written: u64 = 0;

        while let Some(piece) = stream.next().await {
            let piece = piece.map_err(|e| fetch_failed(e.to_string()))?;
            pending.extend_from_slice(&piece);

            while pending.len() >= chunk_size {
                let chunk: Vec<u8> = pending.drain(..chunk_size).collect();
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
                report(progress, total, written);
            }
        }

        if !pending.is_empty() {
            file.write_all(&pending).await?;
            written += pending.len() as u64;
            report(progress, total, written);
        }

        file.flush().await?;
        info!("Downloaded {} bytes to {}", written, destination.display());
        Ok(written)
    }
}

fn report(progress: Option<&ProgressSink>, total: Option<u64>, written: u64) {
    if let (Some(sink), Some(total)) = (progress, total) {
        if total > 0 {
            sink(written, total);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::StubServer;
    use std::sync::Mutex;
    use tempfile::tempdir;

    fn fetcher(chunk_size: usize) -> StreamFetcher {
        StreamFetcher::new(FetcherConfig {
            download_timeout_secs: 5,
            chunk_size,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn writes_exact_bytes_and_reports_per_chunk() {
        let body: Vec<u8> = (0u8..=9).collect();
        let server = StubServer::spawn(200, "application/octet-stream", body.clone()).await;
        let dir = tempdir().unwrap();
        let dest = dir.path().join("out.bin");

        let calls: Arc<Mutex<Vec<(u64, u64)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink: ProgressSink = {
            let calls = Arc::clone(&calls);
            Arc::new(move |done, total| calls.lock().unwrap().push((done, total)))
        };

        let written = fetcher(4)
            .fetch(&server.url(), &dest, Some(&sink))
            .await
            .unwrap();

        assert_eq!(written, 10);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), body);

        // ceil(10 / 4) = 3 progress calls, cumulative and ending at the total
        let calls = calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[(4, 10), (8, 10), (10, 10)]);
    }

    #[tokio::test]
    async fn chunk_aligned_body_reports_floor_times() {
        let body = vec![7u8; 8];
        let server = StubServer::spawn(200, "application/octet-stream", body).await;
        let dir = tempdir().unwrap();
        let dest = dir.path().join("out.bin");

        let count = Arc::new(Mutex::new(0usize));
        let sink: ProgressSink = {
            let count = Arc::clone(&count);
            Arc::new(move |_, _| *count.lock().unwrap() += 1)
        };

        let written = fetcher(4)
            .fetch(&server.url(), &dest, Some(&sink))
            .await
            .unwrap();

        assert_eq!(written, 8);
        assert_eq!(*count.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn missing_content_length_skips_progress_reporting() {
        let body = vec![3u8; 10];
        let server = StubServer::spawn_without_length(200, body.clone()).await;
        let dir = tempdir().unwrap();
        let dest = dir.path().join("out.bin");

        let count = Arc::new(Mutex::new(0usize));
        let sink: ProgressSink = {
            let count = Arc::clone(&count);
            Arc::new(move |_, _| *count.lock().unwrap() += 1)
        };

        let written = fetcher(4)
            .fetch(&server.url(), &dest, Some(&sink))
            .await
            .unwrap();

        assert_eq!(written, 10);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), body);
        assert_eq!(*count.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn non_200_aborts_before_writing() {
        let server = StubServer::spawn(404, "text/plain", b"gone".to_vec()).await;
        let dir = tempdir().unwrap();
        let dest = dir.path().join("out.bin");

        let err = fetcher(4).fetch(&server.url(), &dest, None).await.unwrap_err();
        assert!(matches!(err, PipegrabError::FetchFailed { .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn transport_error_surfaces_as_fetch_failure() {
        let url = StubServer::unreachable_url().await;
        let dir = tempdir().unwrap();
        let dest = dir.path().join("out.bin");

        let err = fetcher(4).fetch(&url, &dest, None).await.unwrap_err();
        assert!(matches!(err, PipegrabError::FetchFailed { .. }));
    }
}
