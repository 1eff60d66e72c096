//! Remote artifact retrieval.
//!
//! All remote payloads applied to an installation (installer binary, game
//! build, mod-loader build, individual mod files) come through
//! [`ArtifactFetcher`]. Small artifacts are buffered in memory; large archive
//! builds are streamed to a temporary file to bound memory use.
//!
//! Each artifact gets exactly one attempt: a non-success response status or a
//! transport error aborts the current update step and propagates to the
//! pipeline's failure handler, which decides whether to restore a backup.

use futures::StreamExt;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::core::LauncherError;

/// HTTP client wrapper for downloading update artifacts.
///
/// Holds a single [`reqwest::Client`] so connections are reused across the
/// sequential downloads of one pipeline run. No explicit timeout is imposed
/// beyond the transport's defaults.
pub struct ArtifactFetcher {
    client: reqwest::Client,
}

impl Default for ArtifactFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactFetcher {
    /// Create a fetcher with a fresh HTTP client.
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }

    /// Download a small artifact fully into memory.
    ///
    /// Used for installer binaries and individual mod files. Returns
    /// [`LauncherError::FetchFailure`] on any non-success status.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, LauncherError> {
        debug!("Fetching {url}");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::FetchFailure {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Stream a large artifact to a temporary file.
    ///
    /// Used for game and mod-loader archive builds: the body is written
    /// incrementally so memory use stays bounded regardless of archive size.
    /// The returned handle keeps the file alive; it is deleted on drop.
    pub async fn fetch_to_temp(&self, url: &str) -> Result<NamedTempFile, LauncherError> {
        debug!("Streaming {url} to a temporary file");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::FetchFailure {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut temp = NamedTempFile::new()?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            temp.write_all(&chunk)?;
        }
        temp.flush()?;
        Ok(temp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn non_success_status_maps_to_fetch_failure() {
        use tokio::io::AsyncWriteExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                use tokio::io::AsyncReadExt;
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\n\r\n")
                    .await;
            }
        });

        let fetcher = ArtifactFetcher::new();
        let url = format!("http://{addr}/missing.dll");
        let err = fetcher.fetch_bytes(&url).await.unwrap_err();
        match err {
            LauncherError::FetchFailure { url: u, status } => {
                assert_eq!(status, 404);
                assert!(u.contains("missing.dll"));
            }
            other => panic!("expected FetchFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn successful_fetch_returns_body() {
        use tokio::io::AsyncWriteExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                use tokio::io::AsyncReadExt;
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 5\r\n\r\nhello")
                    .await;
            }
        });

        let fetcher = ArtifactFetcher::new();
        let body = fetcher.fetch_bytes(&format!("http://{addr}/mod.dll")).await.unwrap();
        assert_eq!(body, b"hello");
    }

    #[tokio::test]
    async fn streamed_fetch_lands_on_disk() {
        use tokio::io::AsyncWriteExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                use tokio::io::AsyncReadExt;
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 9\r\n\r\narchive!!")
                    .await;
            }
        });

        let fetcher = ArtifactFetcher::new();
        let temp = fetcher.fetch_to_temp(&format!("http://{addr}/game.zip")).await.unwrap();
        let contents = std::fs::read(temp.path()).unwrap();
        assert_eq!(contents, b"archive!!");
    }
}
