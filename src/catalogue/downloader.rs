//! Streams remote files into fresh temporary files.

use crate::catalogue::error::CatalogueError;
use crate::catalogue::page::send_checked;
use futures_util::TryStreamExt;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;

/// A completely written download. The file is deleted when this is dropped.
#[derive(Debug)]
pub struct DownloadedFile {
    path: TempPath,
    content_type: Option<String>,
}

impl DownloadedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The `Content-Type` the server announced, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    download_dir: PathBuf,
}

impl Downloader {
    pub fn new(client: Client, download_dir: PathBuf) -> Self {
        Self {
            client,
            download_dir,
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Downloads `url` into a new temporary file and syncs it to disk.
    ///
    /// On any error the temporary file is removed before returning.
    pub async fn download(&self, url: &str) -> Result<DownloadedFile, CatalogueError> {
        let response = send_checked(&self.client, url).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let dir = self.download_dir.clone();
        let temp = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix("dwd-")
                .tempfile_in(&dir)
                .map_err(|e| CatalogueError::TempFile(dir, e))
        })
        .await??;
        // Owning the TempPath means an early return below deletes the file.
        let (std_file, path) = temp.into_parts();
        let mut file = tokio::fs::File::from_std(std_file);

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let mut reader = StreamReader::new(stream);
        let written = tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(|e| CatalogueError::DownloadIo(url.to_string(), e))?;
        file.flush()
            .await
            .map_err(|e| CatalogueError::DownloadIo(url.to_string(), e))?;
        file.sync_all()
            .await
            .map_err(|e| CatalogueError::DownloadIo(url.to_string(), e))?;

        debug!("Downloaded {} bytes from {} to {}", written, url, path.display());
        Ok(DownloadedFile { path, content_type })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Answers a single request with `response` verbatim and closes the connection.
    async fn serve_once(response: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buffer = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let read = socket.read(&mut buffer).await.unwrap();
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buffer[..read]);
            }
            socket.write_all(response).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{address}/file.zip")
    }

    fn downloader(dir: &Path) -> Downloader {
        Downloader::new(Client::new(), dir.to_path_buf())
    }

    fn files_in(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn completed_download_lives_until_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/zip\r\nContent-Length: 7\r\nConnection: close\r\n\r\ncontent",
        )
        .await;

        let file = downloader(dir.path()).download(&url).await.unwrap();
        assert_eq!(std::fs::read(file.path()).unwrap(), b"content");
        assert_eq!(file.content_type(), Some("application/zip"));
        assert_eq!(files_in(dir.path()), 1);

        drop(file);
        assert_eq!(files_in(dir.path()), 0);
    }

    #[tokio::test]
    async fn missing_file_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve_once(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;

        let result = downloader(dir.path()).download(&url).await;
        assert!(matches!(result, Err(CatalogueError::NotFound { .. })));
        assert_eq!(files_in(dir.path()), 0);
    }

    #[tokio::test]
    async fn truncated_body_removes_the_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Length: 4096\r\nConnection: close\r\n\r\nonly the first bytes",
        )
        .await;

        let result = downloader(dir.path()).download(&url).await;
        assert!(matches!(result, Err(CatalogueError::DownloadIo(..))));
        assert_eq!(files_in(dir.path()), 0);
    }
}
