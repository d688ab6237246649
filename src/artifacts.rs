//! Concurrent download and persistence of segmentation artifacts.

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use tracing::debug;

use crate::error::{Error, Result};

/// Downloads pre-signed artifact URLs into a destination directory.
///
/// URLs are self-authenticating, so no `Authorization` header is sent.
/// Downloads within one batch run concurrently with a bounded fan-out.
pub(crate) struct ArtifactFetcher {
    http: reqwest::Client,
    max_concurrent: usize,
}

impl ArtifactFetcher {
    pub(crate) fn new(http: reqwest::Client, max_concurrent: usize) -> Self {
        Self { http, max_concurrent: max_concurrent.max(1) }
    }

    /// Fetches every URL into `dest_dir` and returns the written paths, in
    /// completion order.
    ///
    /// The first artifact to fail aborts the batch with that artifact's
    /// error. Files written before the failure was observed stay on disk;
    /// callers must treat a failed batch as "destination directory may be
    /// partially populated".
    pub(crate) async fn fetch_all(
        &self,
        presigned_urls: &[String],
        dest_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        let mut downloads = stream::iter(presigned_urls)
            .map(|url| self.fetch_one(url, dest_dir))
            .buffer_unordered(self.max_concurrent);

        let mut written = Vec::with_capacity(presigned_urls.len());
        while let Some(result) = downloads.next().await {
            written.push(result?);
        }
        Ok(written)
    }

    /// Downloads one artifact and writes it to its derived local path.
    async fn fetch_one(&self, presigned_url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let destination = dest_dir.join(destination_basename(presigned_url));

        let response = self.http.get(presigned_url).send().await.map_err(|_| {
            Error::ArtifactDownloadFailed { url: presigned_url.to_string() }
        })?;
        if response.status().as_u16() >= 400 {
            return Err(Error::ArtifactDownloadFailed { url: presigned_url.to_string() });
        }
        let content = response.bytes().await.map_err(|_| Error::ArtifactDownloadFailed {
            url: presigned_url.to_string(),
        })?;

        tokio::fs::write(&destination, &content)
            .await
            .map_err(|_| Error::ArtifactWriteFailed { path: destination.clone() })?;

        debug!(url = presigned_url, path = %destination.display(), bytes = content.len(),
            "segmentation artifact written");
        Ok(destination)
    }
}

/// Derives the local filename for a pre-signed URL: the final path segment
/// with the query string stripped.
pub(crate) fn destination_basename(presigned_url: &str) -> &str {
    let without_query = presigned_url.split('?').next().unwrap_or(presigned_url);
    without_query.rsplit('/').next().unwrap_or(without_query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_destination_basename_strips_query_string() {
        assert_eq!(
            destination_basename("https://host/path/seg-001.nii.gz?sig=abc&exp=123"),
            "seg-001.nii.gz"
        );
    }

    #[test]
    fn test_destination_basename_without_query() {
        assert_eq!(destination_basename("https://host/a/b/mask.nii.gz"), "mask.nii.gz");
    }

    #[tokio::test]
    async fn test_fetch_all_writes_every_artifact() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/seg-001.nii.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"first".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/seg-002.nii.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"second".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = ArtifactFetcher::new(reqwest::Client::new(), 4);
        let urls = vec![
            format!("{}/seg-001.nii.gz?sig=a", server.uri()),
            format!("{}/seg-002.nii.gz?sig=b", server.uri()),
        ];
        let written = fetcher.fetch_all(&urls, dir.path()).await.unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(std::fs::read(dir.path().join("seg-001.nii.gz")).unwrap(), b"first");
        assert_eq!(std::fs::read(dir.path().join("seg-002.nii.gz")).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_partial_batch_failure_keeps_earlier_files() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/seg-001.nii.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"first".to_vec()))
            .mount(&server)
            .await;
        // Delayed so the first artifact is on disk before this one fails.
        Mock::given(method("GET"))
            .and(path("/seg-002.nii.gz"))
            .respond_with(
                ResponseTemplate::new(403).set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/seg-003.nii.gz"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"third".to_vec())
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = ArtifactFetcher::new(reqwest::Client::new(), 4);
        let failing_url = format!("{}/seg-002.nii.gz?sig=b", server.uri());
        let urls = vec![
            format!("{}/seg-001.nii.gz?sig=a", server.uri()),
            failing_url.clone(),
            format!("{}/seg-003.nii.gz?sig=c", server.uri()),
        ];

        let result = fetcher.fetch_all(&urls, dir.path()).await;
        assert!(matches!(
            result,
            Err(Error::ArtifactDownloadFailed { ref url }) if *url == failing_url
        ));
        // No rollback: the already-written artifact stays.
        assert!(dir.path().join("seg-001.nii.gz").exists());
    }

    #[tokio::test]
    async fn test_write_failure_is_distinct_from_download_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/seg-001.nii.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"data".to_vec()))
            .mount(&server)
            .await;

        let fetcher = ArtifactFetcher::new(reqwest::Client::new(), 4);
        let urls = vec![format!("{}/seg-001.nii.gz", server.uri())];
        let missing_dir = Path::new("/nonexistent-destination-dir");

        let result = fetcher.fetch_all(&urls, missing_dir).await;
        assert!(matches!(
            result,
            Err(Error::ArtifactWriteFailed { ref path })
                if path == &missing_dir.join("seg-001.nii.gz")
        ));
    }

    #[tokio::test]
    async fn test_empty_batch_is_ok() {
        let fetcher = ArtifactFetcher::new(reqwest::Client::new(), 4);
        let dir = tempfile::tempdir().unwrap();
        let written = fetcher.fetch_all(&[], dir.path()).await.unwrap();
        assert!(written.is_empty());
    }
}
