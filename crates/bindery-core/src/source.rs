use std::io::Read as _;
use std::path::Path;

use async_trait::async_trait;
use log::{debug, info};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use bindery_backend::{AssetDownloader, LifecycleError, ReleaseSource, TagEntry};

/// Upstream repository holding the managed application's releases.
pub const BOOKSTACK_REPO: &str = "BookStackApp/BookStack";

const USER_AGENT: &str = "bindery";
const PER_PAGE: u8 = 100;

/// Release index backed by the GitHub releases endpoint.
pub struct GithubReleaseSource {
    client: reqwest::Client,
    repo: String,
}

impl GithubReleaseSource {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self::for_repo(client, BOOKSTACK_REPO)
    }

    #[must_use]
    pub fn for_repo(client: reqwest::Client, repo: &str) -> Self {
        Self {
            client,
            repo: repo.to_string(),
        }
    }
}

#[async_trait]
impl ReleaseSource for GithubReleaseSource {
    async fn fetch(&self) -> Result<Vec<TagEntry>, LifecycleError> {
        let url = format!(
            "https://api.github.com/repos/{}/releases?per_page={PER_PAGE}",
            self.repo
        );
        debug!("querying release index at {url}");

        let response = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|error| LifecycleError::upstream(error.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_snippet = response
                .text()
                .await
                .ok()
                .map(|body| response_snippet(&body, 160))
                .unwrap_or_default();
            return Err(LifecycleError::upstream(format!(
                "release index returned HTTP {status}{body_snippet}"
            )));
        }

        response
            .json()
            .await
            .map_err(|error| LifecycleError::upstream(format!("malformed release index: {error}")))
    }
}

fn response_snippet(body: &str, max_chars: usize) -> String {
    let snippet: String = body.chars().take(max_chars).collect();
    if snippet.is_empty() {
        String::new()
    } else {
        format!(": {snippet}")
    }
}

/// Streams release assets to disk, verifying the digest when one is known.
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssetDownloader for HttpDownloader {
    async fn download(
        &self,
        url: &str,
        dest: &Path,
        expected_sha256: Option<&str>,
    ) -> Result<u64, LifecycleError> {
        use futures_util::StreamExt;

        let response = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|error| LifecycleError::download(error.to_string()))?;

        if !response.status().is_success() {
            return Err(LifecycleError::download(format!(
                "download failed with HTTP {}",
                response.status()
            )));
        }

        let mut file = tokio::fs::File::create(dest).await.map_err(|error| {
            LifecycleError::download(format!("{}: {error}", dest.display()))
        })?;

        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|error| LifecycleError::download(error.to_string()))?;
            file.write_all(&chunk).await.map_err(|error| {
                LifecycleError::download(format!("{}: {error}", dest.display()))
            })?;
            downloaded += chunk.len() as u64;
        }
        file.flush().await.map_err(|error| {
            LifecycleError::download(format!("{}: {error}", dest.display()))
        })?;
        info!("downloaded {downloaded} bytes from {url}");

        if let Some(expected) = expected_sha256 {
            let actual = sha256_file(dest)?;
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(LifecycleError::download(format!(
                    "checksum mismatch for {}: expected {expected}, got {actual}",
                    dest.display()
                )));
            }
            debug!("checksum verified for {}", dest.display());
        }

        Ok(downloaded)
    }
}

fn sha256_file(path: &Path) -> Result<String, LifecycleError> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 8192];

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::{response_snippet, sha256_file};

    #[test]
    fn response_snippet_truncates_long_bodies() {
        let snippet = response_snippet(&"x".repeat(500), 160);
        assert_eq!(snippet.len(), 162);
        assert!(snippet.starts_with(": "));
    }

    #[test]
    fn response_snippet_is_empty_for_empty_bodies() {
        assert_eq!(response_snippet("", 160), "");
    }

    #[test]
    fn sha256_file_returns_known_digest() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("payload.bin");
        std::fs::write(&path, b"bindery").expect("payload written");

        let digest = sha256_file(&path).expect("digest computed");
        assert_eq!(
            digest,
            "5233a03ffe82658c92cdccb4721c5a0e129a49e09b6d7ed8d265d6673a723fbd"
        );
    }
}
