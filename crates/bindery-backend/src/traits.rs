use async_trait::async_trait;
use std::path::Path;

use crate::error::{AdminError, LifecycleError};
use crate::types::ReleaseAsset;

/// One entry of the remote release index, as served by the tag listing
/// endpoint.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct TagEntry {
    pub tag_name: String,
    pub zipball_url: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
    #[serde(default)]
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Read-only access to the remote release index.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<TagEntry>, LifecycleError>;
}

/// Fetches a release asset into a local file, verifying the sha256 digest
/// when one is known. Returns the number of bytes written.
#[async_trait]
pub trait AssetDownloader: Send + Sync {
    async fn download(
        &self,
        url: &str,
        dest: &Path,
        expected_sha256: Option<&str>,
    ) -> Result<u64, LifecycleError>;
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs an external command against a working directory, capturing output
/// and exit status.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        cwd: &Path,
    ) -> Result<CommandOutput, LifecycleError>;
}

/// Sets the administrator identity once, during initial provisioning.
pub trait AdminProvisioner: Send + Sync {
    /// # Errors
    /// Returns an error when validation or the underlying store update fails.
    fn provision(&self, user: &str, email: &str, password: &str) -> Result<(), AdminError>;
}
