use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A BookStack release version.
///
/// BookStack tags calendar versions with either two or three numeric
/// components ("24.05", "23.12.2"). The component count is preserved for
/// display; a missing patch compares as zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: Option<u32>,
}

impl AppVersion {
    #[must_use]
    pub fn new(major: u32, minor: u32, patch: Option<u32>) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Ord for AppVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.unwrap_or(0).cmp(&other.patch.unwrap_or(0)))
    }
}

impl PartialOrd for AppVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for AppVersion {
    // Minor is the calendar month and is zero-padded the way upstream tags it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.patch {
            Some(patch) => write!(f, "{}.{:02}.{}", self.major, self.minor, patch),
            None => write!(f, "{}.{:02}", self.major, self.minor),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum VersionParseError {
    #[error("Expected X.Y or X.Y.Z format, got: {input}")]
    InvalidFormat { input: String },
    #[error("Invalid numeric component in version: {value}")]
    InvalidComponent { value: String },
}

impl FromStr for AppVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix('v').unwrap_or(s);

        let mut parts = s.split('.');
        let major_str = parts
            .next()
            .filter(|part| !part.is_empty())
            .ok_or_else(|| VersionParseError::InvalidFormat {
                input: s.to_string(),
            })?;
        let minor_str = parts
            .next()
            .ok_or_else(|| VersionParseError::InvalidFormat {
                input: s.to_string(),
            })?;
        let patch_str = parts.next();
        if parts.next().is_some() {
            return Err(VersionParseError::InvalidFormat {
                input: s.to_string(),
            });
        }

        let parse =
            |value: &str| {
                value
                    .parse()
                    .map_err(|_| VersionParseError::InvalidComponent {
                        value: value.to_string(),
                    })
            };

        Ok(AppVersion {
            major: parse(major_str)?,
            minor: parse(minor_str)?,
            patch: patch_str.map(parse).transpose()?,
        })
    }
}

/// A downloadable file attached to a release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub digest: Option<String>,
}

/// A versioned, downloadable distribution of the managed application.
///
/// Immutable once fetched; identity is the normalized (prefix-stripped)
/// version string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub version: String,
    pub zipball_url: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
    #[serde(default)]
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Metadata persisted alongside the installed application.
///
/// `failed` is set optimistically at the start of an update and cleared on
/// commit, so an interrupted update is observably failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationRecord {
    pub version: Option<String>,
    pub failed: bool,
    #[serde(default)]
    pub last_attempt_version: Option<String>,
}

/// The single account holding the application's admin role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    pub id: i64,
    pub user: String,
    pub email: String,
}

/// Connection parameters for the application's data store, also rendered
/// into the environment descriptor at install time.
#[derive(Debug, Clone)]
pub struct DbCredentials {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub table_prefix: String,
}

impl Default for DbCredentials {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            database: String::new(),
            username: String::new(),
            password: String::new(),
            table_prefix: String::new(),
        }
    }
}
