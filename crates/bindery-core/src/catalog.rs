use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::{debug, info};

use bindery_backend::{AppVersion, LifecycleError, Release, ReleaseSource, TagEntry};

/// How long a fetched catalog stays valid before a refetch is required.
pub const CATALOG_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Tags without this prefix are not versioned releases.
const VERSION_PREFIX: char = 'v';

/// Known-broken releases that must never be offered.
const BLACKLISTED_VERSIONS: &[&str] = &["24.02.1"];

struct CachedCatalog {
    releases: Vec<Release>,
    fetched_at: Instant,
}

/// Fetches and caches the list of available releases.
///
/// The cache is scoped to this instance and keyed by application name;
/// entries within the TTL window are returned without a network call.
pub struct ReleaseCatalog<S> {
    source: S,
    ttl: Duration,
    cache: Mutex<HashMap<String, CachedCatalog>>,
}

impl<S: ReleaseSource> ReleaseCatalog<S> {
    pub fn new(source: S) -> Self {
        Self::with_ttl(source, CATALOG_TTL)
    }

    pub fn with_ttl(source: S, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the catalog for `app_key`, newest release first.
    ///
    /// # Errors
    /// Returns [`LifecycleError::Upstream`] when the remote index is
    /// unreachable or returns malformed data.
    pub async fn fetch(&self, app_key: &str) -> Result<Vec<Release>, LifecycleError> {
        {
            let cache = self
                .cache
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(cached) = cache.get(app_key)
                && cached.fetched_at.elapsed() < self.ttl
            {
                debug!("catalog cache hit for `{app_key}'");
                return Ok(cached.releases.clone());
            }
        }

        let tags = self.source.fetch().await?;
        let releases = normalize(tags);
        info!(
            "fetched {} releases for `{app_key}' from release index",
            releases.len()
        );

        let mut cache = self
            .cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        cache.insert(
            app_key.to_string(),
            CachedCatalog {
                releases: releases.clone(),
                fetched_at: Instant::now(),
            },
        );

        Ok(releases)
    }
}

/// Filter raw tag entries down to offerable releases: the one-character
/// version prefix is required and stripped, blacklisted and duplicate
/// versions are dropped, and the result is ordered newest first.
fn normalize(tags: Vec<TagEntry>) -> Vec<Release> {
    let mut seen = HashSet::new();
    let mut releases: Vec<Release> = tags
        .into_iter()
        .filter_map(|tag| {
            let version = tag.tag_name.strip_prefix(VERSION_PREFIX)?;
            if BLACKLISTED_VERSIONS.contains(&version) {
                debug!("excluding blacklisted release {version}");
                return None;
            }
            if !seen.insert(version.to_string()) {
                return None;
            }
            Some(Release {
                version: version.to_string(),
                zipball_url: tag.zipball_url,
                assets: tag.assets,
                published_at: tag.published_at,
            })
        })
        .collect();

    // Unparsable versions sort last rather than being dropped.
    releases.sort_by_cached_key(|release| Reverse(release.version.parse::<AppVersion>().ok()));
    releases
}
