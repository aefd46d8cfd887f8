use bindery_backend::{LifecycleError, Release};

/// Archive extension the packaged release assets carry.
const PACKAGED_ARCHIVE_EXT: &str = ".zip";

/// Resolve a requested version against the catalog.
///
/// A requested version must match a catalog entry's version string exactly;
/// with no request the newest entry wins (the catalog is ordered newest
/// first).
///
/// # Errors
/// Returns [`LifecycleError::VersionNotFound`] when no entry matches.
pub fn resolve<'a>(
    releases: &'a [Release],
    requested: Option<&str>,
) -> Result<&'a Release, LifecycleError> {
    match requested {
        Some(version) => releases
            .iter()
            .find(|release| release.version == version)
            .ok_or_else(|| LifecycleError::VersionNotFound {
                version: version.to_string(),
            }),
        None => releases
            .first()
            .ok_or_else(|| LifecycleError::VersionNotFound {
                version: "latest".to_string(),
            }),
    }
}

/// The concrete download chosen for a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    pub url: String,
    pub sha256: Option<String>,
}

/// Select the downloadable for a release: the first asset named like a
/// packaged archive, falling back to the generic source zipball.
#[must_use]
pub fn select_download(release: &Release) -> DownloadPlan {
    release
        .assets
        .iter()
        .find(|asset| asset.name.ends_with(PACKAGED_ARCHIVE_EXT))
        .map_or_else(
            || DownloadPlan {
                url: release.zipball_url.clone(),
                sha256: None,
            },
            |asset| DownloadPlan {
                url: asset.browser_download_url.clone(),
                sha256: asset.digest.as_deref().and_then(parse_sha256_digest),
            },
        )
}

fn parse_sha256_digest(digest: &str) -> Option<String> {
    let (algorithm, hash) = digest.split_once(':')?;
    if !algorithm.eq_ignore_ascii_case("sha256") {
        return None;
    }
    if hash.len() != 64 || !hash.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    Some(hash.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use bindery_backend::{Release, ReleaseAsset};

    use super::*;

    fn release(version: &str, assets: Vec<ReleaseAsset>) -> Release {
        Release {
            version: version.to_string(),
            zipball_url: format!("https://example.invalid/zipball/v{version}"),
            assets,
            published_at: None,
        }
    }

    fn asset(name: &str, url: &str) -> ReleaseAsset {
        ReleaseAsset {
            name: name.to_string(),
            browser_download_url: url.to_string(),
            size: None,
            digest: None,
        }
    }

    fn catalog() -> Vec<Release> {
        vec![
            release(
                "24.05",
                vec![asset("bookstack-24.05.zip", "https://example.invalid/a")],
            ),
            release("23.12", vec![]),
        ]
    }

    #[test]
    fn resolve_without_request_picks_the_newest() {
        let releases = catalog();
        let resolved = resolve(&releases, None).expect("latest resolves");
        assert_eq!(resolved.version, "24.05");
    }

    #[test]
    fn resolve_matches_exact_version_string() {
        let releases = catalog();
        let resolved = resolve(&releases, Some("23.12")).expect("exact match resolves");
        assert_eq!(resolved.version, "23.12");
    }

    #[test]
    fn resolve_fails_for_unknown_version() {
        let releases = catalog();
        let result = resolve(&releases, Some("19.03"));
        assert!(matches!(
            result,
            Err(LifecycleError::VersionNotFound { ref version }) if version == "19.03"
        ));
    }

    #[test]
    fn resolve_fails_on_empty_catalog() {
        let result = resolve(&[], None);
        assert!(matches!(result, Err(LifecycleError::VersionNotFound { .. })));
    }

    #[test]
    fn select_download_prefers_packaged_archive_asset() {
        let releases = catalog();
        let plan = select_download(&releases[0]);
        assert_eq!(plan.url, "https://example.invalid/a");
    }

    #[test]
    fn select_download_falls_back_to_zipball() {
        let releases = catalog();
        let resolved = resolve(&releases, Some("23.12")).expect("resolves");
        let plan = select_download(resolved);
        assert_eq!(plan.url, "https://example.invalid/zipball/v23.12");
        assert!(plan.sha256.is_none());
    }

    #[test]
    fn select_download_ignores_non_archive_assets() {
        let rel = release(
            "24.05",
            vec![
                asset("SHA256SUMS", "https://example.invalid/sums"),
                asset("bookstack-24.05.zip", "https://example.invalid/pkg"),
            ],
        );
        let plan = select_download(&rel);
        assert_eq!(plan.url, "https://example.invalid/pkg");
    }

    #[test]
    fn digest_is_carried_only_when_well_formed() {
        let mut good = asset("bookstack.zip", "https://example.invalid/pkg");
        good.digest = Some(format!("sha256:{}", "ab".repeat(32)));
        let plan = select_download(&release("24.05", vec![good]));
        assert_eq!(plan.sha256.as_deref(), Some("ab".repeat(32).as_str()));

        let mut bad = asset("bookstack.zip", "https://example.invalid/pkg");
        bad.digest = Some("sha1:abcd".to_string());
        let plan = select_download(&release("24.05", vec![bad]));
        assert!(plan.sha256.is_none());
    }
}
