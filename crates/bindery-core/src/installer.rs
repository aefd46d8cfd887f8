use std::fmt;
use std::path::Path;

use log::{debug, info, warn};
use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

use bindery_backend::{
    AdminError, AdminProvisioner, AssetDownloader, CommandRunner, LifecycleError, Release,
    ReleaseSource,
};

use crate::catalog::ReleaseCatalog;
use crate::envfile::{DbBackend, EnvMode, EnvSettings};
use crate::{APP_KEY, APP_NAME, record, resolver};

/// Staging subdirectory created beneath the installation root during
/// download and unpack.
const STAGING_DIR: &str = "bindery-staging";

const ARCHIVE_NAME: &str = "bookstack.zip";
const UNPACK_DIR: &str = "unpacked";

/// The application's own version marker file.
const VERSION_FILE: &str = "version";

const COMPOSER_BIN: &str = "composer";
const PHP_BIN: &str = "php";

/// Framework housekeeping run after every update, in order, best effort.
const HOUSEKEEPING: &[&[&str]] = &[
    &["artisan", "migrate", "--force"],
    &["artisan", "cache:clear"],
    &["artisan", "vendor:publish"],
];

const GENERATED_PASSWORD_LEN: usize = 24;

/// Phase of an install/update operation, for logging and progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    Downloading,
    Unpacking,
    DependencyInstall,
    PostProcess,
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Downloading => write!(f, "downloading"),
            Self::Unpacking => write!(f, "unpacking"),
            Self::DependencyInstall => write!(f, "dependency install"),
            Self::PostProcess => write!(f, "post-process"),
        }
    }
}

/// Options for a first-time install.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub version: Option<String>,
    pub app_url: String,
    pub mode: EnvMode,
    pub debug: bool,
    pub db: DbBackend,
    pub admin_user: Option<String>,
    pub admin_email: String,
    pub admin_password: Option<String>,
}

/// Outcome of a completed install.
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub version: String,
    pub admin_user: String,
    /// Set when no password was supplied and one was generated.
    pub generated_password: Option<String>,
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error("Administrator provisioning failed: {0}")]
    Admin(#[from] AdminError),
}

/// Orchestrates install and update operations against an installation root.
///
/// All side effects go through the injected collaborators; the installer
/// itself holds no process-wide state. Callers are expected to serialize
/// operations per installation root.
pub struct Installer<S, D, R> {
    catalog: ReleaseCatalog<S>,
    downloader: D,
    runner: R,
}

impl<S, D, R> Installer<S, D, R>
where
    S: ReleaseSource,
    D: AssetDownloader,
    R: CommandRunner,
{
    pub fn new(catalog: ReleaseCatalog<S>, downloader: D, runner: R) -> Self {
        Self {
            catalog,
            downloader,
            runner,
        }
    }

    /// Version currently deployed in `target`, from the application's own
    /// version marker, falling back to the installation record.
    #[must_use]
    pub fn installed_version(&self, target: &Path) -> Option<String> {
        let marker = target.join(VERSION_FILE);
        if let Ok(contents) = std::fs::read_to_string(&marker) {
            let version = contents.trim().trim_start_matches('v').to_string();
            if !version.is_empty() {
                return Some(version);
            }
        }
        record::load(target).ok().and_then(|record| record.version)
    }

    /// Update an existing installation to `requested` (or the newest
    /// release).
    ///
    /// The installation record is marked failed before any file operation
    /// and committed only after dependency installation succeeds, so an
    /// interrupted update stays observably failed.
    ///
    /// # Errors
    /// `NoChange` when the requested version is already installed or the
    /// download produced no content; `Download`/`Unpack`/`Dependency` for
    /// the corresponding phase failures.
    pub async fn update(
        &self,
        target: &Path,
        requested: Option<&str>,
    ) -> Result<String, LifecycleError> {
        let current = self.installed_version(target);
        if let (Some(requested), Some(current)) = (requested, current.as_deref())
            && requested == current
        {
            return Err(LifecycleError::no_change(format!(
                "{APP_NAME} is already at version {current}"
            )));
        }

        let releases = self.catalog.fetch(APP_KEY).await?;
        let release = resolver::resolve(&releases, requested)?.clone();
        if requested.is_none()
            && let Some(current) = current.as_deref()
            && release.version == current
        {
            return Err(LifecycleError::no_change(format!(
                "{APP_NAME} is already at the newest version {current}"
            )));
        }

        let mut install_record = record::load(target)?;
        install_record.failed = true;
        install_record.last_attempt_version = Some(release.version.clone());
        record::save(target, &install_record)?;

        info!(
            "updating {APP_NAME} in {} from {} to {}",
            target.display(),
            current.as_deref().unwrap_or("unknown"),
            release.version
        );
        self.stage_release(target, &release).await?;
        self.dependency_install(target).await?;
        self.post_process(target).await;

        install_record.version = Some(release.version.clone());
        install_record.failed = false;
        record::save(target, &install_record)?;

        Ok(release.version)
    }

    /// First-time install into `target`, including the one-time bootstrap:
    /// environment descriptor, secret-key generation, and administrator
    /// provisioning.
    ///
    /// # Errors
    /// Lifecycle errors as for [`Installer::update`], plus admin validation
    /// or store errors from provisioning.
    pub async fn install(
        &self,
        target: &Path,
        options: &InstallOptions,
        provisioner: &dyn AdminProvisioner,
    ) -> Result<InstallReport, InstallError> {
        std::fs::create_dir_all(target).map_err(LifecycleError::from)?;

        let releases = self.catalog.fetch(APP_KEY).await?;
        let release = resolver::resolve(&releases, options.version.as_deref())?.clone();

        let mut install_record = record::load(target)?;
        install_record.failed = true;
        install_record.last_attempt_version = Some(release.version.clone());
        record::save(target, &install_record)?;

        info!(
            "installing {APP_NAME} {} into {}",
            release.version,
            target.display()
        );
        self.stage_release(target, &release).await?;

        EnvSettings {
            app_url: options.app_url.clone(),
            mode: options.mode,
            debug: options.debug,
            db: options.db.clone(),
        }
        .write(target)?;

        self.dependency_install(target).await?;
        self.generate_app_key(target).await?;
        self.post_process(target).await;

        let admin_user = options
            .admin_user
            .clone()
            .unwrap_or_else(|| "admin".to_string());
        info!("setting admin user to `{admin_user}'");
        let (password, generated_password) = match options.admin_password.clone() {
            Some(password) => (password, None),
            None => {
                let password = generate_password();
                info!("autogenerated admin password `{password}'");
                (password.clone(), Some(password))
            }
        };
        provisioner.provision(&admin_user, &options.admin_email, &password)?;

        install_record.version = Some(release.version.clone());
        install_record.failed = false;
        record::save(target, &install_record)?;

        Ok(InstallReport {
            version: release.version,
            admin_user,
            generated_password,
        })
    }

    /// Download and unpack a release over the target root. The staging
    /// directory is removed whether or not staging succeeds.
    async fn stage_release(&self, target: &Path, release: &Release) -> Result<(), LifecycleError> {
        let staging = target.join(STAGING_DIR);
        std::fs::create_dir_all(&staging)?;

        let result = self.stage_inner(target, &staging, release).await;

        if let Err(error) = std::fs::remove_dir_all(&staging) {
            warn!("failed to remove staging directory: {error}");
        }
        result
    }

    async fn stage_inner(
        &self,
        target: &Path,
        staging: &Path,
        release: &Release,
    ) -> Result<(), LifecycleError> {
        let plan = resolver::select_download(release);
        let archive = staging.join(ARCHIVE_NAME);

        debug!("phase: {}", InstallPhase::Downloading);
        let bytes = self
            .downloader
            .download(&plan.url, &archive, plan.sha256.as_deref())
            .await?;
        if bytes == 0 {
            return Err(LifecycleError::no_change(format!(
                "release {} download returned no content",
                release.version
            )));
        }

        debug!("phase: {}", InstallPhase::Unpacking);
        let unpacked = staging.join(UNPACK_DIR);
        std::fs::create_dir_all(&unpacked)?;
        extract_zip(&archive, &unpacked)?;

        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&unpacked)? {
            entries.push(entry?.path());
        }
        let [root] = entries.as_slice() else {
            return Err(LifecycleError::unpack(format!(
                "expected exactly one top-level entry in the unpacked archive, found {}",
                entries.len()
            )));
        };
        if !root.is_dir() {
            return Err(LifecycleError::unpack(
                "top-level archive entry is not a directory",
            ));
        }

        copy_dir_over(root, target)?;
        Ok(())
    }

    async fn dependency_install(&self, target: &Path) -> Result<(), LifecycleError> {
        debug!("phase: {}", InstallPhase::DependencyInstall);
        let output = self
            .runner
            .run(COMPOSER_BIN, &["install", "-o", "--no-dev"], target)
            .await?;
        if output.success() {
            Ok(())
        } else {
            Err(LifecycleError::Dependency {
                stderr: output.stderr,
            })
        }
    }

    async fn generate_app_key(&self, target: &Path) -> Result<(), LifecycleError> {
        let output = self
            .runner
            .run(PHP_BIN, &["artisan", "key:generate", "--force"], target)
            .await?;
        if output.success() {
            Ok(())
        } else {
            Err(LifecycleError::Dependency {
                stderr: if output.stderr.is_empty() {
                    output.stdout
                } else {
                    output.stderr
                },
            })
        }
    }

    /// Run framework housekeeping in a fixed order. Failures are logged and
    /// never abort the sequence.
    async fn post_process(&self, target: &Path) {
        debug!("phase: {}", InstallPhase::PostProcess);
        for args in HOUSEKEEPING {
            match self.runner.run(PHP_BIN, args, target).await {
                Ok(output) if output.success() => {}
                Ok(output) => warn!(
                    "housekeeping `{}' failed: {}",
                    args.join(" "),
                    output.stderr.trim()
                ),
                Err(error) => warn!("housekeeping `{}' failed: {error}", args.join(" ")),
            }
        }
    }
}

/// Extract a zip archive, skipping entries whose paths would escape the
/// destination.
fn extract_zip(archive_path: &Path, dest: &Path) -> Result<(), LifecycleError> {
    let file = std::fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|error| LifecycleError::unpack(format!("failed to read archive: {error}")))?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|error| LifecycleError::unpack(format!("failed to read entry: {error}")))?;
        let Some(name) = entry.enclosed_name() else {
            warn!("skipping archive entry with unsafe path");
            continue;
        };
        let out_path = dest.join(name);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
        } else {
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut out_file = std::fs::File::create(&out_path)?;
            std::io::copy(&mut entry, &mut out_file)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode()
                    && let Err(error) =
                        std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode))
                {
                    warn!(
                        "failed to restore permissions on {}: {error}",
                        out_path.display()
                    );
                }
            }
        }
    }

    Ok(())
}

/// Recursively copy `src` into `dest`, replacing files in place.
fn copy_dir_over(src: &Path, dest: &Path) -> Result<(), LifecycleError> {
    std::fs::create_dir_all(dest)?;

    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_over(&src_path, &dest_path)?;
        } else {
            std::fs::copy(&src_path, &dest_path).map_err(|error| LifecycleError::Io {
                kind: error.kind(),
                message: format!(
                    "{} -> {}: {error}",
                    src_path.display(),
                    dest_path.display()
                ),
            })?;
        }
    }
    Ok(())
}

/// Generate a password with at least one character from each class.
fn generate_password() -> String {
    const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
    const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    const DIGITS: &[u8] = b"0123456789";
    const SYMBOLS: &[u8] = b"!@#$%^&*()-_=+";
    const ALL: &[&[u8]] = &[LOWER, UPPER, DIGITS, SYMBOLS];

    let mut rng = rand::thread_rng();
    let mut chars: Vec<u8> = ALL
        .iter()
        .map(|class| class[rng.gen_range(0..class.len())])
        .collect();
    while chars.len() < GENERATED_PASSWORD_LEN {
        let class = ALL[rng.gen_range(0..ALL.len())];
        chars.push(class[rng.gen_range(0..class.len())]);
    }
    chars.shuffle(&mut rng);
    String::from_utf8(chars).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use bindery_backend::{
        AdminError, AdminProvisioner, AssetDownloader, CommandOutput, CommandRunner,
        DbCredentials, LifecycleError, ReleaseSource, TagEntry,
    };

    use crate::catalog::ReleaseCatalog;
    use crate::envfile::{DbBackend, EnvMode};
    use crate::record;

    use super::{
        InstallOptions, Installer, STAGING_DIR, copy_dir_over, extract_zip, generate_password,
    };

    struct StaticSource {
        tags: Vec<TagEntry>,
    }

    #[async_trait]
    impl ReleaseSource for StaticSource {
        async fn fetch(&self) -> Result<Vec<TagEntry>, LifecycleError> {
            Ok(self.tags.clone())
        }
    }

    /// Writes a fixed payload to the destination, ignoring the URL.
    struct PayloadDownloader {
        payload: Vec<u8>,
    }

    #[async_trait]
    impl AssetDownloader for PayloadDownloader {
        async fn download(
            &self,
            _url: &str,
            dest: &Path,
            _expected_sha256: Option<&str>,
        ) -> Result<u64, LifecycleError> {
            std::fs::write(dest, &self.payload)?;
            Ok(self.payload.len() as u64)
        }
    }

    #[derive(Clone, Default)]
    struct RecordingRunner {
        calls: Arc<Mutex<Vec<String>>>,
        fail_matching: Option<&'static str>,
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(
            &self,
            program: &str,
            args: &[&str],
            _cwd: &Path,
        ) -> Result<CommandOutput, LifecycleError> {
            let command = format!("{program} {}", args.join(" "));
            let failed = self
                .fail_matching
                .is_some_and(|needle| command.contains(needle));
            self.calls
                .lock()
                .expect("runner mutex")
                .push(command.clone());
            Ok(CommandOutput {
                code: Some(i32::from(failed)),
                stdout: String::new(),
                stderr: if failed {
                    format!("simulated failure: {command}")
                } else {
                    String::new()
                },
            })
        }
    }

    #[derive(Default)]
    struct RecordingProvisioner {
        provisioned: Mutex<Vec<(String, String, String)>>,
    }

    impl AdminProvisioner for RecordingProvisioner {
        fn provision(&self, user: &str, email: &str, password: &str) -> Result<(), AdminError> {
            self.provisioned.lock().expect("provisioner mutex").push((
                user.to_string(),
                email.to_string(),
                password.to_string(),
            ));
            Ok(())
        }
    }

    fn tag(name: &str) -> TagEntry {
        TagEntry {
            tag_name: name.to_string(),
            zipball_url: format!("https://example.invalid/zipball/{name}"),
            assets: Vec::new(),
            published_at: None,
        }
    }

    /// Build a zip whose top level holds the given directories, each with
    /// one marker file.
    fn release_zip(top_level_dirs: &[&str]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o644);
        for dir in top_level_dirs {
            writer
                .add_directory(format!("{dir}/"), options)
                .expect("zip directory entry");
            writer
                .start_file(format!("{dir}/composer.json"), options)
                .expect("zip file entry");
            writer.write_all(b"{}").expect("zip file body");
            writer
                .start_file(format!("{dir}/version"), options)
                .expect("zip version entry");
            writer.write_all(b"v24.05\n").expect("zip version body");
        }
        writer
            .finish()
            .expect("zip archive finalized")
            .into_inner()
    }

    fn installer(
        tags: Vec<TagEntry>,
        payload: Vec<u8>,
        runner: RecordingRunner,
    ) -> Installer<StaticSource, PayloadDownloader, RecordingRunner> {
        Installer::new(
            ReleaseCatalog::new(StaticSource { tags }),
            PayloadDownloader { payload },
            runner,
        )
    }

    fn install_options() -> InstallOptions {
        InstallOptions {
            version: None,
            app_url: "https://wiki.example.com/".to_string(),
            mode: EnvMode::Production,
            debug: false,
            db: DbBackend::Server(DbCredentials::default()),
            admin_user: Some("librarian".to_string()),
            admin_email: "librarian@example.com".to_string(),
            admin_password: Some("Sufficiently#Strong1".to_string()),
        }
    }

    #[tokio::test]
    async fn update_to_installed_version_is_a_no_change_and_mutates_nothing() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("version"), "v24.05\n").expect("version marker");
        record::save(
            temp.path(),
            &bindery_backend::InstallationRecord {
                version: Some("24.05".to_string()),
                failed: false,
                last_attempt_version: None,
            },
        )
        .expect("seed record");
        let record_before =
            std::fs::read(record::record_path(temp.path())).expect("record bytes before");

        let runner = RecordingRunner::default();
        let installer = installer(vec![tag("v24.05")], Vec::new(), runner.clone());

        let result = installer.update(temp.path(), Some("24.05")).await;

        assert!(matches!(result, Err(LifecycleError::NoChange { .. })));
        let record_after =
            std::fs::read(record::record_path(temp.path())).expect("record bytes after");
        assert_eq!(record_before, record_after);
        assert!(runner.calls.lock().expect("runner mutex").is_empty());
        assert!(!temp.path().join(STAGING_DIR).exists());
    }

    #[tokio::test]
    async fn empty_download_is_a_no_change() {
        let temp = tempfile::tempdir().expect("tempdir");
        let installer = installer(vec![tag("v24.05")], Vec::new(), RecordingRunner::default());

        let result = installer.update(temp.path(), Some("24.05")).await;

        assert!(
            matches!(result, Err(LifecycleError::NoChange { ref details }) if details.contains("no content"))
        );
        assert!(!temp.path().join(STAGING_DIR).exists());
    }

    #[tokio::test]
    async fn update_stages_runs_dependencies_and_commits() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("version"), "v23.12.2\n").expect("version marker");
        let runner = RecordingRunner::default();
        let installer = installer(
            vec![tag("v24.05"), tag("v23.12.2")],
            release_zip(&["BookStack-24.05"]),
            runner.clone(),
        );

        let version = installer
            .update(temp.path(), Some("24.05"))
            .await
            .expect("update succeeds");

        assert_eq!(version, "24.05");
        assert!(temp.path().join("composer.json").exists());
        assert!(!temp.path().join(STAGING_DIR).exists());

        let committed = record::load(temp.path()).expect("record");
        assert_eq!(committed.version.as_deref(), Some("24.05"));
        assert!(!committed.failed);
        assert_eq!(committed.last_attempt_version.as_deref(), Some("24.05"));

        let calls = runner.calls.lock().expect("runner mutex").clone();
        assert_eq!(calls[0], "composer install -o --no-dev");
        assert_eq!(calls[1], "php artisan migrate --force");
        assert_eq!(calls[2], "php artisan cache:clear");
        assert_eq!(calls[3], "php artisan vendor:publish");
    }

    #[tokio::test]
    async fn update_without_request_resolves_the_newest_release() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("version"), "v23.12.2\n").expect("version marker");
        let installer = installer(
            vec![tag("v24.05"), tag("v23.12.2")],
            release_zip(&["BookStack-24.05"]),
            RecordingRunner::default(),
        );

        let version = installer
            .update(temp.path(), None)
            .await
            .expect("update succeeds");

        assert_eq!(version, "24.05");
    }

    #[tokio::test]
    async fn already_newest_without_request_is_a_no_change() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("version"), "v24.05\n").expect("version marker");
        let installer = installer(
            vec![tag("v24.05")],
            release_zip(&["BookStack-24.05"]),
            RecordingRunner::default(),
        );

        let result = installer.update(temp.path(), None).await;

        assert!(matches!(result, Err(LifecycleError::NoChange { .. })));
    }

    #[tokio::test]
    async fn two_top_level_entries_fail_unpack_and_staging_is_removed() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("version"), "v23.12.2\n").expect("version marker");
        let installer = installer(
            vec![tag("v24.05")],
            release_zip(&["BookStack-24.05", "extras"]),
            RecordingRunner::default(),
        );

        let result = installer.update(temp.path(), Some("24.05")).await;

        assert!(
            matches!(result, Err(LifecycleError::Unpack { ref details }) if details.contains("found 2"))
        );
        assert!(!temp.path().join(STAGING_DIR).exists());

        let marked = record::load(temp.path()).expect("record");
        assert!(marked.failed);
    }

    #[tokio::test]
    async fn dependency_failure_surfaces_stderr_and_leaves_record_failed() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("version"), "v23.12.2\n").expect("version marker");
        let runner = RecordingRunner {
            fail_matching: Some("composer"),
            ..RecordingRunner::default()
        };
        let installer = installer(
            vec![tag("v24.05")],
            release_zip(&["BookStack-24.05"]),
            runner,
        );

        let result = installer.update(temp.path(), Some("24.05")).await;

        assert!(
            matches!(result, Err(LifecycleError::Dependency { ref stderr }) if stderr.contains("composer"))
        );
        let marked = record::load(temp.path()).expect("record");
        assert!(marked.failed);
        assert_eq!(marked.last_attempt_version.as_deref(), Some("24.05"));
    }

    #[tokio::test]
    async fn housekeeping_failures_do_not_abort_the_update() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("version"), "v23.12.2\n").expect("version marker");
        let runner = RecordingRunner {
            fail_matching: Some("artisan"),
            ..RecordingRunner::default()
        };
        let installer = installer(
            vec![tag("v24.05")],
            release_zip(&["BookStack-24.05"]),
            runner,
        );

        let version = installer
            .update(temp.path(), Some("24.05"))
            .await
            .expect("update succeeds despite housekeeping failures");

        assert_eq!(version, "24.05");
        let committed = record::load(temp.path()).expect("record");
        assert!(!committed.failed);
    }

    #[tokio::test]
    async fn install_bootstraps_env_key_and_admin() {
        let temp = tempfile::tempdir().expect("tempdir");
        let target = temp.path().join("wiki");
        let runner = RecordingRunner::default();
        let provisioner = RecordingProvisioner::default();
        let installer = installer(
            vec![tag("v24.05")],
            release_zip(&["BookStack-24.05"]),
            runner.clone(),
        );

        let report = installer
            .install(&target, &install_options(), &provisioner)
            .await
            .expect("install succeeds");

        assert_eq!(report.version, "24.05");
        assert_eq!(report.admin_user, "librarian");
        assert!(report.generated_password.is_none());

        assert!(target.join(".env").exists());
        assert!(target.join("composer.json").exists());

        let calls = runner.calls.lock().expect("runner mutex").clone();
        assert!(
            calls
                .iter()
                .any(|call| call == "php artisan key:generate --force")
        );

        let provisioned = provisioner.provisioned.lock().expect("provisioner mutex");
        assert_eq!(
            provisioned.as_slice(),
            &[(
                "librarian".to_string(),
                "librarian@example.com".to_string(),
                "Sufficiently#Strong1".to_string()
            )]
        );

        let committed = record::load(&target).expect("record");
        assert_eq!(committed.version.as_deref(), Some("24.05"));
        assert!(!committed.failed);
    }

    #[tokio::test]
    async fn install_generates_a_password_when_none_is_supplied() {
        let temp = tempfile::tempdir().expect("tempdir");
        let target = temp.path().join("wiki");
        let provisioner = RecordingProvisioner::default();
        let installer = installer(
            vec![tag("v24.05")],
            release_zip(&["BookStack-24.05"]),
            RecordingRunner::default(),
        );
        let mut options = install_options();
        options.admin_password = None;

        let report = installer
            .install(&target, &options, &provisioner)
            .await
            .expect("install succeeds");

        let generated = report.generated_password.expect("password was generated");
        let provisioned = provisioner.provisioned.lock().expect("provisioner mutex");
        assert_eq!(provisioned[0].2, generated);
    }

    #[test]
    fn extract_zip_skips_unsafe_paths() {
        let temp = tempfile::tempdir().expect("tempdir");
        let archive_path = temp.path().join("unsafe.zip");
        let dest = temp.path().join("out");

        let file = std::fs::File::create(&archive_path).expect("archive file");
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o644);
        writer
            .start_file("../escape.txt", options)
            .expect("unsafe entry");
        writer.write_all(b"nope").expect("unsafe body");
        writer.finish().expect("archive finalized");

        std::fs::create_dir_all(&dest).expect("dest dir");
        extract_zip(&archive_path, &dest).expect("extraction tolerates unsafe entries");

        assert!(!temp.path().join("escape.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn extract_zip_restores_unix_modes() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("tempdir");
        let archive_path = temp.path().join("modes.zip");
        let dest = temp.path().join("out");

        let file = std::fs::File::create(&archive_path).expect("archive file");
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
        writer
            .start_file("artisan", options)
            .expect("executable entry");
        writer.write_all(b"#!/usr/bin/env php\n").expect("entry body");
        writer.finish().expect("archive finalized");

        std::fs::create_dir_all(&dest).expect("dest dir");
        extract_zip(&archive_path, &dest).expect("extraction");

        let mode = std::fs::metadata(dest.join("artisan"))
            .expect("extracted file")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn copy_dir_over_replaces_existing_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let src = temp.path().join("src");
        let dest = temp.path().join("dest");
        std::fs::create_dir_all(src.join("public")).expect("src tree");
        std::fs::create_dir_all(&dest).expect("dest dir");
        std::fs::write(src.join("public/index.php"), "new").expect("src file");
        std::fs::write(dest.join("stale.txt"), "keep").expect("pre-existing file");

        copy_dir_over(&src, &dest).expect("copy");

        assert_eq!(
            std::fs::read_to_string(dest.join("public/index.php")).expect("copied file"),
            "new"
        );
        assert!(dest.join("stale.txt").exists());
    }

    #[test]
    fn generated_passwords_cover_all_character_classes() {
        let password = generate_password();

        assert_eq!(password.len(), super::GENERATED_PASSWORD_LEN);
        assert!(password.chars().any(|ch| ch.is_ascii_lowercase()));
        assert!(password.chars().any(|ch| ch.is_ascii_uppercase()));
        assert!(password.chars().any(|ch| ch.is_ascii_digit()));
        assert!(password.chars().any(|ch| !ch.is_ascii_alphanumeric()));
    }

    #[test]
    fn installed_version_strips_the_tag_prefix() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("version"), "v23.12.2\n").expect("version marker");
        let installer = installer(Vec::new(), Vec::new(), RecordingRunner::default());

        assert_eq!(
            installer.installed_version(temp.path()).as_deref(),
            Some("23.12.2")
        );
    }

    #[test]
    fn installed_version_falls_back_to_the_record() {
        let temp = tempfile::tempdir().expect("tempdir");
        record::save(
            temp.path(),
            &bindery_backend::InstallationRecord {
                version: Some("24.02".to_string()),
                failed: false,
                last_attempt_version: None,
            },
        )
        .expect("seed record");
        let installer = installer(Vec::new(), Vec::new(), RecordingRunner::default());

        assert_eq!(
            installer.installed_version(temp.path()).as_deref(),
            Some("24.02")
        );
    }
}
