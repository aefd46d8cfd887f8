//! Core lifecycle logic for the managed BookStack deployment.
//!
//! This crate is independent of any particular frontend:
//! - Release catalog fetching and caching.
//! - Version resolution and download-asset selection.
//! - Install/update orchestration against an installation root.
//! - Installation record and environment descriptor persistence.
//! - Production collaborator implementations (GitHub release index,
//!   streaming downloader, tokio command runner).

pub mod catalog;
pub mod envfile;
pub mod exec;
pub mod installer;
pub mod record;
pub mod resolver;
pub mod source;

pub use catalog::{CATALOG_TTL, ReleaseCatalog};
pub use envfile::{DbBackend, EnvMode, EnvSettings};
pub use exec::TokioCommandRunner;
pub use installer::{InstallError, InstallOptions, InstallPhase, InstallReport, Installer};
pub use resolver::{DownloadPlan, resolve, select_download};
pub use source::{GithubReleaseSource, HttpDownloader};

/// Display name of the managed application.
pub const APP_NAME: &str = "BookStack";

/// Cache key under which the application's releases are stored.
pub const APP_KEY: &str = "bookstack";
