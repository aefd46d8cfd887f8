mod error;
mod traits;
mod types;

pub use error::{AdminError, LifecycleError};
pub use traits::{
    AdminProvisioner, AssetDownloader, CommandOutput, CommandRunner, ReleaseSource, TagEntry,
};
pub use types::{
    AdminIdentity, AppVersion, DbCredentials, InstallationRecord, Release, ReleaseAsset,
    VersionParseError,
};
