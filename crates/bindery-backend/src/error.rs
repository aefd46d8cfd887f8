use thiserror::Error;

/// Failures raised by release discovery, resolution, and install/update
/// orchestration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Release index unavailable: {details}")]
    Upstream { details: String },

    #[error("Version not found: {version}")]
    VersionNotFound { version: String },

    #[error("Download failed: {details}")]
    Download { details: String },

    #[error("Unpack failed: {details}")]
    Unpack { details: String },

    #[error("Dependency installation failed: {stderr}")]
    Dependency { stderr: String },

    #[error("Nothing to do: {details}")]
    NoChange { details: String },

    #[error("IO error ({kind}): {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
    },
}

impl LifecycleError {
    pub fn upstream(details: impl Into<String>) -> Self {
        Self::Upstream {
            details: details.into(),
        }
    }

    pub fn download(details: impl Into<String>) -> Self {
        Self::Download {
            details: details.into(),
        }
    }

    pub fn unpack(details: impl Into<String>) -> Self {
        Self::Unpack {
            details: details.into(),
        }
    }

    pub fn no_change(details: impl Into<String>) -> Self {
        Self::NoChange {
            details: details.into(),
        }
    }
}

impl From<std::io::Error> for LifecycleError {
    fn from(err: std::io::Error) -> Self {
        LifecycleError::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Failures raised by administrator credential lookups and changes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdminError {
    #[error("Password is of insufficient strength")]
    PasswordTooWeak,

    #[error("Pre-hashed password is not a valid bcrypt string")]
    InvalidHashFormat,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Invalid user name")]
    InvalidUsername,

    #[error("Unrecognized field: {field}")]
    UnknownField { field: String },

    #[error("Failed to update admin account: {details}")]
    UpdateFailed { details: String },

    #[error("More than one account holds the admin role")]
    AmbiguousAdmin,

    #[error("Database error: {message}")]
    Database { message: String },
}

impl AdminError {
    pub fn update_failed(details: impl Into<String>) -> Self {
        Self::UpdateFailed {
            details: details.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }
}
