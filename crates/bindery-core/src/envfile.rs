use std::fmt;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use bindery_backend::{DbCredentials, LifecycleError};

use crate::APP_NAME;

/// Name of the environment descriptor inside the installation root.
pub const ENV_FILE: &str = ".env";

/// Database the deployment reads and writes. The install path provisions
/// the administrator against the same database this descriptor declares.
#[derive(Debug, Clone)]
pub enum DbBackend {
    /// File-backed database, typically inside the installation root.
    Embedded { database: PathBuf },
    /// External database server.
    Server(DbCredentials),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvMode {
    #[default]
    Production,
    Development,
}

impl fmt::Display for EnvMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Development => write!(f, "development"),
        }
    }
}

/// Install-time settings rendered once into the application's `.env`.
///
/// The application key is left blank; the install bootstrap fills it in.
#[derive(Debug, Clone)]
pub struct EnvSettings {
    pub app_url: String,
    pub mode: EnvMode,
    pub debug: bool,
    pub db: DbBackend,
}

impl EnvSettings {
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(768);
        let _ = writeln!(out, "APP_NAME={APP_NAME}");
        let _ = writeln!(out, "APP_ENV={}", self.mode);
        let _ = writeln!(out, "APP_KEY=");
        let _ = writeln!(out, "APP_DEBUG={}", self.debug);
        let _ = writeln!(out, "APP_URL=\"{}\"", self.app_url);
        out.push('\n');
        let _ = writeln!(out, "LOG_CHANNEL=stack");
        out.push('\n');
        match &self.db {
            DbBackend::Embedded { database } => {
                let _ = writeln!(out, "DB_CONNECTION=sqlite");
                let _ = writeln!(out, "DB_DATABASE=\"{}\"", database.display());
            }
            DbBackend::Server(db) => {
                let _ = writeln!(out, "DB_CONNECTION=mysql");
                let _ = writeln!(out, "DB_HOST=\"{}\"", db.host);
                let _ = writeln!(out, "DB_PORT={}", db.port);
                let _ = writeln!(out, "DB_DATABASE=\"{}\"", db.database);
                let _ = writeln!(out, "DB_USERNAME=\"{}\"", db.username);
                let _ = writeln!(out, "DB_PASSWORD=\"{}\"", db.password);
            }
        }
        out.push('\n');
        let _ = writeln!(out, "BROADCAST_DRIVER=log");
        let _ = writeln!(out, "CACHE_DRIVER=file");
        let _ = writeln!(out, "SESSION_DRIVER=file");
        let _ = writeln!(out, "SESSION_LIFETIME=120");
        let _ = writeln!(out, "QUEUE_DRIVER=sync");
        out.push('\n');
        let _ = writeln!(out, "REDIS_HOST=127.0.0.1");
        let _ = writeln!(out, "REDIS_PASSWORD=null");
        let _ = writeln!(out, "REDIS_PORT=6379");
        out.push('\n');
        let _ = writeln!(out, "MAIL_DRIVER=sendmail");
        let _ = writeln!(out, "MAIL_HOST=localhost");
        let _ = writeln!(out, "MAIL_PORT=25");
        let _ = writeln!(out, "MAIL_USERNAME=null");
        let _ = writeln!(out, "MAIL_PASSWORD=null");
        let _ = writeln!(out, "MAIL_ENCRYPTION=null");
        out.push('\n');
        let _ = writeln!(out, "PUSHER_APP_ID=");
        let _ = writeln!(out, "PUSHER_APP_KEY=");
        let _ = writeln!(out, "PUSHER_APP_SECRET=");
        let _ = writeln!(out, "PUSHER_APP_CLUSTER=mt1");
        out.push('\n');
        let _ = writeln!(out, "MIX_PUSHER_APP_KEY=\"${{PUSHER_APP_KEY}}\"");
        let _ = writeln!(out, "MIX_PUSHER_APP_CLUSTER=\"${{PUSHER_APP_CLUSTER}}\"");
        out
    }

    /// Write the rendered descriptor into the installation root.
    ///
    /// # Errors
    /// Returns an error when the file cannot be written.
    pub fn write(&self, target: &Path) -> Result<(), LifecycleError> {
        std::fs::write(target.join(ENV_FILE), self.render())?;
        Ok(())
    }
}
