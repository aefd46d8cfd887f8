//! Command-line frontend for managing a BookStack deployment.

mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use log::error;
use simplelog::LevelFilter;

use bindery_core::{
    APP_KEY, APP_NAME, DbBackend, EnvMode, GithubReleaseSource, HttpDownloader, InstallOptions,
    Installer, ReleaseCatalog, TokioCommandRunner,
};
use bindery_store::{AdminCredentialManager, AdminUpdate, ChangeOutcome};

const DEFAULT_DATABASE: &str = "database.sqlite";

#[derive(Parser)]
#[command(name = "bindery", version, about = "BookStack lifecycle manager")]
struct Cli {
    /// Increase log verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the versions available upstream.
    Versions {
        /// Show only the newest available version.
        #[arg(long)]
        latest: bool,
    },
    /// Install a fresh deployment into a directory.
    Install {
        /// Installation root.
        target: PathBuf,
        /// Version to install; defaults to the newest release.
        #[arg(long)]
        version: Option<String>,
        /// Public URL the deployment will be served under.
        #[arg(long)]
        app_url: String,
        #[arg(long, value_enum, default_value_t = Mode::Production)]
        mode: Mode,
        /// Enable application debug output.
        #[arg(long)]
        debug: bool,
        /// Path to the deployment's database file; defaults to
        /// `database.sqlite` inside the target. The rendered environment
        /// and administrator provisioning both use this file.
        #[arg(long)]
        database: Option<PathBuf>,
        #[arg(long, default_value = "")]
        db_table_prefix: String,
        /// Administrator account name.
        #[arg(long)]
        admin_user: Option<String>,
        /// Administrator email address.
        #[arg(long)]
        admin_email: String,
        /// Administrator password; generated when omitted.
        #[arg(long)]
        admin_password: Option<String>,
    },
    /// Update an existing deployment.
    Update {
        /// Installation root.
        target: PathBuf,
        /// Version to update to; defaults to the newest release.
        #[arg(long)]
        version: Option<String>,
    },
    /// Show the administrator account.
    GetAdmin {
        /// Path to the application database.
        #[arg(long)]
        database: PathBuf,
        #[arg(long, default_value = "")]
        table_prefix: String,
    },
    /// Change administrator credentials.
    ChangeAdmin {
        /// Path to the application database.
        #[arg(long)]
        database: PathBuf,
        #[arg(long, default_value = "")]
        table_prefix: String,
        /// Field to set, as `key=value`; keys are `user`, `email`, and
        /// `password` (repeatable).
        #[arg(long = "set", value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Production,
    Development,
}

impl From<Mode> for EnvMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Production => Self::Production,
            Mode::Development => Self::Development,
        }
    }
}

/// The deployment's database file. The credential store provisions against
/// the same file the environment descriptor declares.
fn embedded_database(target: &Path, database: Option<PathBuf>) -> PathBuf {
    database.unwrap_or_else(|| target.join(DEFAULT_DATABASE))
}

fn installer() -> Installer<GithubReleaseSource, HttpDownloader, TokioCommandRunner> {
    let client = reqwest::Client::new();
    Installer::new(
        ReleaseCatalog::new(GithubReleaseSource::new(client.clone())),
        HttpDownloader::new(client),
        TokioCommandRunner,
    )
}

fn parse_fields(fields: &[String]) -> Result<AdminUpdate, String> {
    let mut pairs = Vec::with_capacity(fields.len());
    for field in fields {
        let Some((key, value)) = field.split_once('=') else {
            return Err(format!("`{field}' is not of the form KEY=VALUE"));
        };
        pairs.push((key, value));
    }
    AdminUpdate::from_pairs(pairs).map_err(|error| error.to_string())
}

async fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Versions { latest } => {
            let client = reqwest::Client::new();
            let catalog = ReleaseCatalog::new(GithubReleaseSource::new(client));
            let releases = catalog
                .fetch(APP_KEY)
                .await
                .map_err(|error| error.to_string())?;
            if latest {
                match releases.first() {
                    Some(release) => println!("{}", release.version),
                    None => return Err(format!("no {APP_NAME} releases available")),
                }
            } else {
                for release in &releases {
                    println!("{}", release.version);
                }
            }
        }
        Command::Install {
            target,
            version,
            app_url,
            mode,
            debug,
            database,
            db_table_prefix,
            admin_user,
            admin_email,
            admin_password,
        } => {
            let database = embedded_database(&target, database);
            let options = InstallOptions {
                version,
                app_url,
                mode: mode.into(),
                debug,
                db: DbBackend::Embedded {
                    database: database.clone(),
                },
                admin_user,
                admin_email,
                admin_password,
            };
            std::fs::create_dir_all(&target).map_err(|error| error.to_string())?;
            let store = AdminCredentialManager::open(&database, &db_table_prefix)
                .map_err(|error| error.to_string())?;
            let report = installer()
                .install(&target, &options, &store)
                .await
                .map_err(|error| error.to_string())?;
            println!(
                "{APP_NAME} {} installed into {}",
                report.version,
                target.display()
            );
            println!("administrator: {}", report.admin_user);
            if let Some(password) = report.generated_password {
                println!("generated password: {password}");
            }
        }
        Command::Update { target, version } => {
            let version = installer()
                .update(&target, version.as_deref())
                .await
                .map_err(|error| error.to_string())?;
            println!("{APP_NAME} updated to {version}");
        }
        Command::GetAdmin {
            database,
            table_prefix,
        } => {
            let store = AdminCredentialManager::open(&database, &table_prefix)
                .map_err(|error| error.to_string())?;
            match store.admin().map_err(|error| error.to_string())? {
                Some(admin) => println!("{} <{}>", admin.user, admin.email),
                None => return Err("no administrator account found".to_string()),
            }
        }
        Command::ChangeAdmin {
            database,
            table_prefix,
            fields,
        } => {
            let update = parse_fields(&fields)?;
            let store = AdminCredentialManager::open(&database, &table_prefix)
                .map_err(|error| error.to_string())?;
            match store
                .change_admin(&update)
                .map_err(|error| error.to_string())?
            {
                ChangeOutcome::Updated => println!("administrator updated"),
                ChangeOutcome::NothingUpdated => println!("no fields updated"),
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    logging::init(level);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{message}");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}
