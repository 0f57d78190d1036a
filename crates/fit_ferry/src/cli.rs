//! CLI surface: argument parsing, credential resolution and dispatch.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use sports_tracker_client::config::Config;
use sports_tracker_client::http_client::ReqwestSportsTrackerClient;

use crate::download;
use crate::upload::{self, UploadConfig};

const ENDOMONDO_BASE_URL: &str = "https://www.endomondo.com";

#[derive(Parser)]
#[command(name = "fit-ferry")]
#[command(about = "Move workout FIT files between Sports Tracker and Endomondo")]
#[command(version)]
pub struct Cli {
    /// Increase output verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Download recorded workouts from Sports Tracker as FIT files
    Download {
        /// Directory to store exported files in (must exist)
        #[arg(short, long, default_value = ".")]
        directory: PathBuf,
        /// The user to log in as
        #[arg(short, long, env = "SPORTS_TRACKER_USERNAME")]
        user: String,
    },

    /// Upload local FIT files to Endomondo through the web UI
    Upload {
        /// Directory to load FIT files from (must exist)
        #[arg(short, long, default_value = ".")]
        directory: PathBuf,
        /// The user to log in as
        #[arg(short, long, env = "ENDOMONDO_USERNAME")]
        user: String,
        /// Run the browser with a visible window
        #[arg(long)]
        headful: bool,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Download { directory, user } => {
            ensure_directory(&directory)?;
            // The -u flag (already env-backed through clap) wins over the
            // plain environment; password and base URL come from the env.
            let config = Config::from_env_with(|key| match key {
                "SPORTS_TRACKER_USERNAME" => Some(user.clone()),
                other => std::env::var(other).ok(),
            })?;
            let password = match config.password {
                Some(password) => password,
                None => prompt_password("Sports Tracker")?,
            };
            let client =
                ReqwestSportsTrackerClient::new(&config.base_url, config.username, password);
            let report = download::run(&client, &directory).await?;
            tracing::info!(
                "all done: {} downloaded, {} failed of {} workouts",
                report.downloaded,
                report.failed,
                report.total
            );
            Ok(())
        }
        Commands::Upload {
            directory,
            user,
            headful,
        } => {
            ensure_directory(&directory)?;
            let password = resolve_password("ENDOMONDO_PASSWORD", "Endomondo")?;
            let base_url =
                std::env::var("ENDOMONDO_BASE_URL").unwrap_or_else(|_| ENDOMONDO_BASE_URL.into());
            let config = UploadConfig {
                base_url,
                directory,
                username: user,
                password,
                headless: !headful,
                step_timeout: Duration::from_secs(10),
                pace_delay: Duration::from_secs(5),
            };
            let report = upload::run(config).await?;
            tracing::info!(
                "all done: {} uploaded, {} failed of {} files",
                report.uploaded,
                report.failed,
                report.total
            );
            Ok(())
        }
    }
}

/// The target directory must pre-exist; checked before any network or
/// browser activity.
fn ensure_directory(directory: &Path) -> anyhow::Result<()> {
    if !directory.is_dir() {
        bail!(
            "directory '{}' does not exist, cannot continue",
            directory.display()
        );
    }
    Ok(())
}

/// Resolve a service password: environment variable first, then a masked
/// interactive prompt.
fn resolve_password(env_var: &str, service: &str) -> anyhow::Result<SecretString> {
    if let Ok(password) = std::env::var(env_var) {
        return Ok(SecretString::new(password.into()));
    }
    prompt_password(service)
}

/// Read a password from the terminal without echoing it.
fn prompt_password(service: &str) -> anyhow::Result<SecretString> {
    let term = console::Term::stderr();
    term.write_str(&format!("Enter your {service} password: "))
        .context("writing password prompt")?;
    let password = term
        .read_secure_line()
        .context("reading password from terminal")?;
    Ok(SecretString::new(password.into()))
}
