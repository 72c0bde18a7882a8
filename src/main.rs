use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use crossword_sync::config::{read_required_config, ConfigLayer, SyncConfig};
use crossword_sync::remote::DriveClient;
use crossword_sync::store::HttpFetcher;
use crossword_sync::sync::{run_sync_connecting, CleanupOutcome, SyncError, SyncReport};
use crossword_sync::{auth, naming, utils};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Crossword Sync - download the daily crossword and back it up to Google Drive
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Drive folder that receives the uploads
    #[arg(long, env = "CROSSWORD_DRIVE_FOLDER_ID")]
    folder_id: Option<String>,

    /// Local directory for downloaded PDFs (default: <exe dir>/crosswords)
    #[arg(long, env = "CROSSWORD_SAVE_DIR")]
    save_dir: Option<PathBuf>,

    /// Base URL the daily PDFs are published under
    #[arg(long, env = "CROSSWORD_BASE_URL")]
    base_url: Option<String>,

    /// Cached OAuth credentials (default: <exe dir>/credentials.json)
    #[arg(long, env = "CROSSWORD_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Google OAuth client secrets (default: <exe dir>/client_secrets.json)
    #[arg(long, env = "CROSSWORD_CLIENT_SECRETS")]
    client_secrets: Option<PathBuf>,

    /// OAuth client id, used instead of the client secrets file
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    client_id: Option<String>,

    /// OAuth client secret, used instead of the client secrets file
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Optional JSON config file; command line and env take precedence
    #[arg(long, env = "CROSSWORD_CONFIG")]
    config: Option<PathBuf>,

    /// Sync this date (YYYY-MM-DD) instead of today
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Network timeout in seconds
    #[arg(long, env = "CROSSWORD_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Show what would be downloaded, uploaded and deleted without doing it
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn layer(&self) -> ConfigLayer {
        ConfigLayer {
            folder_id: self.folder_id.clone(),
            save_dir: self.save_dir.clone(),
            base_url: self.base_url.clone(),
            credentials_path: self.credentials.clone(),
            client_secrets_path: self.client_secrets.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let args = Args::parse();

    match run(args).await {
        Ok(report) => {
            log_summary(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<SyncReport> {
    let base_dir = utils::default_base_dir();

    let file_layer = match &args.config {
        Some(path) => Some(
            read_required_config(path)
                .await
                .with_context(|| format!("Failed to read config {}", path.display()))?,
        ),
        None => None,
    };
    let layer = args.layer().over(file_layer.unwrap_or_default());
    let config = SyncConfig::resolve(layer, &base_dir, args.dry_run)?;

    let today = args.date.unwrap_or_else(naming::today);
    let http = utils::build_http_client(config.timeout_secs).context("Failed to build HTTP client")?;

    let fetcher = HttpFetcher::new(http.clone());

    // Today's PDF is saved before any credential is touched
    let report = run_sync_connecting(&config, today, &fetcher, || connect_drive(&http, &config)).await?;
    Ok(report)
}

async fn connect_drive(http: &reqwest::Client, config: &SyncConfig) -> Result<DriveClient, SyncError> {
    let oauth = auth::resolve_oauth_client(
        config.client_id.as_deref(),
        config.client_secret.as_deref(),
        &config.client_secrets_path,
    )
    .await?;

    let credentials = auth::authenticate(http, oauth.as_ref(), &config.credentials_path).await?;
    Ok(DriveClient::new(http.clone(), credentials.access_token))
}

fn log_summary(report: &SyncReport) {
    match &report.cleanup {
        CleanupOutcome::Completed(cleanup) => info!(
            file = %report.local_filename,
            deleted = cleanup.deleted_count(),
            kept_unconfirmed = cleanup.kept_unconfirmed.len(),
            "Sync complete"
        ),
        CleanupOutcome::Planned(plan) => info!(
            file = %report.local_filename,
            would_delete = plan.to_delete.len(),
            "Dry run complete"
        ),
        CleanupOutcome::Skipped { reason } => info!(
            file = %report.local_filename,
            cleanup_skipped = %reason,
            "Sync complete"
        ),
    }
}
