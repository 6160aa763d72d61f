//! drivebot: browse a Google Drive folder from Telegram and fetch its files.

mod bot;
mod cli;
mod error;
mod sink;
mod startup;

use crate::bot::Bot;
use crate::cli::Args;
use crate::error::{ErrorKind, Result};
use clap::Parser;
use drivebot_cache::SessionStore;
use drivebot_config::Config;
use drivebot_drive::ProviderHandle;
use drivebot_drive::auth::{READONLY_SCOPE, ServiceAccount, ServiceAccountKey};
use drivebot_drive::backend::{DriveBackend, UnavailableBackend};
use drivebot_library::{TransferSettings, TransferSupervisor};
use drivebot_render::{Language, Localizer};
use drivebot_telegram::{ClientSettings, TelegramClient, TransportHandle};
use exn::ResultExt;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// How long in-flight transfers may keep running after a shutdown request.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);
/// Pause after a failed `getUpdates` before polling again.
const POLL_BACKOFF: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let filter = match &args.log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting drivebot");
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let default_language = Language::resolve(Some(config.default_language.as_str()), Language::English);
    let localizer = Arc::new(Localizer::new(default_language).or_raise(|| ErrorKind::Templates)?);

    let transport: TransportHandle = Arc::new(
        TelegramClient::new(config.bot_token.expose(), &client_settings(&config)).or_raise(|| ErrorKind::Client)?,
    );
    let provider = provider(&config).await;
    let store = Arc::new(
        SessionStore::open(&config.root_folder_id, &config.state.transfer_cache, &config.state.subscribers).await,
    );
    tracing::info!(
        cached_transfers = store.transfers.len(),
        subscribers = store.subscribers.len(),
        "Loaded session state"
    );

    let (supervisor, mut reports) = TransferSupervisor::new();
    let supervisor = Arc::new(supervisor);
    tokio::spawn(async move {
        while let Some(report) = reports.recv().await {
            if report.outcome.is_delivered() {
                tracing::info!(source_id = %report.source_id, outcome = %report.outcome, "Transfer finished");
            } else {
                tracing::warn!(source_id = %report.source_id, outcome = %report.outcome, "Transfer finished");
            }
        }
    });

    let settings = TransferSettings {
        max_upload_bytes: config.transfer.max_upload_bytes,
        chunk_size: config.transfer.chunk_size,
        progress_interval: config.transfer.progress_interval(),
        ..TransferSettings::default()
    };
    let bot = Arc::new(Bot::new(
        provider,
        transport.clone(),
        store.clone(),
        localizer.clone(),
        config.items_per_page,
        settings,
        supervisor.clone(),
    ));

    startup::prepare(transport.as_ref(), &localizer).await?;
    if config.broadcast.enabled && !args.no_broadcast {
        let pause = Duration::from_millis(config.broadcast.pause_ms);
        startup::broadcast(transport.as_ref(), &store.subscribers, &config.broadcast.message, pause).await;
    }

    tracing::info!("Bot is online");
    tokio::select! {
        () = poll(bot, config.telegram.poll_timeout_secs) => {},
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                tracing::error!(error = %err, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown requested");
        },
    }

    let summary = supervisor.shutdown(SHUTDOWN_GRACE).await;
    tracing::info!(completed = summary.completed, aborted = summary.aborted, "Stopped");
    Ok(())
}

fn client_settings(config: &Config) -> ClientSettings {
    let telegram = &config.telegram;
    ClientSettings {
        api_url: telegram.api_url.clone(),
        read_timeout: Duration::from_secs(telegram.read_timeout_secs),
        write_timeout: Duration::from_secs(telegram.write_timeout_secs),
        connect_timeout: Duration::from_secs(telegram.connect_timeout_secs),
        pool_size: telegram.pool_size,
    }
}

/// The Drive backend, or a stand-in that fails every call when no usable
/// credential is configured. The bot keeps running either way.
async fn provider(config: &Config) -> ProviderHandle {
    let credentials = &config.credentials;
    let backend = async {
        let key = ServiceAccountKey::discover(&credentials.env_var, &credentials.key_file).await?;
        let account = ServiceAccount::new(key, READONLY_SCOPE)?;
        tracing::info!(account = account.client_email(), "Authenticated with Google Drive");
        DriveBackend::new(
            "drive",
            account,
            Some(config.drive.api_url.clone()),
            config.drive.max_concurrent_requests,
            Duration::from_secs(config.drive.request_timeout_secs),
        )
    };
    match backend.await {
        Ok(backend) => Arc::new(backend),
        Err(err) => {
            tracing::error!(error = %err, "Google Drive is unavailable");
            Arc::new(UnavailableBackend::new(err.to_string()))
        },
    }
}

/// Long-polls for updates forever, handling each on its own task.
async fn poll(bot: Arc<Bot>, timeout_secs: u64) {
    let mut offset = None;
    loop {
        let updates = match bot.transport().get_updates(offset, timeout_secs).await {
            Ok(updates) => updates,
            Err(err) => {
                tracing::warn!(error = %err, retryable = err.is_retryable(), "Polling failed");
                tokio::time::sleep(POLL_BACKOFF).await;
                continue;
            },
        };
        for update in updates {
            offset = Some(update.update_id + 1);
            let bot = bot.clone();
            tokio::spawn(async move {
                let update_id = update.update_id;
                if let Err(err) = bot.handle_update(update).await {
                    tracing::warn!(update_id, retryable = err.is_retryable(), error = ?err, "Update handling failed");
                }
            });
        }
    }
}
