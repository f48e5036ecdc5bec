use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;

use grabbot::core::{config, init_logger, log_startup_configuration, proxy};
use grabbot::download::files::FileFetcher;
use grabbot::download::{DownloadDirs, DownloadExecutor, DownloadService, FfprobeProber, YtDlpEngine};
use grabbot::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};
use grabbot::torrent::qbittorrent::QBittorrentClient;
use grabbot::torrent::{TorrentClient, TorrentService};

/// Main entry point for the Telegram bot
///
/// # Errors
/// Returns an error if initialization fails (logging, directories, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present
    let _ = dotenv();

    init_logger(&config::LOG_FILE_PATH)?;

    if config::BOT_TOKEN.is_empty() {
        log::error!("TELEGRAM_BOT_TOKEN is not set");
        anyhow::bail!("TELEGRAM_BOT_TOKEN is not set");
    }

    let proxy = proxy::init().await;

    let dirs = DownloadDirs::from_env();
    dirs.ensure_all()?;

    let torrents = match QBittorrentClient::from_env() {
        Ok(Some(client)) => {
            let client: Arc<dyn TorrentClient> = Arc::new(client);
            TorrentService::connect(client).await.map(Arc::new)
        }
        Ok(None) => None,
        Err(e) => {
            log::error!("qBittorrent client could not be created: {}", e);
            None
        }
    };

    log_startup_configuration(&dirs, proxy, torrents.is_some());

    let engine = YtDlpEngine::default();
    let executor = DownloadExecutor::new(Arc::new(engine.clone()));
    let files = Arc::new(FileFetcher::new(&dirs, proxy)?);
    let downloads = Arc::new(DownloadService::new(dirs, executor, Arc::new(FfprobeProber::default())));

    let deps = HandlerDeps::new(downloads, files, torrents, engine, proxy.map(str::to_string));

    let bot = create_bot(proxy)?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    log::info!("Bot started, polling for updates");
    let listener = Polling::builder(bot.clone()).drop_pending_updates().build();
    Dispatcher::builder(bot, schema(deps))
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}
