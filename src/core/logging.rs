//! Logging initialization and startup configuration report
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - A one-shot summary of directories, cookies, proxy and torrent settings

use anyhow::Result;
use simplelog::*;
use std::fs::File;
use std::path::Path;

use crate::core::config;
use crate::download::platform::{DownloadDirs, Platform};

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to initialize logger
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Describes a cookies file setting for the startup report.
fn describe_cookies(path: Option<&String>) -> String {
    match path {
        Some(p) if Path::new(p).exists() => format!("{} (found)", p),
        Some(p) => format!("{} (FILE NOT FOUND, will be ignored)", p),
        None => "not set".to_string(),
    }
}

/// Logs the effective configuration at application startup
pub fn log_startup_configuration(dirs: &DownloadDirs, proxy: Option<&str>, torrent_enabled: bool) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Download layout (base: {})", dirs.base().display());
    for platform in Platform::ALL {
        if platform == Platform::Other {
            continue;
        }
        log::info!("  {:<9} → {}", platform.tag(), dirs.platform_dir(platform).display());
    }
    log::info!("  {:<9} → {}", "files", dirs.files_dir().display());
    log::info!("  {:<9} → {}", "images", dirs.images_dir().display());

    log::info!("X cookies: {}", describe_cookies(config::X_COOKIES.as_ref()));
    log::info!("Bilibili cookies: {}", describe_cookies(config::B_COOKIES.as_ref()));

    match proxy {
        Some(p) => log::info!("Proxy: {} (yt-dlp, direct fetches and Bot API)", p),
        None => log::info!("Proxy: not used, connecting directly"),
    }
    log::info!("Output container: {}", config::download::TARGET_CONTAINER);
    if !*config::CONVERT_TO_MP4 {
        log::warn!("CONVERT_TO_MP4=false is ignored, output names assume .mp4");
    }

    match *config::MAX_CONCURRENT_DOWNLOADS {
        0 => log::info!("Concurrent downloads: unbounded"),
        n => log::info!("Concurrent downloads: at most {}", n),
    }

    if torrent_enabled {
        log::info!(
            "Torrent downloads: enabled via {}",
            config::torrent::QBITTORRENT_HOST.as_deref().unwrap_or_default()
        );
    } else {
        log::info!("Torrent downloads: disabled");
    }
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
