//! User-facing message texts.

use crate::core::config;
use crate::core::utils::{bytes_to_mb, display_filename};
use crate::download::files::FetchedFile;
use crate::download::library::LibraryStats;
use crate::download::platform::Platform;
use crate::download::progress::ProgressSnapshot;
use crate::download::result::DownloadResult;
use crate::download::ytdlp::FormatListing;
use crate::torrent::TorrentSummary;

const FILLED: char = '█';
const EMPTY: char = '░';

/// Text progress bar, `config::progress::BAR_WIDTH` cells wide.
pub fn progress_bar(percent: f64) -> String {
    let width = config::progress::BAR_WIDTH;
    let filled = ((width as f64 * percent.clamp(0.0, 100.0) / 100.0) as usize).min(width);
    std::iter::repeat(FILLED)
        .take(filled)
        .chain(std::iter::repeat(EMPTY).take(width - filled))
        .collect()
}

pub fn welcome() -> String {
    "Video download bot is running!\n\n\
     Supported platforms:\n\
     • X (Twitter)\n\
     • YouTube\n\
     • Bilibili\n\
     • Douyin\n\
     • Xvideos\n\
     • Pornhub\n\n\
     What I can do:\n\
     • Video download: send a video link\n\
     • File/image download: send a file or a photo\n\
     • Torrent download: send a magnet link or a .torrent link/file\n\n\
     Commands:\n\
     • /start - show this help\n\
     • /status - download statistics\n\
     • /cleanup - remove duplicate files\n\
     • /formats <link> - list available formats\n\
     • /version - engine version"
        .to_string()
}

pub fn invalid_link() -> &'static str {
    "Please send a valid video link, magnet link or torrent link"
}

pub fn unsupported_platform() -> &'static str {
    "Only X (Twitter), YouTube, Xvideos, Pornhub, Bilibili and Douyin links are supported"
}

pub fn torrent_disabled() -> &'static str {
    "Torrent downloads are not enabled"
}

pub fn starting(platform: Platform) -> String {
    format!("Starting {} download...", platform.display_name())
}

/// Live progress text for one snapshot.
pub fn progress(snapshot: &ProgressSnapshot) -> String {
    let name = display_filename(&snapshot.display_filename);
    let speed_mb = bytes_to_mb(snapshot.speed_bytes_per_sec.unwrap_or(0.0).max(0.0) as u64);

    if snapshot.is_finished() {
        let size = snapshot.total_bytes.unwrap_or(snapshot.downloaded_bytes);
        return format!(
            "📝 File: {}\n💾 Size: {:.2}MB\n⚡ Speed: done\n⏳ ETA: 0s\n📊 Progress: {} (100.0%)",
            name,
            bytes_to_mb(size),
            progress_bar(100.0)
        );
    }

    match snapshot.total_bytes {
        Some(total) => format!(
            "📝 File: {}\n💾 Size: {:.2}MB\n⚡ Speed: {:.2}MB/s\n⏳ ETA: {}\n📊 Progress: {} ({:.1}%)",
            name,
            bytes_to_mb(total),
            speed_mb,
            snapshot.eta_text(),
            progress_bar(snapshot.completion_fraction),
            snapshot.completion_fraction
        ),
        None => format!(
            "📝 File: {}\n💾 Size: {:.2}MB\n⚡ Speed: {:.2}MB/s\n⏳ ETA: unknown\n📊 Progress: downloading...",
            name,
            bytes_to_mb(snapshot.downloaded_bytes),
            speed_mb
        ),
    }
}

/// Terminal text for a task: completion summary or failure.
pub fn outcome(result: &DownloadResult) -> String {
    if !result.success {
        let reason = result.error.as_ref().map(|e| e.message()).unwrap_or("unknown error");
        return format!("Download failed: {}", reason);
    }
    format!(
        "Download complete!\n📝 File: {}\n📂 Saved to: {} folder\n💾 Size: {}MB\n🎥 Resolution: {}\n✅ Progress: {} (100%)",
        result.display_filename,
        result.platform.tag(),
        result.size_mb,
        result.resolution_text(),
        progress_bar(100.0)
    )
}

pub fn status(stats: &LibraryStats, active_downloads: usize) -> String {
    format!(
        "Download statistics\n\n\
         X videos: {} files\n\
         YouTube videos: {} files\n\
         Total: {} files\n\
         Total size: {:.2}MB\n\n\
         Bot status: running\n\
         Active downloads: {}",
        stats.x_files,
        stats.youtube_files,
        stats.total_files(),
        stats.total_mb(),
        active_downloads
    )
}

pub fn cleanup_done(removed: usize) -> String {
    if removed > 0 {
        format!("Cleanup complete!\nRemoved {} duplicate files", removed)
    } else {
        "Cleanup complete! No duplicate files found".to_string()
    }
}

pub fn formats_usage() -> &'static str {
    "Format check\n\nUsage:\n/formats <video link>\n\nExample:\n/formats https://www.youtube.com/watch?v=xxx"
}

pub fn formats(listing: &FormatListing) -> String {
    let mut text = format!("Video formats\n\nTitle: {}\n\nAvailable formats (first 10):\n", listing.title);
    for (i, fmt) in listing.formats.iter().enumerate() {
        let size = fmt
            .size_hint()
            .map(|s| format!(" ({:.1}MB)", bytes_to_mb(s)))
            .unwrap_or_default();
        text.push_str(&format!(
            "{}. ID: {} | {} | {}{}\n",
            i + 1,
            fmt.format_id,
            fmt.ext.as_deref().unwrap_or("unknown"),
            fmt.format_note.as_deref().unwrap_or("unknown"),
            size
        ));
    }
    text
}

pub fn version(engine_version: &str) -> String {
    format!(
        "Version information\n\nyt-dlp: {}\ngrabbot: v{}",
        engine_version,
        env!("CARGO_PKG_VERSION")
    )
}

pub fn torrent_added(summary: &TorrentSummary) -> String {
    let save_path = summary.save_path.as_deref().unwrap_or("default path");
    match summary.newest {
        Some(ref t) => format!(
            "Torrent added to the download queue!\n\n📝 Name: {}\n💾 Size: {:.2}MB\n📊 Progress: {:.1}%\n📂 Saved to: {}",
            t.name, t.size_mb, t.progress, save_path
        ),
        None => format!("Torrent added to the download queue!\n\n📂 Saved to: {}", save_path),
    }
}

pub fn file_saved(file: &FetchedFile) -> String {
    let (label, folder) = if file.is_image { ("Image", "images") } else { ("File", "files") };
    let name = if file.is_image { &file.file_name } else { &file.original_name };
    format!(
        "{} download complete!\n\n📝 Name: {}\n💾 Size: {}MB\n📂 Saved to: {} folder",
        label, name, file.size_mb, folder
    )
}
