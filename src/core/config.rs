use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Reads a boolean flag the way the deployment scripts set them ("true"/"false").
fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

/// Reads an optional variable, treating empty strings as unset.
fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Bot token
/// Read from TELEGRAM_BOT_TOKEN (falls back to TELOXIDE_TOKEN)
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("TELEGRAM_BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_default()
});

/// Cached yt-dlp binary path
/// Read once at startup from YTDL_BIN environment variable or defaults to "yt-dlp"
pub static YTDL_BIN: Lazy<String> = Lazy::new(|| env::var("YTDL_BIN").unwrap_or_else(|_| "yt-dlp".to_string()));

/// ffprobe binary used for post-download resolution probing
pub static FFPROBE_BIN: Lazy<String> = Lazy::new(|| env::var("FFPROBE_BIN").unwrap_or_else(|_| "ffprobe".to_string()));

/// Base download folder
/// Read from DOWNLOAD_PATH, default /downloads. Supports tilde (~) expansion.
pub static DOWNLOAD_PATH: Lazy<String> = Lazy::new(|| {
    let raw = env::var("DOWNLOAD_PATH").unwrap_or_else(|_| "/downloads".to_string());
    shellexpand::tilde(&raw).to_string()
});

/// When true, every platform directory is read from its own `*_DOWNLOAD_PATH` variable
pub static CUSTOM_DOWNLOAD_PATH: Lazy<bool> = Lazy::new(|| env_flag("CUSTOM_DOWNLOAD_PATH", false));

/// Cookies file for X (Twitter)
pub static X_COOKIES: Lazy<Option<String>> = Lazy::new(|| env_opt("X_COOKIES"));

/// Cookies file for Bilibili
pub static B_COOKIES: Lazy<Option<String>> = Lazy::new(|| env_opt("B_COOKIES"));

/// Proxy for yt-dlp, direct fetches and the Bot API client, e.g. `http://127.0.0.1:7890`
pub static PROXY_HOST: Lazy<Option<String>> = Lazy::new(|| env_opt("PROXY_HOST"));

/// Reported at startup only; retrievals always merge and recode to mp4
pub static CONVERT_TO_MP4: Lazy<bool> = Lazy::new(|| env_flag("CONVERT_TO_MP4", true));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: grabbot.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "grabbot.log".to_string()));

/// Maximum concurrently running retrievals. 0 keeps the worker-per-task model unbounded.
pub static MAX_CONCURRENT_DOWNLOADS: Lazy<usize> = Lazy::new(|| {
    env::var("MAX_CONCURRENT_DOWNLOADS")
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
});

/// Per-platform directory overrides, only consulted with CUSTOM_DOWNLOAD_PATH=true
pub mod paths {
    use super::env;

    /// Returns the override for a platform directory, or its `/downloads/<tag>` default
    pub fn platform_override(var: &str, tag: &str) -> String {
        let raw = env::var(var).unwrap_or_else(|_| format!("/downloads/{}", tag));
        shellexpand::tilde(&raw).to_string()
    }
}

/// qBittorrent Web API configuration
pub mod torrent {
    use super::{env_opt, Lazy};

    /// Web UI base URL, e.g. `http://qbittorrent:8080`. Torrent support is off when unset.
    pub static QBITTORRENT_HOST: Lazy<Option<String>> = Lazy::new(|| env_opt("QBITTORRENT_HOST"));

    pub static QBITTORRENT_USERNAME: Lazy<Option<String>> = Lazy::new(|| env_opt("QBITTORRENT_USERNAME"));

    pub static QBITTORRENT_PASSWORD: Lazy<Option<String>> = Lazy::new(|| env_opt("QBITTORRENT_PASSWORD"));

    /// Save path passed to qBittorrent with every added torrent
    pub static QBITTORRENT_DOWNLOAD_PATH: Lazy<Option<String>> = Lazy::new(|| env_opt("QBITTORRENT_DOWNLOAD_PATH"));
}

/// Download configuration
pub mod download {
    use super::Duration;

    /// Pause after a successful transfer so directory listings catch up with the write
    pub const SETTLE_DELAY_MS: u64 = 1000;

    /// Files modified within this window are preferred by the fallback lookup
    pub const FRESHNESS_WINDOW_SECS: u64 = 3600;

    /// yt-dlp engine-level retry budgets, forwarded verbatim
    pub const SOCKET_TIMEOUT_SECS: u32 = 30;
    pub const RETRIES: u32 = 10;
    pub const FRAGMENT_RETRIES: u32 = 10;
    pub const EXTRACTOR_RETRIES: u32 = 10;

    /// Container every download is merged/converted into
    pub const TARGET_CONTAINER: &str = "mp4";

    /// Timeout for metadata probes (`yt-dlp -J`)
    pub const PROBE_TIMEOUT_SECS: u64 = 120;

    /// Media extensions the fallback lookup and the library statistics consider
    pub const MEDIA_EXTENSIONS: &[&str] = &["mp4", "mkv", "webm", "mov", "avi"];

    pub const USER_AGENT: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    pub fn settle_delay() -> Duration {
        Duration::from_millis(SETTLE_DELAY_MS)
    }

    pub fn freshness_window() -> Duration {
        Duration::from_secs(FRESHNESS_WINDOW_SECS)
    }

    pub fn probe_timeout() -> Duration {
        Duration::from_secs(PROBE_TIMEOUT_SECS)
    }
}

/// Progress relay configuration
pub mod progress {
    use super::Duration;

    /// Minimum spacing between two relayed `downloading` snapshots (in milliseconds)
    pub const MIN_EMIT_INTERVAL_MS: u64 = 1000;

    /// Capacity of the per-task snapshot channel
    pub const CHANNEL_CAPACITY: usize = 32;

    /// Width of the text progress bar
    pub const BAR_WIDTH: usize = 20;

    pub fn min_emit_interval() -> Duration {
        Duration::from_millis(MIN_EMIT_INTERVAL_MS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Timeout for direct file fetches
    pub const FETCH_TIMEOUT_SECS: u64 = 60;

    /// Timeout for qBittorrent API calls
    pub const TORRENT_API_TIMEOUT_SECS: u64 = 30;

    /// Timeout for the startup proxy probe
    pub const PROXY_PROBE_TIMEOUT_SECS: u64 = 5;

    /// URL the proxy probe fetches
    pub const PROXY_PROBE_URL: &str = "http://www.google.com";

    /// Request timeout for Bot API calls
    pub const REQUEST_TIMEOUT_SECS: u64 = 300;

    pub fn fetch_timeout() -> Duration {
        Duration::from_secs(FETCH_TIMEOUT_SECS)
    }

    pub fn torrent_api_timeout() -> Duration {
        Duration::from_secs(TORRENT_API_TIMEOUT_SECS)
    }

    pub fn proxy_probe_timeout() -> Duration {
        Duration::from_secs(PROXY_PROBE_TIMEOUT_SECS)
    }

    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_flag_parsing() {
        std::env::set_var("GRABBOT_TEST_FLAG_TRUE", "TRUE");
        std::env::set_var("GRABBOT_TEST_FLAG_FALSE", "no");
        assert!(env_flag("GRABBOT_TEST_FLAG_TRUE", false));
        assert!(!env_flag("GRABBOT_TEST_FLAG_FALSE", true));
        assert!(env_flag("GRABBOT_TEST_FLAG_MISSING", true));
    }

    #[test]
    fn test_env_opt_treats_blank_as_unset() {
        std::env::set_var("GRABBOT_TEST_BLANK", "   ");
        assert_eq!(env_opt("GRABBOT_TEST_BLANK"), None);
        std::env::set_var("GRABBOT_TEST_VALUE", " /tmp/c.txt ");
        assert_eq!(env_opt("GRABBOT_TEST_VALUE").as_deref(), Some("/tmp/c.txt"));
    }

    #[test]
    fn test_durations() {
        assert_eq!(download::settle_delay(), Duration::from_secs(1));
        assert_eq!(download::freshness_window(), Duration::from_secs(3600));
        assert_eq!(progress::min_emit_interval(), Duration::from_secs(1));
    }
}
