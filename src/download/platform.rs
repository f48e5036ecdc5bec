//! Platform classification and the per-platform strategy table.
//!
//! A URL's host decides which platform a request belongs to. Everything that
//! differs between platforms (directory, file naming, format policy, cookies)
//! lives in one `PlatformStrategy` record looked up once per task.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use crate::core::config;

/// Content source a URL belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    X,
    YouTube,
    Xvideos,
    Pornhub,
    Bilibili,
    Douyin,
    Other,
}

/// How a host is matched against a platform's host list.
#[derive(Debug, Clone, Copy)]
enum HostMatch {
    /// Host must equal one of the entries
    Exact(&'static [&'static str]),
    /// Host must equal an entry or end with `.entry`
    Suffix(&'static [&'static str]),
}

impl HostMatch {
    fn matches(&self, host: &str) -> bool {
        match self {
            HostMatch::Exact(hosts) => hosts.iter().any(|h| host == *h),
            HostMatch::Suffix(domains) => domains
                .iter()
                .any(|d| host == *d || host.ends_with(&format!(".{}", d))),
        }
    }
}

/// Host rules in classification order.
const HOST_RULES: &[(Platform, HostMatch)] = &[
    (
        Platform::X,
        HostMatch::Exact(&["twitter.com", "x.com", "www.twitter.com", "www.x.com"]),
    ),
    (
        Platform::YouTube,
        HostMatch::Exact(&["youtube.com", "www.youtube.com", "youtu.be", "m.youtube.com"]),
    ),
    (Platform::Xvideos, HostMatch::Suffix(&["xvideos.com"])),
    (Platform::Pornhub, HostMatch::Suffix(&["pornhub.com"])),
    (
        Platform::Bilibili,
        HostMatch::Exact(&["bilibili.com", "www.bilibili.com", "b23.tv"]),
    ),
    (
        Platform::Douyin,
        HostMatch::Exact(&["douyin.com", "www.douyin.com", "v.douyin.com"]),
    ),
];

impl Platform {
    pub const ALL: [Platform; 7] = [
        Platform::X,
        Platform::YouTube,
        Platform::Xvideos,
        Platform::Pornhub,
        Platform::Bilibili,
        Platform::Douyin,
        Platform::Other,
    ];

    /// Classifies a URL by its host. Unparseable URLs and unknown hosts are `Other`.
    pub fn from_url(url: &str) -> Platform {
        let host = match Url::parse(url.trim()) {
            Ok(parsed) => match parsed.host_str() {
                Some(h) => h.to_lowercase(),
                None => return Platform::Other,
            },
            Err(_) => return Platform::Other,
        };

        HOST_RULES
            .iter()
            .find(|(_, rule)| rule.matches(&host))
            .map(|(platform, _)| *platform)
            .unwrap_or(Platform::Other)
    }

    /// Stable lowercase tag, also used as directory name and title fallback.
    pub fn tag(&self) -> &'static str {
        match self {
            Platform::X => "x",
            Platform::YouTube => "youtube",
            Platform::Xvideos => "xvideos",
            Platform::Pornhub => "pornhub",
            Platform::Bilibili => "bilibili",
            Platform::Douyin => "douyin",
            Platform::Other => "other",
        }
    }

    /// Human-readable name for chat messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::X => "X (Twitter)",
            Platform::YouTube => "YouTube",
            Platform::Xvideos => "Xvideos",
            Platform::Pornhub => "Pornhub",
            Platform::Bilibili => "Bilibili",
            Platform::Douyin => "Douyin",
            Platform::Other => "Web",
        }
    }

    pub fn is_supported(&self) -> bool {
        *self != Platform::Other
    }

    /// The strategy record for this platform.
    pub fn strategy(&self) -> &'static PlatformStrategy {
        // STRATEGIES is ordered like Platform::ALL
        let idx = Platform::ALL.iter().position(|p| p == self).unwrap_or(Platform::ALL.len() - 1);
        &STRATEGIES[idx]
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Output file naming policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingPolicy {
    /// `%(id)s.%(ext)s`
    VideoId,
    /// `{sanitized title}.%(ext)s`
    SanitizedTitle,
}

/// Format selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatPolicy {
    /// Best single combined stream
    BestSingle,
    /// Separate best video-only + best audio-only, merged
    DualStream,
}

/// Which configured cookies file a platform uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookiesSource {
    None,
    X,
    Bilibili,
}

impl CookiesSource {
    /// The configured path, if the variable is set.
    pub fn configured_path(&self) -> Option<&'static str> {
        match self {
            CookiesSource::None => None,
            CookiesSource::X => config::X_COOKIES.as_deref(),
            CookiesSource::Bilibili => config::B_COOKIES.as_deref(),
        }
    }
}

/// Everything that differs between platforms, as one record.
#[derive(Debug, Clone, Copy)]
pub struct PlatformStrategy {
    pub platform: Platform,
    pub naming: NamingPolicy,
    pub format: FormatPolicy,
    pub cookies: CookiesSource,
}

const fn strategy(platform: Platform, naming: NamingPolicy, format: FormatPolicy, cookies: CookiesSource) -> PlatformStrategy {
    PlatformStrategy {
        platform,
        naming,
        format,
        cookies,
    }
}

static STRATEGIES: [PlatformStrategy; 7] = [
    strategy(Platform::X, NamingPolicy::VideoId, FormatPolicy::BestSingle, CookiesSource::X),
    strategy(Platform::YouTube, NamingPolicy::SanitizedTitle, FormatPolicy::BestSingle, CookiesSource::None),
    strategy(Platform::Xvideos, NamingPolicy::SanitizedTitle, FormatPolicy::BestSingle, CookiesSource::None),
    strategy(Platform::Pornhub, NamingPolicy::SanitizedTitle, FormatPolicy::BestSingle, CookiesSource::None),
    strategy(
        Platform::Bilibili,
        NamingPolicy::SanitizedTitle,
        FormatPolicy::DualStream,
        CookiesSource::Bilibili,
    ),
    strategy(Platform::Douyin, NamingPolicy::SanitizedTitle, FormatPolicy::BestSingle, CookiesSource::None),
    strategy(Platform::Other, NamingPolicy::SanitizedTitle, FormatPolicy::BestSingle, CookiesSource::None),
];

static DOUYIN_LINK: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"https?://(?:www\.)?douyin\.com/\S+").ok());
static DOUYIN_SHORT_LINK: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"https?://v\.douyin\.com/\S+").ok());

/// Pulls a Douyin link out of share text ("7.43 复制打开抖音… https://v.douyin.com/xyz/ …").
///
/// Tries the full-domain pattern first, then the short-link pattern, and
/// returns the first match verbatim.
pub fn extract_embedded_link(text: &str) -> Option<String> {
    [&*DOUYIN_LINK, &*DOUYIN_SHORT_LINK]
        .into_iter()
        .flatten()
        .find_map(|re| re.find(text).map(|m| m.as_str().to_string()))
}

/// On-disk layout: one directory per platform plus `files/` and `images/`.
#[derive(Debug, Clone)]
pub struct DownloadDirs {
    base: PathBuf,
    x: PathBuf,
    youtube: PathBuf,
    xvideos: PathBuf,
    pornhub: PathBuf,
    bilibili: PathBuf,
    douyin: PathBuf,
}

impl DownloadDirs {
    /// Layout rooted at `base` (`base/x`, `base/youtube`, ...).
    pub fn under(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            x: base.join(Platform::X.tag()),
            youtube: base.join(Platform::YouTube.tag()),
            xvideos: base.join(Platform::Xvideos.tag()),
            pornhub: base.join(Platform::Pornhub.tag()),
            bilibili: base.join(Platform::Bilibili.tag()),
            douyin: base.join(Platform::Douyin.tag()),
            base,
        }
    }

    /// Layout from the environment: `DOWNLOAD_PATH`, or per-platform
    /// `*_DOWNLOAD_PATH` overrides when `CUSTOM_DOWNLOAD_PATH=true`.
    pub fn from_env() -> Self {
        let mut dirs = Self::under(config::DOWNLOAD_PATH.as_str());
        if *config::CUSTOM_DOWNLOAD_PATH {
            use config::paths::platform_override;
            dirs.x = platform_override("X_DOWNLOAD_PATH", "x").into();
            dirs.youtube = platform_override("YOUTUBE_DOWNLOAD_PATH", "youtube").into();
            dirs.xvideos = platform_override("XVIDEOS_DOWNLOAD_PATH", "xvideos").into();
            dirs.pornhub = platform_override("PORNHUB_DOWNLOAD_PATH", "pornhub").into();
            dirs.bilibili = platform_override("BILIBILI_DOWNLOAD_PATH", "bilibili").into();
            dirs.douyin = platform_override("DOUYIN_DOWNLOAD_PATH", "douyin").into();
        }
        dirs
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Directory a platform's downloads land in. `Other` shares the YouTube directory.
    pub fn platform_dir(&self, platform: Platform) -> &Path {
        match platform {
            Platform::X => &self.x,
            Platform::YouTube | Platform::Other => &self.youtube,
            Platform::Xvideos => &self.xvideos,
            Platform::Pornhub => &self.pornhub,
            Platform::Bilibili => &self.bilibili,
            Platform::Douyin => &self.douyin,
        }
    }

    pub fn files_dir(&self) -> PathBuf {
        self.base.join("files")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.base.join("images")
    }

    /// Creates every directory of the layout.
    pub fn ensure_all(&self) -> std::io::Result<()> {
        for platform in Platform::ALL {
            fs::create_dir_all(self.platform_dir(platform))?;
        }
        fs::create_dir_all(self.files_dir())?;
        fs::create_dir_all(self.images_dir())?;
        Ok(())
    }

    /// Classifies `url` and returns its platform together with the target directory.
    pub fn classify(&self, url: &str) -> (Platform, PathBuf) {
        let platform = Platform::from_url(url);
        (platform, self.platform_dir(platform).to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classify_known_hosts() {
        let cases = [
            ("https://x.com/user/status/1", Platform::X),
            ("https://WWW.Twitter.com/user/status/1", Platform::X),
            ("https://youtu.be/abc123", Platform::YouTube),
            ("https://m.youtube.com/watch?v=abc", Platform::YouTube),
            ("https://www.xvideos.com/video123/title", Platform::Xvideos),
            ("https://cn.pornhub.com/view_video.php?viewkey=1", Platform::Pornhub),
            ("https://b23.tv/AbCdE", Platform::Bilibili),
            ("https://www.bilibili.com/video/BV1xx411c7mD", Platform::Bilibili),
            ("https://v.douyin.com/iRNBho6u/", Platform::Douyin),
        ];
        for (url, expected) in cases {
            assert_eq!(Platform::from_url(url), expected, "{}", url);
        }
    }

    #[test]
    fn test_classify_unknown_is_other() {
        assert_eq!(Platform::from_url("https://vimeo.com/123"), Platform::Other);
        assert_eq!(Platform::from_url("not a url"), Platform::Other);
        assert_eq!(Platform::from_url("https://music.youtube.com/watch?v=1"), Platform::Other);
        // Exact lists do not accept arbitrary subdomains
        assert_eq!(Platform::from_url("https://evil.x.com/a"), Platform::Other);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let dirs = DownloadDirs::under("/data");
        let url = "https://www.bilibili.com/video/BV1";
        let first = dirs.classify(url);
        for _ in 0..5 {
            assert_eq!(dirs.classify(url), first);
        }
        assert_eq!(first, (Platform::Bilibili, PathBuf::from("/data/bilibili")));
    }

    #[test]
    fn test_other_routes_to_default_dir() {
        let dirs = DownloadDirs::under("/data");
        assert_eq!(dirs.classify("https://example.org/v").1, PathBuf::from("/data/youtube"));
    }

    #[test]
    fn test_strategy_table() {
        assert_eq!(Platform::X.strategy().naming, NamingPolicy::VideoId);
        assert_eq!(Platform::Bilibili.strategy().format, FormatPolicy::DualStream);
        assert_eq!(Platform::Bilibili.strategy().cookies, CookiesSource::Bilibili);
        for platform in Platform::ALL {
            assert_eq!(platform.strategy().platform, platform);
        }
    }

    #[test]
    fn test_extract_embedded_link() {
        let share = "7.43 复制打开抖音，看看【某人的作品】 https://v.douyin.com/iRNBho6u/ gOX:/ 02/21";
        assert_eq!(extract_embedded_link(share).as_deref(), Some("https://v.douyin.com/iRNBho6u/"));

        let full = "look https://www.douyin.com/video/7300000000000000000 and https://v.douyin.com/b/";
        assert_eq!(
            extract_embedded_link(full).as_deref(),
            Some("https://www.douyin.com/video/7300000000000000000")
        );

        assert_eq!(extract_embedded_link("no links here"), None);
    }

    #[test]
    fn test_ensure_all_creates_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = DownloadDirs::under(tmp.path());
        dirs.ensure_all().unwrap();
        for name in ["x", "youtube", "xvideos", "pornhub", "bilibili", "douyin", "files", "images"] {
            assert!(tmp.path().join(name).is_dir(), "{}", name);
        }
    }
}
