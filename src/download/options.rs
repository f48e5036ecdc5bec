//! Per-task retrieval options.
//!
//! Built once per task from the platform strategy and the resolved format plan,
//! then handed by value to the worker. There is no mutating API after `build`.

use std::path::{Path, PathBuf};

use crate::core::config;
use crate::download::engine::ProbeOptions;
use crate::download::format::FormatPlan;
use crate::download::platform::PlatformStrategy;

/// The platform's cookies file, if configured and present on disk.
fn existing_cookies(strategy: &PlatformStrategy) -> Option<PathBuf> {
    strategy
        .cookies
        .configured_path()
        .map(PathBuf::from)
        .filter(|p| p.exists())
}

/// Options for the metadata probe: same cookies and proxy as the retrieval.
pub fn probe_options(strategy: &PlatformStrategy, proxy: Option<&str>) -> ProbeOptions {
    ProbeOptions {
        cookies_file: existing_cookies(strategy),
        proxy: proxy.map(str::to_string),
    }
}

/// Configuration of a single retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalOptions {
    output_template: String,
    format_selector: String,
    container: &'static str,
    socket_timeout_secs: u32,
    retries: u32,
    fragment_retries: u32,
    extractor_retries: u32,
    skip_unavailable_fragments: bool,
    no_check_certificate: bool,
    cookies_file: Option<PathBuf>,
    proxy: Option<String>,
    user_agent: &'static str,
}

impl RetrievalOptions {
    /// Builds the options for one task.
    ///
    /// The cookies file is only attached when it exists on disk; the proxy is
    /// the process-wide one, passed in by the caller.
    pub fn build(strategy: &PlatformStrategy, plan: &FormatPlan, proxy: Option<&str>) -> Self {
        let cookies_file = existing_cookies(strategy);
        if let Some(ref path) = cookies_file {
            log::info!("Using {} cookies: {}", strategy.platform, path.display());
        }

        Self {
            output_template: plan.output_template.clone(),
            format_selector: plan.selector.clone(),
            container: config::download::TARGET_CONTAINER,
            socket_timeout_secs: config::download::SOCKET_TIMEOUT_SECS,
            retries: config::download::RETRIES,
            fragment_retries: config::download::FRAGMENT_RETRIES,
            extractor_retries: config::download::EXTRACTOR_RETRIES,
            skip_unavailable_fragments: true,
            no_check_certificate: true,
            cookies_file,
            proxy: proxy.map(str::to_string),
            user_agent: config::download::USER_AGENT,
        }
    }

    pub fn output_template(&self) -> &str {
        &self.output_template
    }

    pub fn format_selector(&self) -> &str {
        &self.format_selector
    }

    pub fn cookies_file(&self) -> Option<&Path> {
        self.cookies_file.as_deref()
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    /// yt-dlp command-line arguments, without the progress flags and the URL.
    pub fn to_ytdlp_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-o".into(),
            self.output_template.clone(),
            "--format".into(),
            self.format_selector.clone(),
            "--no-playlist".into(),
            "--no-overwrites".into(),
            "--restrict-filenames".into(),
            "--no-write-info-json".into(),
            "--no-write-description".into(),
            "--no-write-subs".into(),
            "--no-write-auto-subs".into(),
            "--socket-timeout".into(),
            self.socket_timeout_secs.to_string(),
            "--retries".into(),
            self.retries.to_string(),
            "--fragment-retries".into(),
            self.fragment_retries.to_string(),
            "--extractor-retries".into(),
            self.extractor_retries.to_string(),
            "--user-agent".into(),
            self.user_agent.to_string(),
        ];

        if self.skip_unavailable_fragments {
            args.push("--skip-unavailable-fragments".into());
        }
        if self.no_check_certificate {
            args.push("--no-check-certificate".into());
            args.push("--prefer-insecure".into());
        }
        args.push("--merge-output-format".into());
        args.push(self.container.into());
        args.push("--recode-video".into());
        args.push(self.container.into());
        if let Some(ref cookies) = self.cookies_file {
            args.push("--cookies".into());
            args.push(cookies.to_string_lossy().into_owned());
        }
        if let Some(ref proxy) = self.proxy {
            args.push("--proxy".into());
            args.push(proxy.clone());
        }

        args
    }
}
