//! Format strategy resolver.
//!
//! Turns probed metadata into the format selector and output template passed
//! to the engine. Bilibili serves video and audio as separate streams, so it
//! gets the dual-stream merge policy; everybody else downloads the best single
//! combined stream.

use std::path::Path;

use crate::core::utils::sanitize_title;
use crate::download::engine::{FormatInfo, ProbedMetadata};
use crate::download::platform::{FormatPolicy, NamingPolicy, PlatformStrategy};

/// Selector used whenever no explicit pair can be built.
pub const BEST_SELECTOR: &str = "best";

/// The resolved selector plus output template for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatPlan {
    pub selector: String,
    pub output_template: String,
}

/// Resolves the plan for a platform from its probe result.
pub fn resolve(strategy: &PlatformStrategy, metadata: &ProbedMetadata, directory: &Path) -> FormatPlan {
    let selector = match strategy.format {
        FormatPolicy::BestSingle => BEST_SELECTOR.to_string(),
        FormatPolicy::DualStream => dual_stream_selector(&metadata.formats),
    };

    let stem = match strategy.naming {
        NamingPolicy::VideoId => "%(id)s".to_string(),
        NamingPolicy::SanitizedTitle => sanitize_title(metadata.title.as_deref(), strategy.platform.tag()),
    };
    let output_template = directory
        .join(format!("{}.%(ext)s", stem))
        .to_string_lossy()
        .into_owned();

    FormatPlan {
        selector,
        output_template,
    }
}

/// Picks the tallest video-only and the highest-bitrate audio-only stream.
///
/// Returns `"{video}+{audio}"`, or `best` when either side is missing. Ties go
/// to the format listed first.
pub fn dual_stream_selector(formats: &[FormatInfo]) -> String {
    let best_video = first_max_by_key(
        formats.iter().filter(|f| f.has_video() && !f.has_audio()),
        |f| f.height.unwrap_or(0) as f64,
    );
    let best_audio = first_max_by_key(
        formats.iter().filter(|f| f.has_audio() && !f.has_video()),
        |f| f.bitrate().unwrap_or(0.0),
    );

    match (best_video, best_audio) {
        (Some(v), Some(a)) => format!("{}+{}", v.format_id, a.format_id),
        _ => {
            log::info!("No separate video/audio streams to merge, using '{}'", BEST_SELECTOR);
            BEST_SELECTOR.to_string()
        }
    }
}

/// `Iterator::max_by` keeps the last maximum; the selection policy wants the first.
fn first_max_by_key<'a, I, F>(iter: I, key: F) -> Option<&'a FormatInfo>
where
    I: Iterator<Item = &'a FormatInfo>,
    F: Fn(&FormatInfo) -> f64,
{
    iter.fold(None, |best: Option<(&FormatInfo, f64)>, f| {
        let k = key(f);
        match best {
            Some((_, best_k)) if best_k >= k => best,
            _ => Some((f, k)),
        }
    })
    .map(|(f, _)| f)
}
