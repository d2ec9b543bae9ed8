//! URL normalization and platform labelling.
//!
//! # Responsibilities
//! - Validate and normalize user-supplied stream URLs
//! - Derive a best-effort platform label from the host
//! - Build fallback thumbnails and summarize stream transport kinds
//!
//! # Design Decisions
//! - The platform label is only used for cache/telemetry namespacing and the
//!   optional resolver hint, never for correctness-critical branching
//! - A scheme-less input is treated as `https://`

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use url::Url;

use crate::resolver::StreamVariant;

/// Domains the service accepts, with the platform label for each.
pub const SUPPORTED_PLATFORMS: &[(&str, &str)] = &[
    ("twitch.tv", "twitch"),
    ("youtube.com", "youtube"),
    ("youtu.be", "youtube"),
    ("kick.com", "kick"),
    ("facebook.com", "facebook"),
    ("instagram.com", "instagram"),
    ("tiktok.com", "tiktok"),
    ("bigo.tv", "bigo"),
    ("dailymotion.com", "dailymotion"),
    ("vimeo.com", "vimeo"),
    ("steamcommunity.com", "steam"),
    ("bilibili.com", "bilibili"),
    ("huya.com", "huya"),
    ("picarto.tv", "picarto"),
    ("trovo.live", "trovo"),
    ("ustream.tv", "ustreamtv"),
    ("vk.com", "vk"),
    ("dlive.tv", "dlive"),
    ("goodgame.ru", "goodgame"),
    ("abema.tv", "abematv"),
    ("aloula.sa", "aloula"),
];

/// Brand colours for fallback thumbnails.
const PLATFORM_COLORS: &[(&str, &str)] = &[
    ("twitch", "9146FF"),
    ("youtube", "FF0000"),
    ("kick", "53FC18"),
    ("facebook", "1877F2"),
    ("instagram", "E4405F"),
    ("tiktok", "000000"),
    ("bigo", "FF6B35"),
    ("dailymotion", "0066DC"),
    ("vimeo", "1AB7EA"),
    ("steam", "171A21"),
    ("bilibili", "FB7299"),
    ("huya", "FF7F00"),
    ("picarto", "1DA1F2"),
    ("trovo", "00D7FF"),
    ("ustreamtv", "3388CC"),
    ("vk", "4680C2"),
    ("dlive", "FFD700"),
    ("goodgame", "00AA00"),
    ("abematv", "00D4AA"),
    ("aloula", "FF6B6B"),
];

const DEFAULT_COLOR: &str = "6B7280";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("URL is required")]
    Empty,

    #[error("Invalid URL format")]
    Invalid,

    #[error("Unsupported domain: {0}")]
    UnsupportedDomain(String),
}

/// A validated, scheme-prefixed URL plus its platform label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    pub url: String,
    pub platform: String,
}

fn host_without_www(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
}

fn parse_with_scheme(raw: &str) -> Result<(String, Url), UrlError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&with_scheme).map_err(|_| UrlError::Invalid)?;
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::Invalid);
    }
    Ok((with_scheme, parsed))
}

/// Validate a raw URL and normalize it for resolution and caching.
pub fn normalize_url(raw: &str) -> Result<NormalizedUrl, UrlError> {
    let (url, parsed) = parse_with_scheme(raw)?;
    let domain = host_without_www(&parsed).ok_or(UrlError::Invalid)?;

    let supported = SUPPORTED_PLATFORMS
        .iter()
        .any(|(supported, _)| domain.ends_with(supported));
    if !supported {
        return Err(UrlError::UnsupportedDomain(domain));
    }

    Ok(NormalizedUrl {
        platform: platform_from_url(&url),
        url,
    })
}

/// Best-effort platform label: known platforms by domain, otherwise the
/// first host label, or "unknown" if the URL does not parse.
pub fn platform_from_url(url: &str) -> String {
    let Some(domain) = Url::parse(url).ok().as_ref().and_then(host_without_www) else {
        return "unknown".to_string();
    };

    SUPPORTED_PLATFORMS
        .iter()
        .find(|(supported, _)| domain.contains(supported))
        .map(|(_, platform)| platform.to_string())
        .unwrap_or_else(|| domain.split('.').next().unwrap_or("unknown").to_string())
}

/// Avatar-style thumbnail used when the resolver gives none.
pub fn fallback_thumbnail(platform: &str, author: &str) -> String {
    let author = if author.is_empty() { "default" } else { author };
    let color = PLATFORM_COLORS
        .iter()
        .find(|(name, _)| *name == platform)
        .map(|(_, color)| *color)
        .unwrap_or(DEFAULT_COLOR);
    // Kick's light green needs dark text.
    let text_color = if platform == "kick" { "000000" } else { "FFFFFF" };

    let mut thumbnail = Url::parse("https://ui-avatars.com/api/")
        .unwrap_or_else(|_| unreachable!("static URL parses"));
    thumbnail
        .query_pairs_mut()
        .append_pair("name", author)
        .append_pair("size", "300")
        .append_pair("background", color)
        .append_pair("color", text_color)
        .append_pair("format", "png");
    thumbnail.into()
}

/// Sorted, de-duplicated transport kinds ("HLS", "HTTP", "DASH", ...).
pub fn stream_types(streams: &BTreeMap<String, StreamVariant>) -> Vec<String> {
    streams
        .values()
        .map(|variant| variant.kind.to_uppercase())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
