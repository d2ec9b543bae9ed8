//! Mapping resolver failures to domain outcomes.
//!
//! # Design Decisions
//! - Detecting an anti-bot barrier is a substring heuristic over free-text
//!   handler messages. It can misfire in both directions; nothing structural
//!   depends on it beyond the error classification shown to clients.

use serde::Serialize;
use thiserror::Error;

use crate::resolver::ResolveError;

/// Lowercase fragments that indicate the platform wants a real browser.
pub const AUTOMATION_BARRIER_KEYWORDS: &[&str] = &[
    "chromium-based web browser",
    "403 client error: forbidden",
    "browser",
    "cloudflare",
];

/// True if a handler message looks like an automation/anti-bot barrier.
pub fn is_automation_barrier(message: &str) -> bool {
    let message = message.to_lowercase();
    AUTOMATION_BARRIER_KEYWORDS
        .iter()
        .any(|keyword| message.contains(keyword))
}

/// A classified resolution failure. Cheap to clone so it can be cached.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolveFailure {
    #[error("No plugin available for URL: {url}")]
    NoPlugin { url: String },

    #[error("No streams found for URL: {url}")]
    NoStreams { url: String },

    #[error("{} requires browser automation", title_case(.platform))]
    BrowserRequired { url: String, platform: String },

    #[error("Plugin error for {url}: {message}")]
    Plugin { url: String, message: String },

    #[error("Unexpected error: {message}")]
    Unexpected { url: String, message: String },
}

impl ResolveFailure {
    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveFailure::NoPlugin { .. } => "no_plugin",
            ResolveFailure::NoStreams { .. } => "no_streams",
            ResolveFailure::BrowserRequired { .. } => "browser_required",
            ResolveFailure::Plugin { .. } => "plugin_error",
            ResolveFailure::Unexpected { .. } => "unexpected",
        }
    }

    pub fn url(&self) -> &str {
        match self {
            ResolveFailure::NoPlugin { url }
            | ResolveFailure::NoStreams { url }
            | ResolveFailure::BrowserRequired { url, .. }
            | ResolveFailure::Plugin { url, .. }
            | ResolveFailure::Unexpected { url, .. } => url,
        }
    }
}

/// Classify a resolver error for `url` on `platform`.
pub fn classify(error: ResolveError, url: &str, platform: &str) -> ResolveFailure {
    let url = url.to_string();
    match error {
        ResolveError::NoHandler(_) => ResolveFailure::NoPlugin { url },
        ResolveError::NoContent => ResolveFailure::NoStreams { url },
        ResolveError::Handler(message) if is_automation_barrier(&message) => {
            ResolveFailure::BrowserRequired {
                url,
                platform: platform.to_string(),
            }
        }
        ResolveError::Handler(message) => ResolveFailure::Plugin { url, message },
        ResolveError::Unexpected(message) => ResolveFailure::Unexpected { url, message },
    }
}

pub(crate) fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
